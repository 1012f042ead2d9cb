use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecError {
    #[error("Invalid user ID: '{value}'")]
    InvalidUserId { value: String },

    #[error("Upstream data fetch failed ({source_name}): {message}")]
    UpstreamError {
        source_name: String,
        message: String,
    },

    #[error("{entity} with ID {id} not found")]
    NotFound { entity: String, id: u64 },

    #[error("Rating score {score} is outside 0..=5")]
    InvalidRating { score: i64 },

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Upstream,
    Config,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl RecError {
    pub fn upstream(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UpstreamError {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            RecError::InvalidUserId { .. } | RecError::InvalidRating { .. } => ErrorCategory::Input,
            RecError::UpstreamError { .. } | RecError::HttpError(_) => ErrorCategory::Upstream,
            RecError::ConfigValidationError { .. }
            | RecError::InvalidConfigValueError { .. }
            | RecError::MissingConfigError { .. } => ErrorCategory::Config,
            RecError::NotFound { .. }
            | RecError::CsvError(_)
            | RecError::SerializationError(_) => ErrorCategory::Data,
            RecError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input => ErrorSeverity::Low,
            ErrorCategory::Upstream => ErrorSeverity::Medium,
            ErrorCategory::Config | ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Input => "Check the user ID and rating values passed in",
            ErrorCategory::Upstream => "Check that the data source is reachable and try again",
            ErrorCategory::Config => "Fix the configuration file or command-line flags",
            ErrorCategory::Data => "Check that the snapshot file is well-formed JSON",
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            RecError::InvalidUserId { .. } => "Invalid user ID".to_string(),
            RecError::InvalidRating { score } => {
                format!("Ratings must be between 0 and 5 (got {})", score)
            }
            // 對外只回報通用錯誤，細節留在日誌
            _ => match self.category() {
                ErrorCategory::Config => format!("Configuration problem: {}", self),
                _ => "Internal server error".to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, RecError>;
