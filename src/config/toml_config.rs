use crate::core::scoring::ScoringParams;
use crate::utils::error::{RecError, Result};
use crate::utils::validation::{
    validate_one_of, validate_positive_number, validate_source, validate_weight, Validate,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const OUTPUT_FORMATS: &[&str] = &["json", "csv"];
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
pub const DEFAULT_TIMEZONE: &str = "America/Los_Angeles";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommenderConfig {
    pub data: DataConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub clock: ClockConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Local path or http(s) URL of the JSON snapshot.
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_user_weight")]
    pub user_weight: f64,
    #[serde(default = "default_consensus_weight")]
    pub consensus_weight: f64,
    #[serde(default = "default_top")]
    pub top_halls: usize,
    #[serde(default = "default_top")]
    pub top_dishes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockConfig {
    /// IANA zone the dining halls keep time in.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_format")]
    pub format: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    #[serde(default)]
    pub json: bool,
}

fn default_user_weight() -> f64 {
    2.0
}

fn default_consensus_weight() -> f64 {
    1.0
}

fn default_top() -> usize {
    3
}

fn default_format() -> String {
    "json".to_string()
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            user_weight: default_user_weight(),
            consensus_weight: default_consensus_weight(),
            top_halls: default_top(),
            top_dishes: default_top(),
        }
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
        }
    }
}

impl RecommenderConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(RecError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| RecError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Config with every default, pointed at `source`.
    pub fn with_source(source: impl Into<String>) -> Self {
        Self {
            data: DataConfig {
                source: source.into(),
            },
            scoring: ScoringConfig::default(),
            clock: ClockConfig::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// 替換環境變數 (例如 ${SNAPSHOT_URL})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| RecError::ConfigValidationError {
            field: "env_substitution".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_source("data.source", &self.data.source)?;

        validate_weight("scoring.user_weight", self.scoring.user_weight)?;
        validate_weight("scoring.consensus_weight", self.scoring.consensus_weight)?;
        if self.scoring.user_weight + self.scoring.consensus_weight <= 0.0 {
            return Err(RecError::ConfigValidationError {
                field: "scoring".to_string(),
                message: "user_weight and consensus_weight cannot both be zero".to_string(),
            });
        }
        validate_positive_number("scoring.top_halls", self.scoring.top_halls, 1)?;
        validate_positive_number("scoring.top_dishes", self.scoring.top_dishes, 1)?;

        self.time_zone()?;

        validate_one_of("output.format", &self.output.format, OUTPUT_FORMATS)?;
        if let Some(level) = &self.logging.level {
            validate_one_of("logging.level", level, LOG_LEVELS)?;
        }

        Ok(())
    }

    pub fn scoring_params(&self) -> ScoringParams {
        ScoringParams {
            user_weight: self.scoring.user_weight,
            consensus_weight: self.scoring.consensus_weight,
            top_halls: self.scoring.top_halls,
            top_dishes: self.scoring.top_dishes,
        }
    }

    pub fn time_zone(&self) -> Result<Tz> {
        self.clock
            .timezone
            .parse::<Tz>()
            .map_err(|e| RecError::InvalidConfigValueError {
                field: "clock.timezone".to_string(),
                value: self.clock.timezone.clone(),
                reason: e.to_string(),
            })
    }
}

impl Validate for RecommenderConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
