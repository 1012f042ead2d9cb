use super::toml_config::RecommenderConfig;
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use clap::{ArgGroup, Parser, Subcommand};

pub const DEFAULT_SOURCE: &str = "snapshot.json";

#[derive(Debug, Clone, Parser)]
#[command(name = "dining-rec")]
#[command(about = "Recommends which dining hall to eat at right now")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Snapshot path or URL, overrides [data].source
    #[arg(long, global = true)]
    pub source: Option<String>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Rank the halls serving right now for a user
    Recommend {
        #[arg(long)]
        user: String,

        /// Evaluate at this RFC 3339 timestamp instead of now
        #[arg(long)]
        at: Option<String>,

        /// json or csv, overrides [output].format
        #[arg(long)]
        format: Option<String>,
    },
    /// Load one day of scraper output into the snapshot
    Ingest {
        /// Scraper JSON file
        #[arg(long)]
        menus: String,

        /// Menu date as YYYY-MM-DD, today in the halls' zone if omitted
        #[arg(long)]
        date: Option<String>,
    },
    /// Record a rating in the snapshot
    Rate {
        #[arg(long)]
        user: String,

        #[arg(long)]
        dish: u64,

        #[arg(long)]
        score: i64,

        #[arg(long)]
        comment: Option<String>,
    },
    /// Record every rating in a JSON file, or none of them
    RateBatch {
        #[arg(long)]
        user: String,

        /// JSON file shaped like {"ratings": [{"dish_id": 1, "score": 4}]}
        #[arg(long)]
        file: String,
    },
    /// Show the menu a hall filed for a date and meal period
    Menu {
        #[arg(long)]
        hall: u64,

        /// YYYY-MM-DD
        #[arg(long)]
        date: String,

        /// BREAKFAST, LUNCH, DINNER, LATE_NIGHT, ALL_DAY or LUNCH_DINNER
        #[arg(long)]
        period: Option<String>,
    },
    /// List the ratings of one user or of one dish
    #[command(group(ArgGroup::new("target").required(true).args(["user", "dish"])))]
    Ratings {
        #[arg(long)]
        user: Option<String>,

        #[arg(long)]
        dish: Option<u64>,
    },
    /// Find dishes by the start of any word in their name
    Dishes {
        #[arg(long)]
        search: String,
    },
    /// Recompute every dish average from its ratings
    Repair,
}

impl CliConfig {
    /// Loads the TOML file when given, then applies command-line overrides and validates.
    pub fn resolve(&self) -> Result<RecommenderConfig> {
        let mut config = match &self.config {
            Some(path) => RecommenderConfig::from_file(path)?,
            None => RecommenderConfig::with_source(DEFAULT_SOURCE),
        };

        if let Some(source) = &self.source {
            config.data.source = source.clone();
        }
        if let Command::Recommend {
            format: Some(format),
            ..
        } = &self.command
        {
            config.output.format = format.clone();
        }

        config.validate()?;
        Ok(config)
    }
}
