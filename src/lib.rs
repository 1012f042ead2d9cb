pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};

pub use adapters::{InMemoryStore, Snapshot};
pub use config::toml_config::RecommenderConfig;
pub use core::recommender::{HallRecommendation, HallRecommender, Recommendation};
pub use core::scoring::{ScoreBasis, ScoringParams};
pub use utils::error::{RecError, Result};
