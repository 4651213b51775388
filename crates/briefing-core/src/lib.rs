//! Shared model, source registry and configuration for the briefing workspace.

pub mod app_config;
pub mod config;
pub mod sources;
pub mod text;
pub mod types;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use sources::{load_registry, parse_registry, SourceRegistry};
pub use types::{
    sort_newest_first, AggregateResponse, CacheSnapshot, CategoryBucket, CategoryInfo,
    EnrichedArticle, FeedSource, ParsedFeed, RawItem, SentimentLabel, TrendingTopic,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read sources file {path}: {source}")]
    SourcesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse sources file: {0}")]
    SourcesFileParse(#[source] serde_yaml::Error),

    #[error("sources validation failed: {0}")]
    Validation(String),
}
