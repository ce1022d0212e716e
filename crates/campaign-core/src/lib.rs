pub mod app_config;
pub mod config;
pub mod extract;
pub mod rollup;
pub mod topics;

use thiserror::Error;

pub use app_config::{AppConfig, Environment, StoreBackend};
pub use config::{load_app_config, load_app_config_from_env};
pub use extract::{completion_content, parse_topics, ExtractError};
pub use rollup::{summarize, AnalyticsSummary};
pub use topics::{
    validate_batch, FeedbackEvent, FeedbackKind, FeedbackRequest, FeedbackStats, IngestSummary,
    NewTopic, TopicDescriptor, TopicGroup, TopicKey, TopicRecord, ValidationError,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
