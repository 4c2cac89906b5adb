//! Error types for the telemetry pipeline core.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SentryError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown event type '{0}'")]
    UnknownEventType(String),

    #[error("unknown filter rule class '{0}'")]
    UnknownRuleClass(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SentryError>;
