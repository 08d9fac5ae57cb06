//! Error types for the Lucifer agent

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Lucifer agent
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Power management error
    #[error("power error: {0}")]
    Power(String),

    /// Volume control error
    #[error("volume error: {0}")]
    Volume(String),

    /// Application launch error
    #[error("app error: {0}")]
    App(String),

    /// Clock helper error
    #[error("clock error: {0}")]
    Clock(String),

    /// Single-instance enforcement error
    #[error("singleton error: {0}")]
    Singleton(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
