//! Error types for the intake bot.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Transport-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Failed to acknowledge button on channel {name}: {reason}")]
    AckFailed { name: String, reason: String },

    #[error("Invalid update: {0}")]
    InvalidUpdate(String),
}

/// Completion sink errors. Always logged, never surfaced to the user.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Sink request failed: {0}")]
    RequestFailed(String),

    #[error("Sink rejected the record with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for the intake bot.
pub type Result<T> = std::result::Result<T, Error>;
