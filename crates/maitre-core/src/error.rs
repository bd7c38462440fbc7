use thiserror::Error;

/// Top-level error type for the maitre service.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for MaitreError` where they cross into the
/// composition root, so the `?` operator works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MaitreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Booking error: {0}")]
    Booking(String),

    #[error("Language model error: {0}")]
    Llm(String),

    #[error("Chat error: {0}")]
    Chat(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for MaitreError {
    fn from(err: toml::de::Error) -> Self {
        MaitreError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for MaitreError {
    fn from(err: toml::ser::Error) -> Self {
        MaitreError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for MaitreError {
    fn from(err: serde_json::Error) -> Self {
        MaitreError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for maitre operations.
pub type Result<T> = std::result::Result<T, MaitreError>;
