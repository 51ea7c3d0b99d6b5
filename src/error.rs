use thiserror::Error;

/// Errors raised by the history layer.
///
/// Routine absence (unknown conversation on a read, rename or delete) is not
/// an error: those operations report it through `false`, `""` or an empty
/// list. Only a missing user on conversation creation is surfaced here.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Document store error: {0}")]
    Store(#[from] mongodb::error::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<bson::ser::Error> for HistoryError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for HistoryError {
    fn from(err: config::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HistoryError>;
