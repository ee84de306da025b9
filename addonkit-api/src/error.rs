//! Error types for addon authors

use thiserror::Error;

/// Errors an addon can return from its lifecycle callbacks
#[derive(Error, Debug)]
pub enum AddonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The same capability was registered twice by one addon
    #[error("Duplicate capability: {0}")]
    DuplicateCapability(String),

    /// A resource the addon needs is unavailable
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Custom error with message
    #[error("{0}")]
    Custom(String),
}

impl AddonError {
    /// Create a custom error with a message
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

impl From<serde_json::Error> for AddonError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
