//! Error types for the weather API client and the storage layer.

use thiserror::Error;

/// Failure of a weather API call.
///
/// `Display` yields the message shown to the user; the carried detail is only
/// meant for logs.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("City not found. Please check the spelling.")]
    NotFound,

    #[error("Invalid API key. Please check your configuration.")]
    Configuration,

    #[error("Network error. Please check your internet connection.")]
    Network(String),

    #[error("An error occurred while fetching weather data.")]
    Unknown(String),
}

impl ApiError {
    /// Diagnostic detail for logging, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Network(detail) | Self::Unknown(detail) => Some(detail),
            Self::NotFound | Self::Configuration => None,
        }
    }
}

/// Fault in the local key-value store. Never shown to the user.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored value could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
