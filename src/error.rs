//! Error types for the Beacon enclosure

use reqwest::StatusCode;
use thiserror::Error;

/// Result type alias for enclosure and STT operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the enclosure service
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// STT module name not recognized
    #[error("unknown STT module: {0:?}")]
    UnknownStrategy(String),

    /// Language not supported by the selected STT backend
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Audio conversion error
    #[error("audio error: {0}")]
    Audio(String),

    /// Message bus error
    #[error("bus error: {0}")]
    Bus(String),

    /// Remote endpoint answered with a non-success status
    #[error("http status {status}: {body}")]
    HttpStatus {
        /// Response status code
        status: StatusCode,
        /// Response body, possibly empty
        body: String,
    },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Whether the remote endpoint rejected the request as unauthorized (401)
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        match self {
            Self::HttpStatus { status, .. } => *status == StatusCode::UNAUTHORIZED,
            Self::Http(e) => e.status() == Some(StatusCode::UNAUTHORIZED),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_401_is_unauthorized() {
        let err = Error::HttpStatus {
            status: StatusCode::UNAUTHORIZED,
            body: String::new(),
        };
        assert!(err.is_unauthorized());
    }

    #[test]
    fn other_errors_are_not_unauthorized() {
        let forbidden = Error::HttpStatus {
            status: StatusCode::FORBIDDEN,
            body: "nope".to_string(),
        };
        assert!(!forbidden.is_unauthorized());
        assert!(!Error::Stt("boom".to_string()).is_unauthorized());
        assert!(!Error::UnsupportedLanguage("de-de".to_string()).is_unauthorized());
    }
}
