use core::result::Result as CoreResult;
use std::io::Error as IoError;

use reqwest::Error as ReqwestError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;
use toml::de::Error as TomlError;

/// Result type for faculty operations.
pub type Result<T> = CoreResult<T, Error>;

/// Errors that can occur across the faculty library.
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// An HTTP request failed in transit.
    #[error("HTTP request failed: {0}")]
    Request(#[from] ReqwestError),

    /// JSON serialization or deserialization failed.
    #[error("JSON serialization error: {0}")]
    Json(#[from] SerdeJsonError),

    /// TOML deserialization failed.
    #[error("TOML deserialization error: {0}")]
    Toml(#[from] TomlError),

    /// Configuration is invalid: unknown capability URI, embedding
    /// dimension mismatch, or a missing required model/backend capability.
    /// Never retried.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The remote service rejected a request or returned a malformed body.
    #[error("Remote service error: {0}")]
    Remote(String),

    /// An item or chunk id was absent from the store it was looked up in.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The operation is not supported by the selected backend.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Transient failures persisted past the retry cap.
    #[error("{operation} failed after {attempts} attempts")]
    Exhausted {
        /// Name of the operation that gave up.
        operation: String,
        /// Number of attempts made before giving up.
        attempts: u32,
    },

    /// Encoding or decoding a persisted index snapshot failed.
    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

impl Error {
    /// Determines whether this error may succeed if retried.
    ///
    /// Returns `true` only for transient transport failures; configuration
    /// errors, missing ids, and unsupported operations are final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Remote(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value as JsonValue, from_str};
    use std::io;

    #[test]
    fn test_error_display() {
        let error1 = Error::Config("dimension mismatch".to_owned());
        assert_eq!(
            error1.to_string(),
            "Configuration error: dimension mismatch"
        );

        let error2 = Error::NotFound("chunk doc:0-10".to_owned());
        assert_eq!(error2.to_string(), "Not found: chunk doc:0-10");

        let error3 = Error::Exhausted {
            operation: "embed".to_owned(),
            attempts: 8,
        };
        assert_eq!(error3.to_string(), "embed failed after 8 attempts");
    }

    #[test]
    fn test_error_is_retryable() {
        let error1 = Error::Remote("503 service unavailable".to_owned());
        assert!(error1.is_retryable());

        let error2 = Error::Config("bad config".to_owned());
        assert!(!error2.is_retryable());

        let error3 = Error::Unsupported("text search".to_owned());
        assert!(!error3.is_retryable());

        let error4 = Error::NotFound("item".to_owned());
        assert!(!error4.is_retryable());
    }

    #[test]
    fn test_error_from_io() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: Error = io_error.into();
        assert!(matches!(error, Error::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_error = from_str::<JsonValue>("invalid json").unwrap_err();
        let error: Error = json_error.into();
        assert!(matches!(error, Error::Json(_)));
    }
}
