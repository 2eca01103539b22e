//! Error types
//!
//! Each layer of the pipeline has its own error enum so callers can tell
//! "camera unknown" apart from "store down" apart from "subscriber gone".

use std::io;

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error for the server and binary
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error (bind, accept)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON encode/decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Record store error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Subscriber registry error
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Errors reported by a record store
///
/// "Camera not found" is not an error: appends report it as `Ok(false)`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Connectivity or timeout failure; the operation may succeed if retried
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    /// A camera with this label already exists
    #[error("camera already exists: {0}")]
    AlreadyExists(String),
}

impl StoreError {
    /// Whether this error is a transient store failure
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Errors from the persistence gate
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AppendError {
    /// The event carried no usable record
    #[error("missing detection record for camera {0}")]
    MissingRecord(String),

    /// The underlying store failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from the subscriber registry
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The configured subscriber limit has been reached
    #[error("subscriber limit reached ({0})")]
    Full(usize),
}

/// Errors from a subscriber transport
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The connection is closed
    #[error("connection closed")]
    Closed,

    /// A write failed
    #[error("write failed: {0}")]
    Io(String),

    /// The write did not complete within the send timeout
    #[error("send timed out")]
    Timeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_transient() {
        assert!(StoreError::Unavailable("timeout".into()).is_transient());
        assert!(!StoreError::AlreadyExists("CAM-1".into()).is_transient());
    }

    #[test]
    fn test_append_error_from_store() {
        let err: AppendError = StoreError::Unavailable("down".into()).into();
        assert_eq!(err.to_string(), "record store unavailable: down");
    }

    #[test]
    fn test_error_display() {
        let err = Error::from(RegistryError::Full(8));
        assert_eq!(err.to_string(), "subscriber limit reached (8)");
    }
}
