use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No endpoint is configured for any backend eligible to hold the session.
    #[error("no storage backend configured")]
    NoBackendConfigured,
    /// A record already exists for the session being inserted.
    #[error("session `{session_id}` already exists")]
    DuplicateKey {
        /// Session that already exists.
        session_id: String,
    },
    /// The backend could not serve the request.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// What was being attempted.
        message: String,
        /// Backend failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            /// Backend failure.
            source: Box::new(source),
        }
    }

    /// True when the error reports a losing insert.
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, StorageError::DuplicateKey { .. })
    }
}
