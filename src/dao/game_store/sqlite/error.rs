//! Error types raised by the embedded SQLite store.

use std::path::PathBuf;

use thiserror::Error;

/// Convenient result alias returning [`SqliteDaoError`] failures.
pub type SqliteResult<T> = Result<T, SqliteDaoError>;

/// Failures that can occur while interacting with the SQLite file.
#[derive(Debug, Error)]
pub enum SqliteDaoError {
    /// The directory holding the database file could not be created.
    #[error("failed to create directory `{}` for SQLite store", path.display())]
    CreateDirectory {
        /// Path involved.
        path: PathBuf,
        /// I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Opening the database file failed.
    #[error("failed to open SQLite database `{}`", path.display())]
    Connect {
        /// Path involved.
        path: PathBuf,
        /// Driver error.
        #[source]
        source: sqlx::Error,
    },
    /// Creating the sessions table failed.
    #[error("failed to create the sessions table")]
    EnsureSchema {
        /// Driver error.
        #[source]
        source: sqlx::Error,
    },
    /// A statement against the sessions table failed.
    #[error("SQLite {operation} failed for session `{session_id}`")]
    Query {
        /// Statement kind.
        operation: &'static str,
        /// Session the statement targeted.
        session_id: String,
        /// Driver error.
        #[source]
        source: sqlx::Error,
    },
    /// Insert lost against an existing row with the same key.
    #[error("session `{session_id}` already exists")]
    DuplicateKey {
        /// Session that already exists.
        session_id: String,
    },
    /// The health check query failed.
    #[error("SQLite health check failed")]
    HealthCheck {
        /// Driver error.
        #[source]
        source: sqlx::Error,
    },
}
