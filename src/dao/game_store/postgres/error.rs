//! Error types raised by the networked PostgreSQL store.

use thiserror::Error;

/// Convenient result alias returning [`PostgresDaoError`] failures.
pub type PostgresResult<T> = Result<T, PostgresDaoError>;

/// Failures that can occur while interacting with PostgreSQL.
#[derive(Debug, Error)]
pub enum PostgresDaoError {
    /// The connection URL could not be parsed.
    #[error("invalid PostgreSQL connection URL")]
    InvalidUrl {
        /// Driver error.
        #[source]
        source: sqlx::Error,
    },
    /// Building the connection pool failed.
    #[error("failed to connect to PostgreSQL at `{host}`")]
    Connect {
        /// Host the URL points at.
        host: String,
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
    #[error("PostgreSQL {operation} failed for session `{session_id}`")]
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
    #[error("PostgreSQL health check failed")]
    HealthCheck {
        /// Driver error.
        #[source]
        source: sqlx::Error,
    },
}
