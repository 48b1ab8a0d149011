/// Networked PostgreSQL store.
#[cfg(feature = "postgres-store")]
pub mod postgres;
/// Shared SQL statements.
pub mod schema;
/// Embedded SQLite store.
#[cfg(feature = "sqlite-store")]
pub mod sqlite;

use std::fmt;

use futures::future::BoxFuture;
use serde::Serialize;
use utoipa::ToSchema;

use crate::dao::{models::SessionId, storage::StorageResult};

/// Storage engine families a session can be pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Current networked relational endpoint.
    Postgres,
    /// Networked relational endpoint used before the `v2:` scheme.
    LegacyPostgres,
    /// Embedded single-file store.
    Sqlite,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::Postgres => "postgres",
            BackendKind::LegacyPostgres => "legacy_postgres",
            BackendKind::Sqlite => "sqlite",
        };
        f.write_str(name)
    }
}

/// Capability set every session table backend provides.
///
/// `ensure_schema` has to succeed before any other call is made on an
/// instance. `insert` is not conditional: it fails with
/// [`StorageError::DuplicateKey`](crate::dao::storage::StorageError::DuplicateKey)
/// when the session already exists. `update` on an absent key affects nothing
/// and does not fail.
pub trait GameStore: Send + Sync {
    /// Backend family of this instance.
    fn kind(&self) -> BackendKind;
    /// Create the sessions table if it is missing.
    fn ensure_schema(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Whether a row exists for `id`.
    fn exists(&self, id: SessionId) -> BoxFuture<'static, StorageResult<bool>>;
    /// Insert a new row.
    fn insert(&self, id: SessionId, payload: String) -> BoxFuture<'static, StorageResult<()>>;
    /// Overwrite the payload of an existing row.
    fn update(&self, id: SessionId, payload: String) -> BoxFuture<'static, StorageResult<()>>;
    /// Create-or-overwrite in a single backend statement.
    fn upsert(&self, id: SessionId, payload: String) -> BoxFuture<'static, StorageResult<()>>;
    /// Stored payload of `id`, if any.
    fn fetch(&self, id: SessionId) -> BoxFuture<'static, StorageResult<Option<String>>>;
    /// Cheap round trip to the database.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}

/// True when the database rejected a write because the key already exists.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
