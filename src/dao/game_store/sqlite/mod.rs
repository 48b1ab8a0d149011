mod config;
mod error;
mod store;

pub use config::SqliteConfig;
pub use error::{SqliteDaoError, SqliteResult};
pub use store::SqliteGameStore;

use crate::dao::storage::StorageError;

impl From<SqliteDaoError> for StorageError {
    fn from(err: SqliteDaoError) -> Self {
        match err {
            SqliteDaoError::DuplicateKey { session_id } => StorageError::DuplicateKey { session_id },
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
