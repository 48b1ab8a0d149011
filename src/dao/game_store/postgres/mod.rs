mod config;
mod error;
mod store;

pub use config::PostgresConfig;
pub use error::{PostgresDaoError, PostgresResult};
pub use store::PostgresGameStore;

use crate::dao::storage::StorageError;

impl From<PostgresDaoError> for StorageError {
    fn from(err: PostgresDaoError) -> Self {
        match err {
            PostgresDaoError::DuplicateKey { session_id } => {
                StorageError::DuplicateKey { session_id }
            }
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
