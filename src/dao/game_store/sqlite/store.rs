use std::{path::PathBuf, sync::Arc};

use futures::future::BoxFuture;
use sea_query::SqliteQueryBuilder;
use sqlx::{
    Row, SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::dao::{
    game_store::{BackendKind, GameStore, is_unique_violation, schema},
    models::SessionId,
    storage::StorageResult,
};

use super::{
    config::SqliteConfig,
    error::{SqliteDaoError, SqliteResult},
};

/// Session table stored in a single local SQLite file.
///
/// The pool holds exactly one connection, so concurrent callers queue on it
/// instead of writing in parallel.
#[derive(Clone)]
pub struct SqliteGameStore {
    inner: Arc<SqliteInner>,
}

struct SqliteInner {
    pool: SqlitePool,
    path: PathBuf,
    schema_ready: OnceCell<()>,
}

impl SqliteGameStore {
    /// Open (or create) the database file, creating its directory first.
    pub async fn connect(config: SqliteConfig) -> SqliteResult<Self> {
        if let Some(parent) = config
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
        {
            tokio::fs::create_dir_all(parent).await.map_err(|source| {
                SqliteDaoError::CreateDirectory {
                    path: parent.to_path_buf(),
                    source,
                }
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(config.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|source| SqliteDaoError::Connect {
                path: config.path.clone(),
                source,
            })?;

        info!(path = %config.path.display(), "opened SQLite session store");

        Ok(Self {
            inner: Arc::new(SqliteInner {
                pool,
                path: config.path,
                schema_ready: OnceCell::new(),
            }),
        })
    }

    async fn ensure_schema(&self) -> SqliteResult<()> {
        let inner = &self.inner;
        inner
            .schema_ready
            .get_or_try_init(|| async {
                let ddl = schema::create_table(SqliteQueryBuilder);
                sqlx::query(&ddl)
                    .execute(&inner.pool)
                    .await
                    .map_err(|source| SqliteDaoError::EnsureSchema { source })?;
                debug!(path = %inner.path.display(), "SQLite sessions table ready");
                Ok::<(), SqliteDaoError>(())
            })
            .await?;
        Ok(())
    }

    async fn exists(&self, id: &SessionId) -> SqliteResult<bool> {
        let (sql, values) = schema::count_sessions(SqliteQueryBuilder, id.as_str());
        let row = sqlx::query_with(&sql, values)
            .fetch_one(&self.inner.pool)
            .await
            .map_err(|source| query_error("exists", id, source))?;
        let matches: i64 = row
            .try_get(schema::COUNT_COLUMN)
            .map_err(|source| query_error("exists", id, source))?;
        Ok(matches == 1)
    }

    async fn insert(&self, id: &SessionId, payload: &str) -> SqliteResult<()> {
        let (sql, values) = schema::insert_session(SqliteQueryBuilder, id.as_str(), payload);
        match sqlx::query_with(&sql, values).execute(&self.inner.pool).await {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(SqliteDaoError::DuplicateKey {
                session_id: id.to_string(),
            }),
            Err(source) => Err(query_error("insert", id, source)),
        }
    }

    async fn update(&self, id: &SessionId, payload: &str) -> SqliteResult<()> {
        let (sql, values) = schema::update_payload(SqliteQueryBuilder, id.as_str(), payload);
        let result = sqlx::query_with(&sql, values)
            .execute(&self.inner.pool)
            .await
            .map_err(|source| query_error("update", id, source))?;
        if result.rows_affected() == 0 {
            debug!(session_id = %id, "update matched no SQLite row");
        }
        Ok(())
    }

    async fn upsert(&self, id: &SessionId, payload: &str) -> SqliteResult<()> {
        let (sql, values) = schema::upsert_session(SqliteQueryBuilder, id.as_str(), payload);
        sqlx::query_with(&sql, values)
            .execute(&self.inner.pool)
            .await
            .map_err(|source| query_error("upsert", id, source))?;
        Ok(())
    }

    async fn fetch(&self, id: &SessionId) -> SqliteResult<Option<String>> {
        let (sql, values) = schema::select_payload(SqliteQueryBuilder, id.as_str());
        let row = sqlx::query_with(&sql, values)
            .fetch_optional(&self.inner.pool)
            .await
            .map_err(|source| query_error("fetch", id, source))?;

        row.map(|row| row.try_get::<String, _>("game"))
            .transpose()
            .map_err(|source| query_error("fetch", id, source))
    }

    async fn ping(&self) -> SqliteResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.inner.pool)
            .await
            .map_err(|source| SqliteDaoError::HealthCheck { source })?;
        Ok(())
    }
}

fn query_error(operation: &'static str, id: &SessionId, source: sqlx::Error) -> SqliteDaoError {
    SqliteDaoError::Query {
        operation,
        session_id: id.to_string(),
        source,
    }
}

impl GameStore for SqliteGameStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    fn ensure_schema(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_schema().await.map_err(Into::into) })
    }

    fn exists(&self, id: SessionId) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.exists(&id).await.map_err(Into::into) })
    }

    fn insert(&self, id: SessionId, payload: String) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert(&id, &payload).await.map_err(Into::into) })
    }

    fn update(&self, id: SessionId, payload: String) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.update(&id, &payload).await.map_err(Into::into) })
    }

    fn upsert(&self, id: SessionId, payload: String) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.upsert(&id, &payload).await.map_err(Into::into) })
    }

    fn fetch(&self, id: SessionId) -> BoxFuture<'static, StorageResult<Option<String>>> {
        let store = self.clone();
        Box::pin(async move { store.fetch(&id).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }
}
