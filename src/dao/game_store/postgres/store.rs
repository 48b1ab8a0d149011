use std::sync::Arc;

use futures::future::BoxFuture;
use sea_query::PostgresQueryBuilder;
use sqlx::{PgPool, Row, postgres::PgPoolOptions};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::dao::{
    game_store::{BackendKind, GameStore, is_unique_violation, schema},
    models::SessionId,
    storage::StorageResult,
};

use super::{
    config::PostgresConfig,
    error::{PostgresDaoError, PostgresResult},
};

/// Session table hosted on a PostgreSQL server, shared through a connection pool.
#[derive(Clone)]
pub struct PostgresGameStore {
    inner: Arc<PostgresInner>,
}

struct PostgresInner {
    pool: PgPool,
    kind: BackendKind,
    schema_ready: OnceCell<()>,
}

impl PostgresGameStore {
    /// Build the pool for `config`. `kind` tells the current endpoint apart
    /// from the legacy one in logs and health reports.
    pub async fn connect(config: PostgresConfig, kind: BackendKind) -> PostgresResult<Self> {
        let options = config.connect_options()?;
        let host = options.get_host().to_owned();

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|source| PostgresDaoError::Connect {
                host: host.clone(),
                source,
            })?;

        info!(%host, backend = %kind, max = config.max_connections, "connected to PostgreSQL session store");

        Ok(Self {
            inner: Arc::new(PostgresInner {
                pool,
                kind,
                schema_ready: OnceCell::new(),
            }),
        })
    }

    async fn ensure_schema(&self) -> PostgresResult<()> {
        let inner = &self.inner;
        inner
            .schema_ready
            .get_or_try_init(|| async {
                let ddl = schema::create_table(PostgresQueryBuilder);
                sqlx::query(&ddl)
                    .execute(&inner.pool)
                    .await
                    .map_err(|source| PostgresDaoError::EnsureSchema { source })?;
                debug!(backend = %inner.kind, "PostgreSQL sessions table ready");
                Ok::<(), PostgresDaoError>(())
            })
            .await?;
        Ok(())
    }

    async fn exists(&self, id: &SessionId) -> PostgresResult<bool> {
        let (sql, values) = schema::count_sessions(PostgresQueryBuilder, id.as_str());
        let row = sqlx::query_with(&sql, values)
            .fetch_one(&self.inner.pool)
            .await
            .map_err(|source| query_error("exists", id, source))?;
        let matches: i64 = row
            .try_get(schema::COUNT_COLUMN)
            .map_err(|source| query_error("exists", id, source))?;
        Ok(matches == 1)
    }

    async fn insert(&self, id: &SessionId, payload: &str) -> PostgresResult<()> {
        let (sql, values) = schema::insert_session(PostgresQueryBuilder, id.as_str(), payload);
        match sqlx::query_with(&sql, values).execute(&self.inner.pool).await {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(PostgresDaoError::DuplicateKey {
                session_id: id.to_string(),
            }),
            Err(source) => Err(query_error("insert", id, source)),
        }
    }

    async fn update(&self, id: &SessionId, payload: &str) -> PostgresResult<()> {
        let (sql, values) = schema::update_payload(PostgresQueryBuilder, id.as_str(), payload);
        let result = sqlx::query_with(&sql, values)
            .execute(&self.inner.pool)
            .await
            .map_err(|source| query_error("update", id, source))?;
        if result.rows_affected() == 0 {
            debug!(session_id = %id, backend = %self.inner.kind, "update matched no PostgreSQL row");
        }
        Ok(())
    }

    async fn upsert(&self, id: &SessionId, payload: &str) -> PostgresResult<()> {
        let (sql, values) = schema::upsert_session(PostgresQueryBuilder, id.as_str(), payload);
        sqlx::query_with(&sql, values)
            .execute(&self.inner.pool)
            .await
            .map_err(|source| query_error("upsert", id, source))?;
        Ok(())
    }

    async fn fetch(&self, id: &SessionId) -> PostgresResult<Option<String>> {
        let (sql, values) = schema::select_payload(PostgresQueryBuilder, id.as_str());
        let row = sqlx::query_with(&sql, values)
            .fetch_optional(&self.inner.pool)
            .await
            .map_err(|source| query_error("fetch", id, source))?;

        row.map(|row| row.try_get::<String, _>("game"))
            .transpose()
            .map_err(|source| query_error("fetch", id, source))
    }

    async fn ping(&self) -> PostgresResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.inner.pool)
            .await
            .map_err(|source| PostgresDaoError::HealthCheck { source })?;
        Ok(())
    }
}

fn query_error(operation: &'static str, id: &SessionId, source: sqlx::Error) -> PostgresDaoError {
    PostgresDaoError::Query {
        operation,
        session_id: id.to_string(),
        source,
    }
}

impl GameStore for PostgresGameStore {
    fn kind(&self) -> BackendKind {
        self.inner.kind
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
