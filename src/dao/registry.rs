//! Routing of session ids to backend instances.
//!
//! Each backend kind gets one lazily built driver that lives as long as the
//! registry. The id prefix alone decides which kinds a session may use.

use std::{fmt, sync::Arc};

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::{
    config::{StoreEndpoint, StoreEndpointConfig},
    dao::{
        game_store::{BackendKind, GameStore},
        models::{SessionId, SessionScheme},
        storage::{StorageError, StorageResult},
    },
};

/// Builds the driver for one backend kind on first use.
pub type StoreConnector = Arc<
    dyn Fn(BackendKind, StoreEndpoint) -> BoxFuture<'static, StorageResult<Arc<dyn GameStore>>>
        + Send
        + Sync,
>;

const V2_ORDER: [BackendKind; 2] = [BackendKind::Postgres, BackendKind::Sqlite];
const LEGACY_ORDER: [BackendKind; 2] = [BackendKind::LegacyPostgres, BackendKind::Sqlite];

/// Backend kinds a session may live on, most preferred first.
pub fn preferred_kinds(id: &SessionId) -> &'static [BackendKind] {
    match id.scheme() {
        SessionScheme::V2 => &V2_ORDER,
        SessionScheme::Legacy => &LEGACY_ORDER,
    }
}

/// A backend was configured whose support is not compiled into this binary.
#[derive(Debug, Error)]
#[error("support for the {kind} backend is not compiled in")]
pub struct BackendDisabled {
    /// The configured kind.
    pub kind: BackendKind,
}

/// Owner of the per-kind driver singletons.
pub struct StoreRegistry {
    endpoints: StoreEndpointConfig,
    postgres: OnceCell<Arc<dyn GameStore>>,
    legacy_postgres: OnceCell<Arc<dyn GameStore>>,
    sqlite: OnceCell<Arc<dyn GameStore>>,
    connector: StoreConnector,
}

impl fmt::Debug for StoreRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreRegistry")
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

impl StoreRegistry {
    /// Registry connecting to the real backends.
    pub fn new(endpoints: StoreEndpointConfig) -> StorageResult<Self> {
        Self::with_connector(endpoints, Arc::new(connect_backend))
    }

    /// Registry using a custom driver factory.
    ///
    /// Fails right away when no endpoint is configured at all.
    pub fn with_connector(
        endpoints: StoreEndpointConfig,
        connector: StoreConnector,
    ) -> StorageResult<Self> {
        if endpoints.is_empty() {
            return Err(StorageError::NoBackendConfigured);
        }

        Ok(Self {
            endpoints,
            postgres: OnceCell::new(),
            legacy_postgres: OnceCell::new(),
            sqlite: OnceCell::new(),
            connector,
        })
    }

    /// First kind in the id's preference order that has an endpoint.
    pub fn select_kind(&self, id: &SessionId) -> StorageResult<BackendKind> {
        preferred_kinds(id)
            .iter()
            .copied()
            .find(|kind| self.endpoints.is_configured(*kind))
            .ok_or(StorageError::NoBackendConfigured)
    }

    /// Driver responsible for `id`, built on first need.
    pub async fn resolve(&self, id: &SessionId) -> StorageResult<Arc<dyn GameStore>> {
        let kind = self.select_kind(id)?;
        debug!(session_id = %id, backend = %kind, "resolved storage backend");
        self.driver(kind).await
    }

    /// Drivers that have been built so far.
    pub fn instantiated(&self) -> Vec<Arc<dyn GameStore>> {
        [&self.postgres, &self.legacy_postgres, &self.sqlite]
            .into_iter()
            .filter_map(|slot| slot.get().cloned())
            .collect()
    }

    /// Endpoints this registry was built from.
    pub fn endpoints(&self) -> &StoreEndpointConfig {
        &self.endpoints
    }

    async fn driver(&self, kind: BackendKind) -> StorageResult<Arc<dyn GameStore>> {
        let endpoint = self
            .endpoints
            .endpoint(kind)
            .ok_or(StorageError::NoBackendConfigured)?;

        // A failed build leaves the slot empty; the next request retries it.
        let store = self
            .slot(kind)
            .get_or_try_init(|| async {
                let store = (self.connector)(kind, endpoint).await?;
                info!(backend = %kind, "storage backend initialised");
                Ok::<_, StorageError>(store)
            })
            .await?;
        Ok(store.clone())
    }

    fn slot(&self, kind: BackendKind) -> &OnceCell<Arc<dyn GameStore>> {
        match kind {
            BackendKind::Postgres => &self.postgres,
            BackendKind::LegacyPostgres => &self.legacy_postgres,
            BackendKind::Sqlite => &self.sqlite,
        }
    }
}

/// Default connector building the compiled-in drivers.
pub fn connect_backend(
    kind: BackendKind,
    endpoint: StoreEndpoint,
) -> BoxFuture<'static, StorageResult<Arc<dyn GameStore>>> {
    Box::pin(async move {
        match endpoint {
            #[cfg(feature = "postgres-store")]
            StoreEndpoint::Postgres(url) => {
                use crate::dao::game_store::postgres::{PostgresConfig, PostgresGameStore};

                let store = PostgresGameStore::connect(PostgresConfig::new(url), kind).await?;
                Ok(Arc::new(store) as Arc<dyn GameStore>)
            }
            #[cfg(feature = "sqlite-store")]
            StoreEndpoint::Sqlite(path) => {
                use crate::dao::game_store::sqlite::{SqliteConfig, SqliteGameStore};

                let store = SqliteGameStore::connect(SqliteConfig::new(path)).await?;
                Ok(Arc::new(store) as Arc<dyn GameStore>)
            }
            #[allow(unreachable_patterns)]
            _ => Err(StorageError::unavailable(
                format!("{kind} backend unavailable"),
                BackendDisabled { kind },
            )),
        }
    })
}
