//! Façade every other layer uses to read and write persisted sessions.

use std::{fmt, str::FromStr, sync::Arc};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::dao::{
    game_store::GameStore,
    models::SessionId,
    registry::StoreRegistry,
    storage::{StorageError, StorageResult},
};

/// How `save_game` turns "create if absent, else overwrite" into backend calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpsertMode {
    /// One insert-or-replace statement; concurrent first saves cannot collide.
    #[default]
    Atomic,
    /// `exists` then `update` or `insert`. Two overlapping first saves make
    /// the losing insert fail with `DuplicateKey`.
    CheckThenWrite,
    /// Like [`UpsertMode::CheckThenWrite`], but a losing insert is retried
    /// once as an update.
    RetryOnConflict,
}

impl FromStr for UpsertMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "atomic" => Ok(UpsertMode::Atomic),
            "check-then-write" => Ok(UpsertMode::CheckThenWrite),
            "retry-on-conflict" => Ok(UpsertMode::RetryOnConflict),
            other => Err(format!("unknown upsert mode `{other}`")),
        }
    }
}

impl fmt::Display for UpsertMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UpsertMode::Atomic => "atomic",
            UpsertMode::CheckThenWrite => "check-then-write",
            UpsertMode::RetryOnConflict => "retry-on-conflict",
        };
        f.write_str(name)
    }
}

/// Entry point for loading and saving game sessions.
///
/// Backend errors come back unchanged; an unknown session is `Ok(None)`.
#[derive(Debug, Clone)]
pub struct GameStoreApi {
    registry: Arc<StoreRegistry>,
    mode: UpsertMode,
}

impl GameStoreApi {
    /// Façade saving with `mode`.
    pub fn new(registry: Arc<StoreRegistry>, mode: UpsertMode) -> Self {
        Self { registry, mode }
    }

    /// Backend registry behind this façade.
    pub fn registry(&self) -> &StoreRegistry {
        &self.registry
    }

    /// Strategy used by [`Self::save_game`].
    pub fn upsert_mode(&self) -> UpsertMode {
        self.mode
    }

    /// Current payload of `id`, or `None` when the session is unknown.
    pub async fn get_game(&self, id: &SessionId) -> StorageResult<Option<String>> {
        let store = self.ready_store(id).await?;
        let payload = store.fetch(id.clone()).await?;
        debug!(
            session_id = %id,
            backend = %store.kind(),
            found = payload.is_some(),
            "loaded game"
        );
        Ok(payload)
    }

    /// Persist `payload` as the latest state of `id`, creating the record on
    /// first save.
    pub async fn save_game(&self, id: &SessionId, payload: String) -> StorageResult<()> {
        let store = self.ready_store(id).await?;
        match self.mode {
            UpsertMode::Atomic => store.upsert(id.clone(), payload).await?,
            UpsertMode::CheckThenWrite => check_then_write(store.as_ref(), id, payload).await?,
            UpsertMode::RetryOnConflict => {
                match check_then_write(store.as_ref(), id, payload.clone()).await {
                    Err(err) if err.is_duplicate_key() => {
                        warn!(session_id = %id, "insert lost a race; retrying as update");
                        store.update(id.clone(), payload).await?
                    }
                    other => other?,
                }
            }
        }
        debug!(session_id = %id, backend = %store.kind(), mode = %self.mode, "saved game");
        Ok(())
    }

    async fn ready_store(&self, id: &SessionId) -> StorageResult<Arc<dyn GameStore>> {
        let store = self.registry.resolve(id).await?;
        store.ensure_schema().await?;
        Ok(store)
    }
}

async fn check_then_write(
    store: &dyn GameStore,
    id: &SessionId,
    payload: String,
) -> Result<(), StorageError> {
    if store.exists(id.clone()).await? {
        store.update(id.clone(), payload).await
    } else {
        store.insert(id.clone(), payload).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use futures::future::BoxFuture;
    use tokio::sync::Barrier;

    use super::*;
    use crate::{
        config::StoreEndpointConfig,
        dao::{
            game_store::BackendKind,
            registry::{
                StoreConnector,
                tests::{MemoryStore, memory_connector},
            },
        },
    };

    fn sqlite_only() -> StoreEndpointConfig {
        StoreEndpointConfig {
            sqlite_path: Some("games.db".into()),
            ..Default::default()
        }
    }

    fn memory_api(mode: UpsertMode) -> GameStoreApi {
        let registry =
            StoreRegistry::with_connector(sqlite_only(), memory_connector(Arc::default())).unwrap();
        GameStoreApi::new(Arc::new(registry), mode)
    }

    /// Lets every `exists` check finish before any caller moves on, forcing
    /// two first saves to interleave.
    struct RacyStore {
        inner: MemoryStore,
        gate: Arc<Barrier>,
    }

    impl GameStore for RacyStore {
        fn kind(&self) -> BackendKind {
            self.inner.kind()
        }
        fn ensure_schema(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.ensure_schema()
        }
        fn exists(&self, id: SessionId) -> BoxFuture<'static, StorageResult<bool>> {
            let check = self.inner.exists(id);
            let gate = self.gate.clone();
            Box::pin(async move {
                let found = check.await;
                gate.wait().await;
                found
            })
        }
        fn insert(&self, id: SessionId, payload: String) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.insert(id, payload)
        }
        fn update(&self, id: SessionId, payload: String) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.update(id, payload)
        }
        fn upsert(&self, id: SessionId, payload: String) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.upsert(id, payload)
        }
        fn fetch(&self, id: SessionId) -> BoxFuture<'static, StorageResult<Option<String>>> {
            self.inner.fetch(id)
        }
        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.health_check()
        }
    }

    fn racy_api(mode: UpsertMode) -> GameStoreApi {
        let store: Arc<dyn GameStore> = Arc::new(RacyStore {
            inner: MemoryStore::new(BackendKind::Sqlite),
            gate: Arc::new(Barrier::new(2)),
        });
        let connector: StoreConnector = Arc::new(move |_, _| {
            let store = store.clone();
            Box::pin(async move { Ok(store) })
        });
        let registry = StoreRegistry::with_connector(sqlite_only(), connector).unwrap();
        GameStoreApi::new(Arc::new(registry), mode)
    }

    async fn overlapping_first_saves(api: &GameStoreApi) -> Vec<StorageResult<()>> {
        let id = SessionId::from("v2:fresh");
        let (a, b) = tokio::join!(
            api.save_game(&id, "{state:a}".into()),
            api.save_game(&id, "{state:b}".into())
        );
        vec![a, b]
    }

    #[test]
    fn test_upsert_mode_parsing() {
        assert_eq!("atomic".parse::<UpsertMode>().unwrap(), UpsertMode::Atomic);
        assert_eq!(
            " Check-Then-Write ".parse::<UpsertMode>().unwrap(),
            UpsertMode::CheckThenWrite
        );
        assert_eq!(
            "retry-on-conflict".parse::<UpsertMode>().unwrap(),
            UpsertMode::RetryOnConflict
        );
        assert!("sometimes".parse::<UpsertMode>().is_err());
    }

    #[tokio::test]
    async fn test_unknown_session_is_absent() {
        for mode in [
            UpsertMode::Atomic,
            UpsertMode::CheckThenWrite,
            UpsertMode::RetryOnConflict,
        ] {
            let api = memory_api(mode);
            assert_eq!(api.get_game(&SessionId::from("v2:nope")).await.unwrap(), None);
        }
    }

    #[tokio::test]
    async fn test_sequential_saves_keep_last_payload() {
        for mode in [
            UpsertMode::Atomic,
            UpsertMode::CheckThenWrite,
            UpsertMode::RetryOnConflict,
        ] {
            let api = memory_api(mode);
            let id = SessionId::from("v2:abc");
            api.save_game(&id, "{state:1}".into()).await.unwrap();
            assert_eq!(api.get_game(&id).await.unwrap().as_deref(), Some("{state:1}"));
            api.save_game(&id, "{state:2}".into()).await.unwrap();
            assert_eq!(api.get_game(&id).await.unwrap().as_deref(), Some("{state:2}"));
        }
    }

    #[tokio::test]
    async fn test_check_then_write_surfaces_lost_race() {
        let api = racy_api(UpsertMode::CheckThenWrite);
        let results = overlapping_first_saves(&api).await;

        let successes = results.iter().filter(|r| r.is_ok()).count();
        let duplicates = results
            .iter()
            .filter(|r| matches!(r, Err(StorageError::DuplicateKey { .. })))
            .count();
        assert_eq!((successes, duplicates), (1, 1));
        assert!(
            api.get_game(&SessionId::from("v2:fresh"))
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_retry_on_conflict_resolves_lost_race() {
        let api = racy_api(UpsertMode::RetryOnConflict);
        let results = overlapping_first_saves(&api).await;
        assert!(results.iter().all(|r| r.is_ok()));

        let stored = api
            .get_game(&SessionId::from("v2:fresh"))
            .await
            .unwrap()
            .unwrap();
        assert!(stored == "{state:a}" || stored == "{state:b}");
    }

    #[tokio::test]
    async fn test_errors_propagate_unchanged() {
        let built = Arc::new(Mutex::new(0));
        let counter = built.clone();
        let connector: StoreConnector = Arc::new(move |kind, _| {
            *counter.lock().unwrap() += 1;
            Box::pin(async move {
                Err(StorageError::unavailable(
                    "connection refused".into(),
                    crate::dao::registry::BackendDisabled { kind },
                ))
            })
        });
        let registry = StoreRegistry::with_connector(sqlite_only(), connector).unwrap();
        let api = GameStoreApi::new(Arc::new(registry), UpsertMode::Atomic);

        let err = api.get_game(&SessionId::from("v2:x")).await.unwrap_err();
        assert!(matches!(err, StorageError::Unavailable { .. }));
        let err = api
            .save_game(&SessionId::from("v2:x"), "{}".into())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Unavailable { .. }));
        assert_eq!(*built.lock().unwrap(), 2);
    }
}
