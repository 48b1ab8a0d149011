//! Registry of mounted session views, one synchronizer per view.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use super::{
    machine::{ClientSyncState, SyncPhase, TurnInputs},
    synchronizer::{SyncHandle, SyncListener, Synchronizer},
};

/// Identifies a mounted view: one player looking at one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewKey {
    /// Session shown by the view.
    pub session_id: String,
    /// Local player.
    pub player_id: String,
}

impl ViewKey {
    fn of(state: &ClientSyncState) -> Self {
        Self {
            session_id: state.session_id.clone(),
            player_id: state.local_player_id.clone(),
        }
    }
}

/// Per-key slot. Mounting and unmounting a key happen under its lock.
type ViewSlot = Arc<Mutex<Option<SyncHandle>>>;

/// Keeps at most one running synchronizer per [`ViewKey`].
pub struct SyncHub {
    synchronizer: Synchronizer,
    views: DashMap<ViewKey, ViewSlot>,
}

impl SyncHub {
    /// Empty hub mounting views through `synchronizer`.
    pub fn new(synchronizer: Synchronizer) -> Self {
        Self {
            synchronizer,
            views: DashMap::new(),
        }
    }

    /// Mount a view, first unmounting any view already registered under the
    /// same key.
    ///
    /// Concurrent mounts of one key are serialized, so the previous view is
    /// always stopped before its replacement starts.
    pub async fn mount(&self, state: ClientSyncState, listener: Arc<dyn SyncListener>) -> ViewKey {
        let key = ViewKey::of(&state);
        loop {
            let slot = Arc::clone(self.views.entry(key.clone()).or_default().value());
            let mut current = slot.lock().await;
            // An unmount may have dropped this slot while we waited for it.
            if !self.holds(&key, &slot) {
                continue;
            }
            if let Some(previous) = current.take() {
                previous.unmount().await;
            }
            *current = Some(self.synchronizer.mount(state, listener));
            return key;
        }
    }

    /// Forward new turn inputs. Returns `false` when the view is not mounted.
    pub async fn observe(&self, key: &ViewKey, inputs: TurnInputs) -> bool {
        let Some(slot) = self.slot(key) else {
            return false;
        };
        let current = slot.lock().await;
        current.as_ref().map(|handle| handle.observe(inputs)).is_some()
    }

    /// Current phase of a mounted view.
    pub async fn phase(&self, key: &ViewKey) -> Option<SyncPhase> {
        let slot = self.slot(key)?;
        let current = slot.lock().await;
        current.as_ref().map(SyncHandle::phase)
    }

    /// Returns `false` when the view was not mounted.
    pub async fn unmount(&self, key: &ViewKey) -> bool {
        let Some(slot) = self.slot(key) else {
            return false;
        };
        let mut current = slot.lock().await;
        let previous = current.take();
        self.views
            .remove_if(key, |_, registered| Arc::ptr_eq(registered, &slot));
        match previous {
            Some(handle) => {
                handle.unmount().await;
                true
            }
            None => false,
        }
    }

    /// Number of mounted views.
    pub fn len(&self) -> usize {
        self.views.len()
    }

    /// Whether no view is mounted.
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    fn slot(&self, key: &ViewKey) -> Option<ViewSlot> {
        self.views.get(key).map(|slot| Arc::clone(slot.value()))
    }

    fn holds(&self, key: &ViewKey, slot: &ViewSlot) -> bool {
        self.views
            .get(key)
            .is_some_and(|registered| Arc::ptr_eq(registered.value(), slot))
    }
}
