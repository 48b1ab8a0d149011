//! Client-side synchronizer: polls the server while another player is acting
//! and notifies the local player when the turn comes back to them.

/// `GET /sync` transport.
pub mod fetcher;
/// Registry of mounted views.
pub mod hub;
/// Polling decision state machine.
pub mod machine;
/// Best-effort turn notifications.
pub mod notifier;
/// Per-view polling task.
pub mod synchronizer;

pub use fetcher::{FetchError, HttpStateFetcher, StateFetcher};
pub use hub::{SyncHub, ViewKey};
pub use machine::{ClientSyncState, SyncPhase, TurnInputs};
pub use notifier::{
    LogNotifier, Notifier, NotifyError, Permission, TurnNotification, UnsupportedNotifier,
    notify_best_effort,
};
pub use synchronizer::{DEFAULT_POLL_INTERVAL, SyncHandle, SyncListener, Synchronizer};
