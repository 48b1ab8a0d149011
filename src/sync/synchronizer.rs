//! Background task keeping one mounted session view up to date.
//!
//! Each view gets its own task owning a [`SyncMachine`]. While the machine is
//! `Polling` the task sleeps for the configured interval, fetches, and only
//! then arms the next sleep, so polls of one view never overlap. An in-flight
//! fetch is never cancelled: commands sent meanwhile wait until it resolves.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{self, Instant},
};
use tracing::{debug, warn};

use crate::dto::sync::SyncResponse;

use super::{
    fetcher::StateFetcher,
    machine::{ClientSyncState, SyncMachine, SyncPhase, TurnInputs},
    notifier::{Notifier, TurnNotification, notify_best_effort},
};

/// Interval between two polls of a waiting view.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Receives every fresh state of the session.
///
/// Returning turn inputs feeds them back into the polling decision, the same
/// way [`SyncHandle::observe`] does.
pub trait SyncListener: Send + Sync {
    /// Apply a fresh response; return the new turn inputs if they changed.
    fn on_update(&self, response: &SyncResponse) -> Option<TurnInputs>;
}

impl<F> SyncListener for F
where
    F: Fn(&SyncResponse) -> Option<TurnInputs> + Send + Sync,
{
    /// Apply a fresh response; return the new turn inputs if they changed.
    fn on_update(&self, response: &SyncResponse) -> Option<TurnInputs> {
        self(response)
    }
}

enum Command {
    Observe(TurnInputs),
    Unmount,
}

enum Wake {
    Command(Option<Command>),
    Tick,
}

/// Mounts session views and drives their polling.
#[derive(Clone)]
pub struct Synchronizer {
    fetcher: Arc<dyn StateFetcher>,
    notifier: Arc<dyn Notifier>,
    interval: Duration,
}

impl Synchronizer {
    /// Synchronizer polling through `fetcher` every [`DEFAULT_POLL_INTERVAL`].
    pub fn new(fetcher: Arc<dyn StateFetcher>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            fetcher,
            notifier,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Replace [`DEFAULT_POLL_INTERVAL`].
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Start synchronizing `state`. Must be called inside a Tokio runtime.
    pub fn mount(&self, state: ClientSyncState, listener: Arc<dyn SyncListener>) -> SyncHandle {
        let mut machine = SyncMachine::new(state);
        let decision = machine.mount();
        debug!(
            session_id = %machine.state().session_id,
            player_id = %machine.state().local_player_id,
            phase = ?decision.phase,
            "mounted session view"
        );

        let (phase_tx, phase_rx) = watch::channel(decision.phase);
        let (commands, receiver) = mpsc::unbounded_channel();
        let worker = SyncWorker {
            machine,
            fetcher: self.fetcher.clone(),
            notifier: self.notifier.clone(),
            listener,
            interval: self.interval,
            phase: phase_tx,
        };

        SyncHandle {
            commands,
            phase: phase_rx,
            task: Some(tokio::spawn(worker.run(receiver))),
        }
    }
}

/// Owner side of a mounted view. Dropping it unmounts the view.
pub struct SyncHandle {
    commands: mpsc::UnboundedSender<Command>,
    phase: watch::Receiver<SyncPhase>,
    task: Option<JoinHandle<()>>,
}

impl SyncHandle {
    /// Report a change of the active player or the game-over flag.
    pub fn observe(&self, inputs: TurnInputs) {
        // The worker only stops after unmount; nothing is left to update.
        let _ = self.commands.send(Command::Observe(inputs));
    }

    /// Latest published phase.
    pub fn phase(&self) -> SyncPhase {
        *self.phase.borrow()
    }

    /// Receiver updated on every phase change.
    pub fn watch_phase(&self) -> watch::Receiver<SyncPhase> {
        self.phase.clone()
    }

    /// Stop polling and wait for the worker to finish its current fetch.
    pub async fn unmount(mut self) {
        let _ = self.commands.send(Command::Unmount);
        let Some(task) = self.task.take() else {
            return;
        };
        if let Err(err) = task.await {
            warn!(error = %err, "synchronizer task ended abnormally");
        }
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Unmount);
    }
}

struct SyncWorker {
    machine: SyncMachine,
    fetcher: Arc<dyn StateFetcher>,
    notifier: Arc<dyn Notifier>,
    listener: Arc<dyn SyncListener>,
    interval: Duration,
    phase: watch::Sender<SyncPhase>,
}

impl SyncWorker {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let mut next_poll = self.schedule();

        loop {
            let wake = match next_poll {
                Some(deadline) => tokio::select! {
                    command = commands.recv() => Wake::Command(command),
                    () = time::sleep_until(deadline) => Wake::Tick,
                },
                None => Wake::Command(commands.recv().await),
            };

            match wake {
                Wake::Tick => {
                    self.poll_once().await;
                    next_poll = self.schedule();
                }
                Wake::Command(Some(Command::Observe(inputs))) => {
                    if self.apply(inputs).await {
                        next_poll = self.schedule();
                    }
                }
                Wake::Command(Some(Command::Unmount) | None) => break,
            }
        }

        self.phase.send_replace(SyncPhase::Stopped);
        debug!(session_id = %self.machine.state().session_id, "unmounted session view");
    }

    fn schedule(&self) -> Option<Instant> {
        self.machine
            .is_polling()
            .then(|| Instant::now() + self.interval)
    }

    /// Returns whether the inputs changed, which restarts the timer.
    async fn apply(&mut self, inputs: TurnInputs) -> bool {
        let Some(decision) = self.machine.observe(inputs) else {
            return false;
        };

        if decision.turn_passed_to_me {
            let session_id = &self.machine.state().session_id;
            let shown = notify_best_effort(
                self.notifier.as_ref(),
                &TurnNotification::your_turn(session_id),
            )
            .await;
            debug!(%session_id, shown, "turn passed to local player");
        }
        self.phase.send_replace(decision.phase);
        true
    }

    async fn poll_once(&mut self) {
        let query = self.machine.state().poll_query();
        match self.fetcher.fetch(query).await {
            Ok(Some(response)) => {
                self.machine.apply_response(&response);
                if let Some(inputs) = self.listener.on_update(&response) {
                    self.apply(inputs).await;
                }
            }
            Ok(None) => {}
            Err(err) => {
                warn!(
                    session_id = %self.machine.state().session_id,
                    error = %err,
                    "poll failed; waiting for next tick"
                );
            }
        }
    }
}
