//! Polling decision logic for one mounted session view, free of any I/O.

use serde::Serialize;

use crate::dto::sync::{SyncQuery, SyncResponse};

/// Whether a view is currently polling the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    /// Created but not yet evaluated.
    Idle,
    /// Waiting on another player; the poll timer is armed.
    Polling,
    /// Local player's turn or game over; no network activity.
    Stopped,
}

/// Inputs the polling decision depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnInputs {
    /// Player whose move it is.
    pub active_player_id: String,
    /// Whether the game has ended.
    pub is_game_over: bool,
}

/// Client-side view of one session, owned by its synchronizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSyncState {
    /// Session being watched.
    pub session_id: String,
    /// Player this client acts for.
    pub local_player_id: String,
    /// Secret sent with every poll.
    pub local_player_secret: String,
    /// Player whose move it is.
    pub active_player_id: String,
    /// Version of the last applied poll response, sent back on the next poll.
    pub last_known_state_version: Option<u64>,
    /// Whether the game has ended.
    pub is_game_over: bool,
}

impl ClientSyncState {
    /// State of a view that has not polled yet.
    pub fn new(
        session_id: impl Into<String>,
        local_player_id: impl Into<String>,
        local_player_secret: impl Into<String>,
        inputs: TurnInputs,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            local_player_id: local_player_id.into(),
            local_player_secret: local_player_secret.into(),
            active_player_id: inputs.active_player_id,
            last_known_state_version: None,
            is_game_over: inputs.is_game_over,
        }
    }

    fn inputs(&self) -> TurnInputs {
        TurnInputs {
            active_player_id: self.active_player_id.clone(),
            is_game_over: self.is_game_over,
        }
    }

    fn is_my_turn(&self) -> bool {
        self.active_player_id == self.local_player_id
    }

    /// Query string for the next poll.
    pub fn poll_query(&self) -> SyncQuery {
        SyncQuery {
            session_id: self.session_id.clone(),
            player_id: self.local_player_id.clone(),
            player_secret: self.local_player_secret.clone(),
            state_version: self.last_known_state_version,
        }
    }
}

/// Outcome of evaluating a change of inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Phase after the transition.
    pub phase: SyncPhase,
    /// The turn just moved to the local player; try to notify them.
    pub turn_passed_to_me: bool,
}

/// Idle/Polling/Stopped state machine of a session view.
#[derive(Debug)]
pub struct SyncMachine {
    state: ClientSyncState,
    phase: SyncPhase,
}

impl SyncMachine {
    /// Wrap `state`; nothing happens until mounted.
    pub fn new(state: ClientSyncState) -> Self {
        Self {
            state,
            phase: SyncPhase::Idle,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    /// Current client view of the session.
    pub fn state(&self) -> &ClientSyncState {
        &self.state
    }

    /// Whether a poll timer should be running.
    pub fn is_polling(&self) -> bool {
        self.phase == SyncPhase::Polling
    }

    /// First evaluation after mount. Never notifies: there is no earlier
    /// observation to compare with.
    pub fn mount(&mut self) -> Decision {
        self.phase = self.evaluate();
        Decision {
            phase: self.phase,
            turn_passed_to_me: false,
        }
    }

    /// Feed new inputs. Returns `None` when neither the active player nor the
    /// game-over flag changed, in which case any running timer is left alone.
    pub fn observe(&mut self, inputs: TurnInputs) -> Option<Decision> {
        if self.phase == SyncPhase::Idle {
            self.state.active_player_id = inputs.active_player_id;
            self.state.is_game_over = inputs.is_game_over;
            return Some(self.mount());
        }
        if inputs == self.state.inputs() {
            return None;
        }

        let was_my_turn = self.state.is_my_turn();
        self.state.active_player_id = inputs.active_player_id;
        self.state.is_game_over = inputs.is_game_over;
        self.phase = self.evaluate();

        Some(Decision {
            phase: self.phase,
            turn_passed_to_me: !was_my_turn && self.state.is_my_turn(),
        })
    }

    /// Record a successful poll. The latest arrival wins; versions are not
    /// compared.
    pub fn apply_response(&mut self, response: &SyncResponse) {
        self.state.last_known_state_version = response.state_version;
    }

    fn evaluate(&self) -> SyncPhase {
        if self.state.is_game_over || self.state.is_my_turn() {
            SyncPhase::Stopped
        } else {
            SyncPhase::Polling
        }
    }
}
