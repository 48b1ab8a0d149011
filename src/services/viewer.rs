//! Per-player projection of a stored game payload.
//!
//! The store never looks inside payloads. Answering a poll does need a few
//! facts (who may look, which version this is, what that player sees), so the
//! rules engine plugs in through [`SessionViewer`].

use serde_json::{Map, Value};
use thiserror::Error;

/// What one player is allowed to see of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    /// `None` when the payload carries no `stateVersion`.
    pub state_version: Option<u64>,
    /// Game state without secrets.
    pub game: Value,
    /// The requesting player, without secret.
    pub viewing_player: Value,
    /// Inputs awaited from the requesting player.
    pub pending_inputs: Value,
}

/// Reasons a payload cannot be shown to the requesting player.
#[derive(Debug, Error)]
pub enum ViewError {
    /// Not valid JSON.
    #[error("stored game payload is malformed")]
    Malformed(#[source] serde_json::Error),
    /// Valid JSON, but not an object.
    #[error("stored game payload is not a JSON object")]
    NotAnObject,
    /// No player with this id.
    #[error("player `{0}` is not part of this game")]
    UnknownPlayer(String),
    /// Wrong secret for the player.
    #[error("player secret does not match")]
    SecretMismatch,
}

/// Rules-engine seam turning a stored payload into a player's view.
pub trait SessionViewer: Send + Sync {
    /// Check the player's credentials and build their view of `payload`.
    fn view(
        &self,
        payload: &str,
        player_id: &str,
        player_secret: &str,
    ) -> Result<SessionView, ViewError>;
}

/// Default viewer for JSON payloads shaped like
/// `{ "stateVersion": 3, "players": [{ "id", "secret", .. }], "pendingInputs": { "<id>": .. } }`.
///
/// Secrets are stripped from everything it returns.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSessionViewer;

const PLAYERS: &str = "players";
const SECRET: &str = "secret";

impl SessionViewer for JsonSessionViewer {
    /// Check the player's credentials and build their view of `payload`.
    fn view(
        &self,
        payload: &str,
        player_id: &str,
        player_secret: &str,
    ) -> Result<SessionView, ViewError> {
        let value: Value = serde_json::from_str(payload).map_err(ViewError::Malformed)?;
        let Value::Object(mut game) = value else {
            return Err(ViewError::NotAnObject);
        };

        let player = game
            .get(PLAYERS)
            .and_then(Value::as_array)
            .and_then(|players| {
                players
                    .iter()
                    .filter_map(Value::as_object)
                    .find(|p| p.get("id").and_then(Value::as_str) == Some(player_id))
            })
            .cloned()
            .ok_or_else(|| ViewError::UnknownPlayer(player_id.to_owned()))?;

        // Plain equality on an opaque token; no hashing involved.
        if player.get(SECRET).and_then(Value::as_str) != Some(player_secret) {
            return Err(ViewError::SecretMismatch);
        }

        let state_version = game.get("stateVersion").and_then(Value::as_u64);
        let pending_inputs = game
            .get("pendingInputs")
            .and_then(|inputs| inputs.get(player_id))
            .cloned()
            .unwrap_or(Value::Null);

        strip_secrets(&mut game);
        let mut viewing_player = player;
        viewing_player.remove(SECRET);

        Ok(SessionView {
            state_version,
            game: Value::Object(game),
            viewing_player: Value::Object(viewing_player),
            pending_inputs,
        })
    }
}

fn strip_secrets(game: &mut Map<String, Value>) {
    if let Some(Value::Array(players)) = game.get_mut(PLAYERS) {
        for player in players.iter_mut().filter_map(Value::as_object_mut) {
            player.remove(SECRET);
        }
    }
}
