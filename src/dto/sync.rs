//! DTOs exchanged by the polling endpoint and the client synchronizer.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::services::viewer::SessionView;

/// Query string of `GET /sync`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SyncQuery {
    /// Session to poll.
    #[validate(length(min = 1, max = 256))]
    pub session_id: String,
    /// Requesting player.
    #[validate(length(min = 1, max = 256))]
    pub player_id: String,
    /// Compared as-is with the secret stored for `playerId`.
    #[validate(length(min = 1, max = 512))]
    pub player_secret: String,
    /// Last state version the client has applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_version: Option<u64>,
}

/// Fresh state returned to a polling client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    /// Game state with every player secret removed.
    #[schema(value_type = Object)]
    pub game: Value,
    /// The requesting player, without secret.
    #[schema(value_type = Object)]
    pub viewing_player: Value,
    /// Inputs awaited from the requesting player, or `null`.
    #[schema(value_type = Object)]
    pub pending_inputs: Value,
    /// Version of the state carried in `game`, absent for unversioned payloads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_version: Option<u64>,
}

impl From<SessionView> for SyncResponse {
    fn from(view: SessionView) -> Self {
        Self {
            game: view.game,
            viewing_player: view.viewing_player,
            pending_inputs: view.pending_inputs,
            state_version: view.state_version,
        }
    }
}
