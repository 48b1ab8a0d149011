use serde::Serialize;
use utoipa::ToSchema;

/// Returned when a new session is created.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatedGame {
    /// Freshly minted session id (always under the current `v2:` scheme).
    pub session_id: String,
}
