use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use axum_valid::Valid;

use crate::{
    dto::sync::{SyncQuery, SyncResponse},
    error::AppError,
    services::sync_service::{self, PollOutcome},
    state::SharedState,
};

/// Polling endpoint used by client synchronizers.
pub fn router() -> Router<SharedState> {
    Router::new().route("/sync", get(poll_state))
}

#[utoipa::path(
    get,
    path = "/sync",
    tag = "sync",
    params(SyncQuery),
    responses(
        (status = 200, description = "Current state for the player", body = SyncResponse),
        (status = 304, description = "Client already holds the current version"),
        (status = 401, description = "Unknown player or wrong secret"),
        (status = 404, description = "Unknown session")
    )
)]
/// Return the latest state of a session as seen by the requesting player.
pub async fn poll_state(
    State(state): State<SharedState>,
    Valid(Query(query)): Valid<Query<SyncQuery>>,
) -> Result<Response, AppError> {
    match sync_service::poll(&state, query).await? {
        PollOutcome::Fresh(payload) => Ok(Json(payload).into_response()),
        PollOutcome::NotModified => Ok(StatusCode::NOT_MODIFIED.into_response()),
    }
}
