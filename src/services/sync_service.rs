use tracing::debug;

use crate::{
    dao::models::SessionId,
    dto::sync::{SyncQuery, SyncResponse},
    error::ServiceError,
    state::SharedState,
};

/// Result of one client poll.
#[derive(Debug)]
pub enum PollOutcome {
    /// The client is behind; here is the current state.
    Fresh(SyncResponse),
    /// The client already holds the current version.
    NotModified,
}

/// Answer a poll for the latest state of a session as seen by one player.
pub async fn poll(state: &SharedState, query: SyncQuery) -> Result<PollOutcome, ServiceError> {
    let SyncQuery {
        session_id,
        player_id,
        player_secret,
        state_version,
    } = query;
    let id = SessionId::from(session_id);

    let Some(payload) = state.store().get_game(&id).await? else {
        return Err(ServiceError::NotFound(format!("game `{id}` not found")));
    };

    let view = state.viewer().view(&payload, &player_id, &player_secret)?;
    // Unversioned payloads cannot be compared, so they are always sent.
    if view.state_version.is_some() && state_version == view.state_version {
        debug!(session_id = %id, version = ?view.state_version, "poll up to date");
        return Ok(PollOutcome::NotModified);
    }

    debug!(
        session_id = %id,
        version = ?view.state_version,
        known = ?state_version,
        "poll returned fresh state"
    );
    Ok(PollOutcome::Fresh(view.into()))
}
