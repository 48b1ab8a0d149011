use tracing::info;

use crate::{dao::models::SessionId, error::ServiceError, state::SharedState};

/// Persist the first state of a brand-new session under a freshly minted id.
pub async fn create_game(state: &SharedState, payload: String) -> Result<SessionId, ServiceError> {
    ensure_payload(&payload)?;
    let id = SessionId::generate();
    state.store().save_game(&id, payload).await?;
    info!(session_id = %id, "created game session");
    Ok(id)
}

/// Overwrite (or create) the stored state of `id`.
pub async fn save_game(
    state: &SharedState,
    id: SessionId,
    payload: String,
) -> Result<(), ServiceError> {
    ensure_payload(&payload)?;
    state.store().save_game(&id, payload).await?;
    Ok(())
}

/// Raw payload of `id`.
pub async fn load_game(state: &SharedState, id: SessionId) -> Result<String, ServiceError> {
    state
        .store()
        .get_game(&id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game `{id}` not found")))
}

fn ensure_payload(payload: &str) -> Result<(), ServiceError> {
    if payload.trim().is_empty() {
        return Err(ServiceError::InvalidInput(
            "game payload must not be empty".into(),
        ));
    }
    Ok(())
}
