use axum::Router;

use crate::state::SharedState;

/// Swagger UI and OpenAPI document.
pub mod docs;
/// Raw session persistence.
pub mod game;
/// Health check.
pub mod health;
/// Client polling.
pub mod sync;

/// Compose all route trees and attach the shared state.
pub fn router(state: SharedState) -> Router<()> {
    health::router()
        .merge(sync::router())
        .merge(game::router(state.clone()))
        .merge(docs::router())
        .with_state(state)
}
