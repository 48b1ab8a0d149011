use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the game state service.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sync::poll_state,
        crate::routes::game::create_game,
        crate::routes::game::load_game,
        crate::routes::game::save_game,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::BackendHealth,
            crate::dao::game_store::BackendKind,
            crate::dto::sync::SyncResponse,
            crate::dto::game::CreatedGame,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sync", description = "Client state polling"),
        (name = "game", description = "Game state persistence"),
    )
)]
pub struct ApiDoc;
