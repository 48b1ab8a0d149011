use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};

use crate::{
    dao::models::SessionId, dto::game::CreatedGame, error::AppError, services::game_service,
    state::SharedState,
};

/// Header carrying the admin token on `/games` requests.
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Routes used by the rules engine host to persist and load sessions.
///
/// Raw payloads include player secrets, so every route requires the admin token.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/games", post(create_game))
        .route("/games/{id}", get(load_game).put(save_game))
        .route_layer(middleware::from_fn_with_state(state, require_admin_token))
}

/// Store the first state of a new session and return its id.
#[utoipa::path(
    post,
    path = "/games",
    tag = "game",
    params(("X-Admin-Token" = String, Header, description = "Configured admin token")),
    request_body(content = String, content_type = "text/plain"),
    responses(
        (status = 201, description = "Game created", body = CreatedGame),
        (status = 401, description = "Missing or invalid admin token")
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
    payload: String,
) -> Result<(StatusCode, Json<CreatedGame>), AppError> {
    let id = game_service::create_game(&state, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedGame {
            session_id: id.to_string(),
        }),
    ))
}

/// Return the raw stored payload of a session.
#[utoipa::path(
    get,
    path = "/games/{id}",
    tag = "game",
    params(
        ("X-Admin-Token" = String, Header, description = "Configured admin token"),
        ("id" = String, Path, description = "Session id")
    ),
    responses(
        (status = 200, description = "Stored payload", body = String, content_type = "text/plain"),
        (status = 401, description = "Missing or invalid admin token"),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn load_game(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<String, AppError> {
    Ok(game_service::load_game(&state, SessionId::from(id)).await?)
}

/// Replace the stored payload of a session, creating it when absent.
#[utoipa::path(
    put,
    path = "/games/{id}",
    tag = "game",
    params(
        ("X-Admin-Token" = String, Header, description = "Configured admin token"),
        ("id" = String, Path, description = "Session id")
    ),
    request_body(content = String, content_type = "text/plain"),
    responses(
        (status = 204, description = "Game saved"),
        (status = 401, description = "Missing or invalid admin token"),
        (status = 409, description = "Concurrent first save won the race")
    )
)]
pub async fn save_game(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    payload: String,
) -> Result<StatusCode, AppError> {
    game_service::save_game(&state, SessionId::from(id), payload).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn require_admin_token(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
        .ok_or_else(|| {
            AppError::Unauthorized("missing admin token header `X-Admin-Token`".into())
        })?;

    match state.admin_token() {
        Some(token) if token == provided => Ok(next.run(req).await),
        Some(_) => Err(AppError::Unauthorized("invalid admin token".into())),
        None => Err(AppError::Unauthorized("no admin token configured".into())),
    }
}
