use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{services::documentation::ApiDoc, state::SharedState};

const UI_PATH: &str = "/docs";
const OPENAPI_PATH: &str = "/api-doc/openapi.json";

/// Swagger UI for the sync and persistence endpoints.
pub fn router() -> Router<SharedState> {
    SwaggerUi::new(UI_PATH).url(OPENAPI_PATH, ApiDoc::openapi()).into()
}
