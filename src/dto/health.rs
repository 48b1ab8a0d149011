use serde::Serialize;
use utoipa::ToSchema;

use crate::dao::game_store::BackendKind;

/// Health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Backends that have been initialised so far and their last ping result.
    pub backends: Vec<BackendHealth>,
    /// RFC 3339 time of the check.
    pub checked_at: String,
}

/// Ping result for one storage backend.
#[derive(Debug, Serialize, ToSchema)]
pub struct BackendHealth {
    /// Backend family.
    pub kind: BackendKind,
    /// Whether the last ping succeeded.
    pub healthy: bool,
}

impl HealthResponse {
    /// Build the response; any unhealthy backend marks the service degraded.
    pub fn from_backends(backends: Vec<BackendHealth>, checked_at: String) -> Self {
        let status = if backends.iter().all(|backend| backend.healthy) {
            "ok"
        } else {
            "degraded"
        };
        Self {
            status: status.to_string(),
            backends,
            checked_at,
        }
    }
}
