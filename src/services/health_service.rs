use std::time::SystemTime;

use tracing::warn;

use crate::{
    dto::{
        format_system_time,
        health::{BackendHealth, HealthResponse},
    },
    state::SharedState,
};

/// Ping every backend built so far and summarise the result.
///
/// Backends that have not served a request yet are not connected and are
/// therefore not reported.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let mut backends = Vec::new();
    for store in state.store().registry().instantiated() {
        let healthy = match store.health_check().await {
            Ok(()) => true,
            Err(err) => {
                warn!(backend = %store.kind(), error = %err, "storage health check failed");
                false
            }
        };
        backends.push(BackendHealth {
            kind: store.kind(),
            healthy,
        });
    }

    HealthResponse::from_backends(backends, format_system_time(SystemTime::now()))
}
