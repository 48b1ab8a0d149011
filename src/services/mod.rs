/// OpenAPI documentation generation.
pub mod documentation;
/// Session creation, loading, and saving.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Façade over the storage backends.
pub mod store_api;
/// Poll answering for client synchronizers.
pub mod sync_service;
/// Per-player projection of stored payloads.
pub mod viewer;
