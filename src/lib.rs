//! Library crate for turnsync-back, exposing modules for binaries and integration tests.

/// Configuration loading.
pub mod config;
/// Storage backends and session routing.
pub mod dao;
/// Request and response bodies.
pub mod dto;
/// Service and HTTP error types.
pub mod error;
/// HTTP routes.
pub mod routes;
/// Business logic behind the routes.
pub mod services;
/// Shared application state.
pub mod state;
/// Client-side turn synchronizer.
pub mod sync;
