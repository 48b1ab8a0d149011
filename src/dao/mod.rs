/// Game state storage backends.
pub mod game_store;
/// Session identifiers.
pub mod models;
/// Lazy per-backend store construction and routing.
pub mod registry;
/// Storage abstraction layer for database operations.
pub mod storage;
