//! Application-level configuration loading, including the storage endpoints.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::{dao::game_store::BackendKind, services::store_api::UpsertMode};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "TURNSYNC_CONFIG_PATH";
const POSTGRES_URL_ENV: &str = "TURNSYNC_POSTGRES_URL";
const LEGACY_POSTGRES_URL_ENV: &str = "TURNSYNC_LEGACY_POSTGRES_URL";
const SQLITE_PATH_ENV: &str = "TURNSYNC_SQLITE_PATH";
const UPSERT_MODE_ENV: &str = "TURNSYNC_UPSERT_MODE";
const ADMIN_TOKEN_ENV: &str = "TURNSYNC_ADMIN_TOKEN";
const DEFAULT_PORT: u16 = 8080;

/// Errors that stop the process from starting.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// None of the storage endpoints is set.
    #[error(
        "no storage backend configured; set at least one of {POSTGRES_URL_ENV}, {LEGACY_POSTGRES_URL_ENV} or {SQLITE_PATH_ENV}"
    )]
    NoBackendConfigured,
    /// The upsert mode is not one of the known names.
    #[error("invalid upsert mode `{value}`")]
    InvalidUpsertMode {
        /// Rejected input.
        value: String,
    },
}

/// Where each backend kind lives. Absent entries mean the kind is not available.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreEndpointConfig {
    /// Connection URL of the current Postgres backend.
    pub postgres_url: Option<String>,
    /// Connection URL of the legacy Postgres backend.
    pub legacy_postgres_url: Option<String>,
    /// Database file of the embedded SQLite backend.
    pub sqlite_path: Option<PathBuf>,
}

/// Connection target for one backend kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEndpoint {
    /// Postgres connection URL.
    Postgres(String),
    /// SQLite database file.
    Sqlite(PathBuf),
}

impl StoreEndpointConfig {
    /// Endpoint configured for `kind`, if any.
    pub fn endpoint(&self, kind: BackendKind) -> Option<StoreEndpoint> {
        match kind {
            BackendKind::Postgres => self.postgres_url.clone().map(StoreEndpoint::Postgres),
            BackendKind::LegacyPostgres => self
                .legacy_postgres_url
                .clone()
                .map(StoreEndpoint::Postgres),
            BackendKind::Sqlite => self.sqlite_path.clone().map(StoreEndpoint::Sqlite),
        }
    }

    /// Whether an endpoint is set for `kind`.
    pub fn is_configured(&self, kind: BackendKind) -> bool {
        match kind {
            BackendKind::Postgres => self.postgres_url.is_some(),
            BackendKind::LegacyPostgres => self.legacy_postgres_url.is_some(),
            BackendKind::Sqlite => self.sqlite_path.is_some(),
        }
    }

    /// Whether no endpoint at all is set.
    pub fn is_empty(&self) -> bool {
        self.postgres_url.is_none()
            && self.legacy_postgres_url.is_none()
            && self.sqlite_path.is_none()
    }
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Storage endpoints per backend kind.
    pub endpoints: StoreEndpointConfig,
    /// Strategy used by saves.
    pub upsert_mode: UpsertMode,
    /// Token required by the `/games` routes. Unset locks them.
    pub admin_token: Option<String>,
    /// HTTP listen port.
    pub port: u16,
}

impl AppConfig {
    /// Load the configuration file (if any) and apply environment overrides.
    ///
    /// Fails when no storage endpoint ends up configured.
    pub fn load() -> Result<Self, ConfigError> {
        let path = resolve_config_path();
        let raw = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    info!(path = %path.display(), "loaded configuration file");
                    raw
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; using environment only"
                    );
                    RawConfig::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using environment only"
                );
                RawConfig::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; using environment only"
                );
                RawConfig::default()
            }
        };

        Self::from_sources(raw, |key| env::var(key).ok())
    }

    /// Merge file values with environment lookups; the environment wins.
    fn from_sources(
        raw: RawConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let lookup = |key: &str| lookup(key).and_then(non_blank);

        let endpoints = StoreEndpointConfig {
            postgres_url: lookup(POSTGRES_URL_ENV).or(raw.postgres_url.and_then(non_blank)),
            legacy_postgres_url: lookup(LEGACY_POSTGRES_URL_ENV)
                .or(raw.legacy_postgres_url.and_then(non_blank)),
            sqlite_path: lookup(SQLITE_PATH_ENV)
                .or(raw.sqlite_path.and_then(non_blank))
                .map(PathBuf::from),
        };

        if endpoints.is_empty() {
            return Err(ConfigError::NoBackendConfigured);
        }

        let upsert_mode = match lookup(UPSERT_MODE_ENV) {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidUpsertMode { value })?,
            None => raw.upsert_mode.unwrap_or_default(),
        };

        let admin_token = lookup(ADMIN_TOKEN_ENV).or(raw.admin_token.and_then(non_blank));

        let port = lookup("PORT")
            .or_else(|| lookup("SERVER_PORT"))
            .and_then(|value| value.parse::<u16>().ok())
            .or(raw.port)
            .unwrap_or(DEFAULT_PORT);

        Ok(Self {
            endpoints,
            upsert_mode,
            admin_token,
            port,
        })
    }
}

/// Blank strings count as unset, wherever they come from.
fn non_blank(value: String) -> Option<String> {
    (!value.trim().is_empty()).then_some(value)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    postgres_url: Option<String>,
    legacy_postgres_url: Option<String>,
    sqlite_path: Option<String>,
    upsert_mode: Option<UpsertMode>,
    admin_token: Option<String>,
    port: Option<u16>,
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_refuses_to_start_without_endpoints() {
        let err = AppConfig::from_sources(RawConfig::default(), env_of(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::NoBackendConfigured));
    }

    #[test]
    fn test_blank_values_count_as_absent() {
        let err = AppConfig::from_sources(
            RawConfig::default(),
            env_of(&[(POSTGRES_URL_ENV, "  "), (SQLITE_PATH_ENV, "")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::NoBackendConfigured));
    }

    #[test]
    fn test_blank_file_values_count_as_absent() {
        let raw: RawConfig = serde_json::from_str(
            r#"{ "postgresUrl": "", "legacyPostgresUrl": "  ", "sqlitePath": "data/games.db", "adminToken": "" }"#,
        )
        .unwrap();
        let config = AppConfig::from_sources(raw, env_of(&[])).unwrap();

        assert_eq!(config.endpoints.postgres_url, None);
        assert_eq!(config.endpoints.legacy_postgres_url, None);
        assert_eq!(config.admin_token, None);
        assert_eq!(config.endpoints.endpoint(BackendKind::Postgres), None);
        assert!(config.endpoints.is_configured(BackendKind::Sqlite));

        let blank_only: RawConfig =
            serde_json::from_str(r#"{ "postgresUrl": "", "sqlitePath": " " }"#).unwrap();
        let err = AppConfig::from_sources(blank_only, env_of(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::NoBackendConfigured));
    }

    #[test]
    fn test_admin_token_from_file_or_environment() {
        let raw: RawConfig =
            serde_json::from_str(r#"{ "sqlitePath": "games.db", "adminToken": "from-file" }"#)
                .unwrap();
        let config = AppConfig::from_sources(raw, env_of(&[])).unwrap();
        assert_eq!(config.admin_token.as_deref(), Some("from-file"));

        let config = AppConfig::from_sources(
            RawConfig::default(),
            env_of(&[(SQLITE_PATH_ENV, "games.db"), (ADMIN_TOKEN_ENV, "from-env")]),
        )
        .unwrap();
        assert_eq!(config.admin_token.as_deref(), Some("from-env"));
    }

    #[test]
    fn test_environment_overrides_file() {
        let raw: RawConfig = serde_json::from_str(
            r#"{ "postgresUrl": "postgres://file/db", "sqlitePath": "data/games.db", "upsertMode": "check-then-write", "port": 9000 }"#,
        )
        .unwrap();
        let config = AppConfig::from_sources(
            raw,
            env_of(&[(POSTGRES_URL_ENV, "postgres://env/db"), ("PORT", "7000")]),
        )
        .unwrap();

        assert_eq!(
            config.endpoints.postgres_url.as_deref(),
            Some("postgres://env/db")
        );
        assert_eq!(
            config.endpoints.sqlite_path,
            Some(PathBuf::from("data/games.db"))
        );
        assert_eq!(config.endpoints.legacy_postgres_url, None);
        assert_eq!(config.upsert_mode, UpsertMode::CheckThenWrite);
        assert_eq!(config.port, 7000);
    }

    #[test]
    fn test_defaults_with_single_endpoint() {
        let config = AppConfig::from_sources(
            RawConfig::default(),
            env_of(&[(SQLITE_PATH_ENV, "/tmp/games.db")]),
        )
        .unwrap();
        assert_eq!(config.upsert_mode, UpsertMode::Atomic);
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(config.endpoints.is_configured(BackendKind::Sqlite));
        assert!(!config.endpoints.is_configured(BackendKind::Postgres));
        assert_eq!(
            config.endpoints.endpoint(BackendKind::Sqlite),
            Some(StoreEndpoint::Sqlite(PathBuf::from("/tmp/games.db")))
        );
    }

    #[test]
    fn test_rejects_unknown_upsert_mode() {
        let err = AppConfig::from_sources(
            RawConfig::default(),
            env_of(&[(SQLITE_PATH_ENV, "games.db"), (UPSERT_MODE_ENV, "yolo")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUpsertMode { ref value } if value == "yolo"));
    }
}
