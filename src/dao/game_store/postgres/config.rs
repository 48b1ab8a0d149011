use std::{net::IpAddr, str::FromStr, time::Duration};

use sqlx::postgres::{PgConnectOptions, PgSslMode};

use super::error::{PostgresDaoError, PostgresResult};

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Runtime configuration describing how to reach a PostgreSQL endpoint.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Connection URL.
    pub url: String,
    /// Pool size.
    pub max_connections: u32,
    /// How long to wait for a pooled connection.
    pub acquire_timeout: Duration,
}

impl PostgresConfig {
    /// Construct a configuration from a `postgres://` connection URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
        }
    }

    /// Parse the URL and apply the TLS policy: remote hosts always require
    /// TLS, loopback hosts keep whatever the URL asks for.
    pub fn connect_options(&self) -> PostgresResult<PgConnectOptions> {
        let options = PgConnectOptions::from_str(&self.url)
            .map_err(|source| PostgresDaoError::InvalidUrl { source })?;
        let requested = requested_ssl_mode(&self.url)
            .map(PgSslMode::from_str)
            .transpose()
            .map_err(|source| PostgresDaoError::InvalidUrl { source })?;
        let mode = effective_ssl_mode(options.get_host(), requested);
        Ok(options.ssl_mode(mode))
    }
}

/// Loopback addresses are the local development exception to the TLS rule.
/// Unix socket directories count as local too.
pub(crate) fn is_loopback_host(host: &str) -> bool {
    if host.eq_ignore_ascii_case("localhost") || host.starts_with('/') {
        return true;
    }
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<IpAddr>()
        .map(|addr| addr.is_loopback())
        .unwrap_or(false)
}

pub(crate) fn effective_ssl_mode(host: &str, requested: Option<PgSslMode>) -> PgSslMode {
    if is_loopback_host(host) {
        return requested.unwrap_or(PgSslMode::Prefer);
    }
    match requested {
        Some(mode @ (PgSslMode::VerifyCa | PgSslMode::VerifyFull)) => mode,
        _ => PgSslMode::Require,
    }
}

/// Extract the `sslmode` query parameter from a connection URL, if present.
fn requested_ssl_mode(url: &str) -> Option<&str> {
    let (_, query) = url.split_once('?')?;
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        matches!(key, "sslmode" | "ssl-mode").then_some(value)
    })
}
