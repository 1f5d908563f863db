//! Relay configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Storage and bus backends are selected
//! by the presence of `DATABASE_URL` and `REDIS_URL` — when either is
//! absent, the in-process fallback is used instead.

use std::net::SocketAddr;

/// Top-level relay configuration.
///
/// Loaded once at startup via [`RelayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:8080`).
    pub listen_addr: SocketAddr,

    /// PostgreSQL connection string. `None` selects the in-memory store.
    pub database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    pub database_max_connections: u32,

    /// Minimum idle connections in the pool.
    pub database_min_connections: u32,

    /// Timeout in seconds for acquiring a database connection.
    pub database_connect_timeout_secs: u64,

    /// Redis connection string for the cross-instance broadcast bus.
    /// `None` selects the in-process bus (single-instance deployments).
    pub redis_url: Option<String>,

    /// Capacity of each bus subscription channel.
    pub bus_capacity: usize,

    /// Maximum conversations returned by the conversation listing.
    pub conversation_list_limit: i64,

    /// Default page size for message history.
    pub message_page_limit: i64,

    /// Timeout in seconds applied to REST requests (not WebSocket).
    pub request_timeout_secs: u64,
}

impl RelayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to sensible defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`].
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()?;

        let database_url = non_empty_env("DATABASE_URL");
        let database_max_connections = parse_env("DATABASE_MAX_CONNECTIONS", 10);
        let database_min_connections = parse_env("DATABASE_MIN_CONNECTIONS", 2);
        let database_connect_timeout_secs = parse_env("DATABASE_CONNECT_TIMEOUT_SECS", 5);

        let redis_url = non_empty_env("REDIS_URL");
        let bus_capacity = parse_env("BUS_CAPACITY", 256);

        let conversation_list_limit = parse_env("CONVERSATION_LIST_LIMIT", 50);
        let message_page_limit = parse_env("MESSAGE_PAGE_LIMIT", 100);
        let request_timeout_secs = parse_env("REQUEST_TIMEOUT_SECS", 30);

        Ok(Self {
            listen_addr,
            database_url,
            database_max_connections,
            database_min_connections,
            database_connect_timeout_secs,
            redis_url,
            bus_capacity,
            conversation_list_limit,
            message_page_limit,
            request_timeout_secs,
        })
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Reads an environment variable, treating empty values as absent.
fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
