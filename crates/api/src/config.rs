//! Application configuration loaded from environment variables.
//!
//! Both binaries call `dotenvy::dotenv()` first, so a `.env` file in the
//! working directory is honoured.

use std::time::Duration;

/// Order service configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: PostgreSQL URL; in-memory order store when unset
/// - `INVENTORY_URL`: inventory service base URL; in-process ledger when unset
/// - `INVENTORY_TIMEOUT_MS`: per-call timeout for the inventory service (default: `2000`)
/// - `SEED_DATA`: seed demo stock into an empty in-process ledger (default: `false`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub inventory_url: Option<String>,
    pub inventory_timeout: Duration,
    pub seed_data: bool,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parsed(&lookup, "PORT").unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: non_empty(&lookup, "DATABASE_URL"),
            inventory_url: non_empty(&lookup, "INVENTORY_URL"),
            inventory_timeout: parsed(&lookup, "INVENTORY_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.inventory_timeout),
            seed_data: flag(&lookup, "SEED_DATA"),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            inventory_url: None,
            inventory_timeout: Duration::from_millis(2000),
            seed_data: false,
        }
    }
}

/// Inventory service configuration.
///
/// Reads `HOST`, `INVENTORY_PORT` (default: `3001`), `RUST_LOG`,
/// `DATABASE_URL` and `SEED_DATA`.
#[derive(Debug, Clone)]
pub struct InventoryConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub seed_data: bool,
}

impl InventoryConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parsed(&lookup, "INVENTORY_PORT").unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: non_empty(&lookup, "DATABASE_URL"),
            seed_data: flag(&lookup, "SEED_DATA"),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            log_level: "info".to_string(),
            database_url: None,
            seed_data: false,
        }
    }
}

fn parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|v| !v.trim().is_empty())
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> bool {
    lookup(key).is_some_and(|v| {
        matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes"
        )
    })
}
