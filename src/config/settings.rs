//! Runtime settings loaded from environment variables.
//!
//! `.env` is loaded by the binary before [`Settings::from_env`] runs, so every
//! value can come from either the process environment or that file.

use super::database;
use crate::errors::{Error, Result};
use std::time::Duration;

/// Settings for the HTTP server and its collaborators.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Interface to bind (`SERVER_HOST`, default `127.0.0.1`)
    pub server_host: String,
    /// Port to bind (`SERVER_PORT`, default `8080`)
    pub server_port: u16,
    /// Database URL (`DATABASE_URL`)
    pub database_url: String,
    /// Endpoint that receives new-order notifications (`ORDER_NOTIFY_URL`)
    pub notify_url: Option<String>,
    /// Timeout for a single notification request (`ORDER_NOTIFY_TIMEOUT_SECS`, default 10)
    pub notify_timeout: Duration,
    /// Path of the subscription package seed file (`PACKAGES_CONFIG`)
    pub packages_path: String,
    /// Package assigned to newly synced users (`DEFAULT_PACKAGE`, default `free`)
    pub default_package: Option<String>,
}

impl Settings {
    /// Reads settings from the environment, applying defaults.
    ///
    /// # Errors
    /// Returns `Error::Config` when a numeric variable cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        let server_host = var("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let server_port = var("SERVER_PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse::<u16>()
            .map_err(|e| Error::Config {
                message: format!("Invalid SERVER_PORT: {e}"),
            })?;
        let notify_timeout = var("ORDER_NOTIFY_TIMEOUT_SECS")
            .unwrap_or_else(|| "10".to_string())
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| Error::Config {
                message: format!("Invalid ORDER_NOTIFY_TIMEOUT_SECS: {e}"),
            })?;

        let default_package = match var("DEFAULT_PACKAGE") {
            Some(name) if name.eq_ignore_ascii_case("none") => None,
            Some(name) => Some(name),
            None => Some("free".to_string()),
        };

        Ok(Self {
            server_host,
            server_port,
            database_url: database::get_database_url(),
            notify_url: var("ORDER_NOTIFY_URL"),
            notify_timeout,
            packages_path: var("PACKAGES_CONFIG").unwrap_or_else(|| "packages.toml".to_string()),
            default_package,
        })
    }

    /// `host:port` string for binding the listener.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
