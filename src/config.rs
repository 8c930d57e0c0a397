//! Runtime configuration loaded from the environment
//!
//! Values are read once at startup. A `.env` file is honoured when present
//! (loaded by `main` through `dotenvy`). Missing or unparsable values fall
//! back to defaults with a log line instead of aborting the process.
//!
//! The log filter is resolved separately in `main` (`RUST_LOG`, then
//! `LOG_FILTER`) because the subscriber has to exist before this module logs.

use std::{env, fmt::Display, str::FromStr};

use tracing::{info, warn};

/// Service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP port the HTTP server binds to (`PORT`)
    pub port: u16,

    /// Path of the redb database file (`DATABASE_URL`)
    pub database_url: String,

    /// Shared secret the identity proxy must send in the `Authorization`
    /// header (`AUTHORIZATION`). `None` disables the check.
    pub auth_secret: Option<String>,

    /// Request header carrying the visitor location, usually set by a CDN
    /// (`LOCATION_HEADER`)
    pub location_header: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            database_url: "data.db".to_string(),
            auth_secret: None,
            location_header: "x-visitor-location".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Self {
        let defaults = Self::default();

        Self {
            port: try_load("PORT", defaults.port),
            database_url: try_load("DATABASE_URL", defaults.database_url),
            auth_secret: var("AUTHORIZATION").ok().filter(|secret| !secret.is_empty()),
            location_header: try_load::<String>("LOCATION_HEADER", defaults.location_header)
                .to_ascii_lowercase(),
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        info!("{key} not set, using default");
    })
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
            default
        }),
        Err(()) => default,
    }
}
