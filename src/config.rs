//! Configuration loader for the `sensebox-registry` service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). By consolidating configuration logic here, we
//! avoid scattering `env::var` calls throughout the codebase.
//!
use std::{env, net::SocketAddr, path::PathBuf};

use anyhow::{anyhow, Result};

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u64 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<u64>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Read an optional string environment variable with a default value.
macro_rules! env_or {
    ($var_name:expr, $default:expr) => {
        env::var($var_name).unwrap_or_else(|_| $default.to_string())
    };
}

pub const DEFAULT_API_URL: &str = "https://api.opensensemap.org";

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// openSenseMap API base URL.
    pub api_url: String,

    /// Directory holding cached box payloads.
    pub cache_dir: PathBuf,

    /// Upper bound on a single upstream request, in seconds.
    pub fetch_timeout_secs: u64,

    /// Snapshots kept per box; `0` disables the cap.
    pub history_limit: usize,

    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,
}

/// Load configuration from environment variables with defaults.
///
/// Optional:
/// - `SENSE_API_URL` – openSenseMap base URL (default: `https://api.opensensemap.org`)
/// - `CACHE_DIR` – cache artifact directory (default: `cache`)
/// - `FETCH_TIMEOUT_SECS` – upstream request timeout (default: 10)
/// - `HISTORY_LIMIT` – snapshots kept per box, 0 = unbounded (default: 100)
/// - `BIND_ADDR` – listen address (default: `0.0.0.0:8080`)
///
/// Returns an error if any variable is present but invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let api_url = env_or!("SENSE_API_URL", DEFAULT_API_URL);
    let cache_dir = PathBuf::from(env_or!("CACHE_DIR", "cache"));
    let fetch_timeout_secs = parse_env_u64!("FETCH_TIMEOUT_SECS", 10);
    let history_limit = parse_env_u64!("HISTORY_LIMIT", 100) as usize;
    let bind_addr = env_or!("BIND_ADDR", "0.0.0.0:8080")
        .parse::<SocketAddr>()
        .map_err(|e| anyhow!("Invalid BIND_ADDR: {}", e))?;

    if fetch_timeout_secs == 0 {
        return Err(anyhow!("FETCH_TIMEOUT_SECS must be greater than zero"));
    }

    Ok(Config {
        api_url,
        cache_dir,
        fetch_timeout_secs,
        history_limit,
        bind_addr,
    })
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  SENSE_API_URL      : {}", self.api_url);
        tracing::info!("  CACHE_DIR          : {}", self.cache_dir.display());
        tracing::info!("  FETCH_TIMEOUT_SECS : {}", self.fetch_timeout_secs);
        tracing::info!("  HISTORY_LIMIT      : {}", self.history_limit);
        tracing::info!("  BIND_ADDR          : {}", self.bind_addr);
    }
}
