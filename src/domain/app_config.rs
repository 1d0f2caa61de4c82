//! Typed application settings read through [`ConfigPort`].
//!
//! Every key has a default; validation runs once while loading so later code
//! can rely on the values.

use crate::domain::error::StockStudyError;
use crate::domain::retry::RetryPolicy;
use crate::ports::config_port::ConfigPort;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const API_KEY_ENV: &str = "QUANTS_API_V2_API_KEY";
pub const DEFAULT_BASE_URL: &str = "https://api.jquants.com/v2";
pub const DEFAULT_LISTEN: &str = "127.0.0.1:8000";
pub const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173,http://127.0.0.1:5173";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub cache_dir: PathBuf,
    pub retry: RetryPolicy,
    pub listen: SocketAddr,
    pub cors_origins: Vec<String>,
    pub cors_allow_credentials: bool,
    pub datalake_root: PathBuf,
}

impl AppConfig {
    /// Load from the INI port, letting `env_api_key` override `[jquants] api_key`.
    pub fn load(
        config: &dyn ConfigPort,
        env_api_key: Option<String>,
    ) -> Result<Self, StockStudyError> {
        let api_key = env_api_key
            .filter(|k| !k.trim().is_empty())
            .or_else(|| config.get_string("jquants", "api_key"))
            .map(|k| k.trim().to_string())
            .unwrap_or_default();

        let base_url = string_or(config, "jquants", "base_url", DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();
        let timeout_secs = config.get_int("jquants", "timeout_secs", 30);
        if timeout_secs <= 0 {
            return Err(invalid("jquants", "timeout_secs", "timeout_secs must be positive"));
        }

        let retry = load_retry(config)?;

        let listen_raw = string_or(config, "web", "listen", DEFAULT_LISTEN);
        let listen = listen_raw.parse::<SocketAddr>().map_err(|e| {
            invalid("web", "listen", &format!("'{}' is not a socket address: {}", listen_raw, e))
        })?;
        let cors_origins = config
            .get_list("web", "cors_origins")
            .filter(|origins| !origins.is_empty())
            .unwrap_or_else(|| {
                DEFAULT_CORS_ORIGINS.split(',').map(String::from).collect()
            });

        Ok(AppConfig {
            api_key,
            base_url,
            timeout: Duration::from_secs(timeout_secs as u64),
            cache_dir: PathBuf::from(string_or(config, "cache", "dir", "data")),
            retry,
            listen,
            cors_origins,
            cors_allow_credentials: config.get_bool("web", "allow_credentials", true),
            datalake_root: PathBuf::from(string_or(config, "datalake", "root", "datalake")),
        })
    }

    pub fn api_key_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

fn load_retry(config: &dyn ConfigPort) -> Result<RetryPolicy, StockStudyError> {
    let max_attempts = config.get_int("retry", "max_attempts", 3);
    if max_attempts <= 0 {
        return Err(invalid("retry", "max_attempts", "max_attempts must be positive"));
    }

    let mut waits = [0.0; 3];
    for (slot, (key, default)) in waits.iter_mut().zip([
        ("multiplier_secs", 2.0),
        ("min_wait_secs", 2.0),
        ("max_wait_secs", 30.0),
    ]) {
        let value = config.get_double("retry", key, default);
        if !value.is_finite() || value < 0.0 {
            return Err(invalid("retry", key, &format!("{} must be non-negative", key)));
        }
        *slot = value;
    }
    let [multiplier, min_wait, max_wait] = waits;
    if min_wait > max_wait {
        return Err(invalid(
            "retry",
            "min_wait_secs",
            "min_wait_secs must not exceed max_wait_secs",
        ));
    }

    Ok(RetryPolicy {
        max_attempts: max_attempts.min(u32::MAX as i64) as u32,
        multiplier: Duration::from_secs_f64(multiplier),
        min_wait: Duration::from_secs_f64(min_wait),
        max_wait: Duration::from_secs_f64(max_wait),
        ..RetryPolicy::default()
    })
}

fn string_or(config: &dyn ConfigPort, section: &str, key: &str, default: &str) -> String {
    config
        .get_string(section, key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn invalid(section: &str, key: &str, reason: &str) -> StockStudyError {
    StockStudyError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
