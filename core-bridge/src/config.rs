//! # Bridge Configuration
//!
//! Settings shared by the bridges: the default wait budget of the
//! callback-style bridge and the shape of the process-wide worker pool used
//! for uninterruptible execution.
//!
//! ## Usage
//!
//! ```rust
//! use core_bridge::config::BridgeConfig;
//! use std::time::Duration;
//!
//! let config = BridgeConfig::default()
//!     .with_callback_timeout(Duration::from_secs(2))
//!     .with_pool_max_threads(16);
//! config.validate().expect("valid config");
//! ```
//!
//! ## Environment overrides
//!
//! [`BridgeConfig::from_env`] starts from the defaults and applies:
//!
//! - `BRIDGE_CALLBACK_TIMEOUT_MS`
//! - `BRIDGE_POOL_MAX_THREADS`
//! - `BRIDGE_POOL_KEEP_ALIVE_MS`
//! - `BRIDGE_POOL_THREAD_NAME`

use crate::error::ConfigError;
use std::time::Duration;

/// Default wait budget of the callback-style bridge.
pub const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_millis(500);

pub const DEFAULT_POOL_THREAD_NAME: &str = "bridge-uninterruptible";

pub const DEFAULT_POOL_MAX_THREADS: usize = 512;

/// How long an idle pool thread lingers before exiting.
pub const DEFAULT_POOL_KEEP_ALIVE: Duration = Duration::from_secs(60);

pub const ENV_CALLBACK_TIMEOUT_MS: &str = "BRIDGE_CALLBACK_TIMEOUT_MS";
pub const ENV_POOL_MAX_THREADS: &str = "BRIDGE_POOL_MAX_THREADS";
pub const ENV_POOL_KEEP_ALIVE_MS: &str = "BRIDGE_POOL_KEEP_ALIVE_MS";
pub const ENV_POOL_THREAD_NAME: &str = "BRIDGE_POOL_THREAD_NAME";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Wait budget for callback-style bridges that are not given one
    pub callback_timeout: Duration,
    /// Prefix of worker thread names; a sequence number is appended
    pub pool_thread_name: String,
    /// Upper bound on concurrently running pool threads
    pub pool_max_threads: usize,
    /// Idle time after which a pool thread exits
    pub pool_keep_alive: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            callback_timeout: DEFAULT_CALLBACK_TIMEOUT,
            pool_thread_name: DEFAULT_POOL_THREAD_NAME.to_string(),
            pool_max_threads: DEFAULT_POOL_MAX_THREADS,
            pool_keep_alive: DEFAULT_POOL_KEEP_ALIVE,
        }
    }
}

impl BridgeConfig {
    pub fn with_callback_timeout(mut self, timeout: Duration) -> Self {
        self.callback_timeout = timeout;
        self
    }

    pub fn with_pool_thread_name(mut self, name: impl Into<String>) -> Self {
        self.pool_thread_name = name.into();
        self
    }

    pub fn with_pool_max_threads(mut self, max: usize) -> Self {
        self.pool_max_threads = max;
        self
    }

    pub fn with_pool_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.pool_keep_alive = keep_alive;
        self
    }

    /// Defaults overlaid with the `BRIDGE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`, keyed like the
    /// environment variables.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(ms) = lookup(ENV_CALLBACK_TIMEOUT_MS) {
            config.callback_timeout = Duration::from_millis(parse(ENV_CALLBACK_TIMEOUT_MS, &ms)?);
        }
        if let Some(max) = lookup(ENV_POOL_MAX_THREADS) {
            config.pool_max_threads = parse(ENV_POOL_MAX_THREADS, &max)?;
        }
        if let Some(ms) = lookup(ENV_POOL_KEEP_ALIVE_MS) {
            config.pool_keep_alive = Duration::from_millis(parse(ENV_POOL_KEEP_ALIVE_MS, &ms)?);
        }
        if let Some(name) = lookup(ENV_POOL_THREAD_NAME) {
            config.pool_thread_name = name;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool_max_threads == 0 {
            return Err(ConfigError::InvalidValue {
                key: "pool_max_threads".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.pool_thread_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "pool_thread_name".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

fn parse<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("{raw:?}: {e}"),
    })
}
