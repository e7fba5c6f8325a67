//! Session configuration from environment variables

use std::env;
use std::time::Duration;

use tracing::info;

use crate::engine::EngineOptions;
use crate::error::SessionError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Starting time per side in whole seconds
    pub clock_start_secs: u32,

    /// Clock tick period (one decrement per tick)
    pub tick_period: Duration,

    /// Path to a UCI evaluation engine; no engine is started when unset
    pub engine_path: Option<String>,

    /// Fixed search depth for every analysis request
    pub search_depth: u32,

    /// Engine `Threads` option
    pub engine_threads: u32,

    /// Engine `Hash` option in MB
    pub engine_hash_mb: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            clock_start_secs: 600,
            tick_period: Duration::from_secs(1),
            engine_path: None,
            search_depth: 15,
            engine_threads: 1,
            engine_hash_mb: 16,
        }
    }
}

impl SessionConfig {
    /// Load configuration from environment variables (and `.env` for local dev).
    pub fn from_env() -> Result<Self, SessionError> {
        let _ = dotenvy::dotenv();
        let config = Self::from_lookup(|key| env::var(key).ok())?;
        info!(
            clock_start_secs = config.clock_start_secs,
            search_depth = config.search_depth,
            engine = config.engine_path.as_deref().unwrap_or("none"),
            "Session config loaded"
        );
        Ok(config)
    }

    /// Build from any key lookup. Unparsable values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SessionError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let number = |key: &str, default: u32| {
            lookup(key)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(default)
        };

        let tick_millis = lookup("CLOCK_TICK_MILLIS")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(defaults.tick_period.as_millis() as u64);

        let config = Self {
            clock_start_secs: number("CLOCK_START_SECS", defaults.clock_start_secs),
            tick_period: Duration::from_millis(tick_millis),
            engine_path: lookup("ENGINE_PATH").filter(|p| !p.trim().is_empty()),
            search_depth: number("ENGINE_SEARCH_DEPTH", defaults.search_depth),
            engine_threads: number("ENGINE_THREADS", defaults.engine_threads),
            engine_hash_mb: number("ENGINE_HASH_MB", defaults.engine_hash_mb),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if self.tick_period.is_zero() {
            return Err(SessionError::Config("clock tick period must be positive".into()));
        }
        if self.search_depth == 0 {
            return Err(SessionError::Config("engine search depth must be positive".into()));
        }
        Ok(())
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            threads: self.engine_threads,
            hash_mb: self.engine_hash_mb,
        }
    }
}
