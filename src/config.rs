//! Configuration loading and management

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

/// Default time Command+Escape must be held
pub const DEFAULT_HOLD_MS: u64 = 600;
/// Shortest accepted hold duration
pub const MIN_HOLD_MS: u64 = 100;
/// Longest accepted hold duration
pub const MAX_HOLD_MS: u64 = 10_000;

/// Progress recompute interval while holding (one frame at 60 Hz)
const TICK_INTERVAL: Duration = Duration::from_millis(16);
/// Time given to the exit effect before teardown
const EXIT_GRACE: Duration = Duration::from_millis(800);
/// Key-state poll interval for the local hook
const LOCAL_POLL_INTERVAL: Duration = Duration::from_millis(8);
/// How often permission is re-checked while degraded
const PERMISSION_POLL_INTERVAL: Duration = Duration::from_secs(2);
/// How long startup waits for an answer to the permission prompt
const PERMISSION_PROMPT_TIMEOUT: Duration = Duration::from_secs(60);

/// Overrides the data directory
const DATA_DIR_ENV: &str = "CLEAN_SCREEN_DATA_DIR";
const APP_DIR: &str = "clean-screen";
const PREFERENCES_FILE: &str = "preferences.json";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("HOME is not set and CLEAN_SCREEN_DATA_DIR was not given")]
    NoHome,

    #[error("hold duration {0}ms is outside {min}..={max}ms", min = MIN_HOLD_MS, max = MAX_HOLD_MS)]
    HoldOutOfRange(u64),
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory for persisted data
    pub data_dir: PathBuf,

    /// Path of the preferences file
    pub preferences_path: PathBuf,

    /// How long the exit combo must be held
    pub hold_duration: Duration,

    /// Progress tick interval while holding
    pub tick_interval: Duration,

    /// Grace period for the exit effect
    pub exit_grace: Duration,

    /// Poll interval of the local (permission-less) hook
    pub local_poll_interval: Duration,

    /// Permission re-check interval
    pub permission_poll_interval: Duration,

    /// Longest wait for the permission prompt before covering the displays
    pub permission_prompt_timeout: Duration,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self, ConfigError> {
        let data_dir = match std::env::var(DATA_DIR_ENV) {
            Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir.trim()),
            _ => default_data_dir()?,
        };
        Ok(Self::with_data_dir(data_dir))
    }

    /// Like [`load`](Self::load), but never fails
    ///
    /// Without a usable home directory the data lives under the system
    /// temp directory for this run.
    pub fn load_or_fallback() -> Self {
        Self::or_fallback(Self::load())
    }

    fn or_fallback(loaded: Result<Self, ConfigError>) -> Self {
        loaded.unwrap_or_else(|e| {
            let data_dir = std::env::temp_dir().join(APP_DIR);
            warn!(%e, ?data_dir, "using temporary data directory");
            Self::with_data_dir(data_dir)
        })
    }

    /// Defaults rooted at `data_dir`
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        let preferences_path = data_dir.join(PREFERENCES_FILE);
        Self {
            data_dir,
            preferences_path,
            hold_duration: Duration::from_millis(DEFAULT_HOLD_MS),
            tick_interval: TICK_INTERVAL,
            exit_grace: EXIT_GRACE,
            local_poll_interval: LOCAL_POLL_INTERVAL,
            permission_poll_interval: PERMISSION_POLL_INTERVAL,
            permission_prompt_timeout: PERMISSION_PROMPT_TIMEOUT,
        }
    }

    /// Set the hold duration, rejecting values outside the accepted range
    pub fn set_hold_ms(&mut self, hold_ms: u64) -> Result<(), ConfigError> {
        validate_hold_ms(hold_ms)?;
        self.hold_duration = Duration::from_millis(hold_ms);
        Ok(())
    }
}

pub fn validate_hold_ms(hold_ms: u64) -> Result<u64, ConfigError> {
    if (MIN_HOLD_MS..=MAX_HOLD_MS).contains(&hold_ms) {
        Ok(hold_ms)
    } else {
        Err(ConfigError::HoldOutOfRange(hold_ms))
    }
}

fn default_data_dir() -> Result<PathBuf, ConfigError> {
    let home = std::env::var("HOME").map_err(|_| ConfigError::NoHome)?;
    let base = PathBuf::from(home);

    #[cfg(target_os = "macos")]
    let base = base.join("Library").join("Application Support");
    #[cfg(not(target_os = "macos"))]
    let base = base.join(".local").join("share");

    Ok(base.join(APP_DIR))
}
