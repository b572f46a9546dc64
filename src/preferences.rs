//! Persisted user preferences
//!
//! The only persisted state is whether the user opted out of the permission
//! onboarding prompt. Stored as JSON in the data directory.

use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Everything the app remembers between runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Do not ask for Accessibility permission at startup
    #[serde(default)]
    pub suppress_permission_onboarding: bool,
}

/// Errors reading or writing the preferences file
#[derive(Debug, thiserror::Error)]
pub enum PreferenceError {
    #[error("failed to access preferences at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("preferences at {path} are not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// File-backed preference storage
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load preferences; a missing file yields the defaults
    pub fn load(&self) -> Result<Preferences, PreferenceError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = ?self.path, "no preferences file, using defaults");
                return Ok(Preferences::default());
            }
            Err(source) => {
                return Err(PreferenceError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_str(&contents).map_err(|source| PreferenceError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Write preferences, replacing the file atomically
    pub fn save(&self, preferences: &Preferences) -> Result<(), PreferenceError> {
        let io_err = |source| PreferenceError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(preferences).map_err(|source| {
            PreferenceError::Parse {
                path: self.path.clone(),
                source,
            }
        })?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;

        debug!(path = ?self.path, ?preferences, "preferences saved");
        Ok(())
    }

    /// Current opt-out flag; unreadable preferences count as "not suppressed"
    pub fn suppress_onboarding(&self) -> bool {
        match self.load() {
            Ok(preferences) => preferences.suppress_permission_onboarding,
            Err(e) => {
                warn!(%e, "ignoring unreadable preferences");
                false
            }
        }
    }

    pub fn set_suppress_onboarding(&self, suppress: bool) -> Result<(), PreferenceError> {
        let mut preferences = self.load().unwrap_or_default();
        preferences.suppress_permission_onboarding = suppress;
        self.save(&preferences)
    }
}
