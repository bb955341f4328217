use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::policy::DEFAULT_MAX_DEPTH;
use crate::{Error, Result, Severity};

/// Overrides `default_level` when set to a canonical level name. Anything else
/// is ignored with a warning.
pub const DEFAULT_LEVEL_ENV: &str = "SNAG_DEFAULT_LEVEL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnagConfig {
    /// Stamped onto every stored record.
    pub application_name: String,
    /// Install the default-level hook at startup.
    pub apply_default_level: bool,
    pub default_level: Severity,
    pub max_cause_depth: usize,
}

impl Default for SnagConfig {
    fn default() -> Self {
        Self {
            application_name: String::from("snag"),
            apply_default_level: false,
            default_level: Severity::Critical,
            max_cause_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl SnagConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: SnagConfig = toml::from_str(raw)?;
        Ok(config)
    }

    /// Read a TOML file, then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_env_level(path, std::env::var(DEFAULT_LEVEL_ENV).ok().as_deref())
    }

    /// [`SnagConfig::load`] with the `SNAG_DEFAULT_LEVEL` value passed in
    /// instead of read from the process environment.
    pub fn load_with_env_level(path: impl AsRef<Path>, env_level: Option<&str>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| Error::Io {
            operation: "read config",
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&raw).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.apply_env_overrides_from(env_level);
        Ok(config)
    }

    /// Apply a `SNAG_DEFAULT_LEVEL`-style override. Returns whether
    /// `default_level` changed; an unknown level name keeps the current value.
    pub fn apply_env_overrides_from(&mut self, default_level: Option<&str>) -> bool {
        let Some(raw) = default_level.map(str::trim).filter(|s| !s.is_empty()) else {
            return false;
        };
        match raw.parse::<Severity>() {
            Ok(level) => {
                self.default_level = level;
                tracing::debug!(%level, "default level overridden from environment");
                true
            }
            Err(e) => {
                tracing::warn!(
                    var = DEFAULT_LEVEL_ENV,
                    error = %e,
                    kept = %self.default_level,
                    "ignoring invalid default level override"
                );
                false
            }
        }
    }
}
