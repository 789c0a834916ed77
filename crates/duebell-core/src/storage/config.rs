//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Engine tick cadence
//! - Zone thresholds
//! - Notification title and on/off switch
//! - Sound on/off switch
//!
//! Configuration is stored at `<data_dir>/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::countdown::{ZoneThresholds, DEFAULT_NOTIFICATION_TITLE};
use crate::error::{ConfigError, Result};

/// Upper bound for any threshold, ten years in seconds.
const MAX_THRESHOLD_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// Engine loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Tick cadence in milliseconds, at most one second
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_notification_title")]
    pub title: String,
}

/// Sound configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoundConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Ring the terminal bell for alarm and chime
    #[serde(default = "default_true")]
    pub bell: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub thresholds: ZoneThresholds,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub sound: SoundConfig,
}

// Default functions
fn default_tick_interval_ms() -> u64 {
    1000
}
fn default_true() -> bool {
    true
}
fn default_notification_title() -> String {
    DEFAULT_NOTIFICATION_TITLE.into()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            title: default_notification_title(),
        }
    }
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bell: true,
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;
            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|e| invalid(e.to_string()))?,
                ),
                serde_json::Value::Number(_) => value
                    .parse::<i64>()
                    .map(|n| serde_json::Value::Number(n.into()))
                    .map_err(|_| invalid(format!("cannot parse '{value}' as integer")))?,
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    return Err(invalid("cannot set a whole section".into()));
                }
                _ => serde_json::Value::String(value.into()),
            };
            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    pub fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if the file is
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()),
        }
    }

    /// Persist to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default configuration");
            Self::default()
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key. Does not save.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value has the wrong type,
    /// or the result fails validation. `self` is unchanged on error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=1000).contains(&self.engine.tick_interval_ms) {
            return Err(ConfigError::InvalidValue {
                key: "engine.tick_interval_ms".into(),
                message: "must be between 1 and 1000".into(),
            });
        }
        let t = &self.thresholds;
        if t.critical_secs <= 0 || t.critical_secs >= t.imminent_secs {
            return Err(ConfigError::InvalidValue {
                key: "thresholds.critical_secs".into(),
                message: "must be positive and below thresholds.imminent_secs".into(),
            });
        }
        if t.imminent_secs >= t.deadline_warning_secs {
            return Err(ConfigError::InvalidValue {
                key: "thresholds.imminent_secs".into(),
                message: "must be below thresholds.deadline_warning_secs".into(),
            });
        }
        if t.deadline_warning_secs > MAX_THRESHOLD_SECS {
            return Err(ConfigError::InvalidValue {
                key: "thresholds.deadline_warning_secs".into(),
                message: format!("must be at most {MAX_THRESHOLD_SECS}"),
            });
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.engine.tick_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.engine.tick_interval_ms, 1000);
        assert_eq!(parsed.thresholds, ZoneThresholds::default());
        assert_eq!(parsed.notifications.title, "5 minutes left");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[sound]\nbell = false\n").unwrap();
        assert!(!parsed.sound.bell);
        assert!(parsed.sound.enabled);
        assert_eq!(parsed.thresholds.imminent_secs, 300);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("sound.bell").as_deref(), Some("true"));
        assert_eq!(cfg.get("thresholds.critical_secs").as_deref(), Some("60"));
        assert_eq!(cfg.get("notifications.title").as_deref(), Some("5 minutes left"));
        assert!(cfg.get("sound.missing_key").is_none());
    }

    #[test]
    fn set_updates_typed_values() {
        let mut cfg = Config::default();
        cfg.set("sound.enabled", "false").unwrap();
        cfg.set("engine.tick_interval_ms", "500").unwrap();
        cfg.set("notifications.title", "Heads up").unwrap();
        assert!(!cfg.sound.enabled);
        assert_eq!(cfg.engine.tick_interval_ms, 500);
        assert_eq!(cfg.notifications.title, "Heads up");
    }

    #[test]
    fn set_rejects_unknown_key_and_bad_type() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("sound.volume", "3"),
            Err(CoreError::Config(ConfigError::UnknownKey(_)))
        ));
        assert!(cfg.set("sound.bell", "loud").is_err());
        assert!(cfg.set("sound", "true").is_err());
    }

    #[test]
    fn set_rejects_oversized_warning_threshold() {
        let mut cfg = Config::default();
        let err = cfg
            .set("thresholds.deadline_warning_secs", "100000000000000000")
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Config(ConfigError::InvalidValue { ref key, .. })
                if key == "thresholds.deadline_warning_secs"
        ));
        assert_eq!(cfg.thresholds.deadline_warning_secs, 86_400);

        cfg.set("thresholds.deadline_warning_secs", "315360000").unwrap();
        assert_eq!(cfg.thresholds.deadline_warning_secs, MAX_THRESHOLD_SECS);
    }

    #[test]
    fn set_rejects_invalid_result_and_keeps_old_value() {
        let mut cfg = Config::default();
        assert!(cfg.set("engine.tick_interval_ms", "5000").is_err());
        assert!(cfg.set("thresholds.critical_secs", "600").is_err());
        assert_eq!(cfg.engine.tick_interval_ms, 1000);
        assert_eq!(cfg.thresholds.critical_secs, 60);
    }

    #[test]
    fn load_from_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.engine.tick_interval_ms, 1000);
        assert!(path.exists());
    }

    #[test]
    fn load_from_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "engine = 3").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
