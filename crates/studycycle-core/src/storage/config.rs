//! TOML-based application configuration.
//!
//! Stores:
//! - The cycle settings (study length, alarm window, test mode, time unit)
//! - Engine tuning (tick cadence, alarm seed, re-arm policy, eye-rest length)
//!
//! Configuration is stored at `~/.config/studycycle/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::engine::{CycleEngine, EngineOptions, RearmPolicy};
use crate::error::{ConfigError, ConfigurationError};
use crate::settings::{Durations, Settings, EYE_REST_MS};
use crate::timer::{SeededIntervals, TICK_MS};

/// When the alarm is re-armed after it fires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RearmMode {
    /// A constant delay equal to the standard eye-rest length.
    #[default]
    Fixed,
    /// Exactly when the configured eye-rest countdown ends.
    EyeRestEnd,
}

/// Engine tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Fixed seed for the alarm draws. Entropy when unset.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub rearm: RearmMode,
    /// Override of the eye-rest countdown length.
    #[serde(default)]
    pub eye_rest_seconds: Option<u32>,
}

fn default_tick_interval() -> u64 {
    TICK_MS
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
            seed: None,
            rearm: RearmMode::Fixed,
            eye_rest_seconds: None,
        }
    }
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/studycycle/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cycle: Settings,
    #[serde(default)]
    pub engine: EngineConfig,
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
                        .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
                ),
                // "none" clears an optional number; required fields reject the
                // null when the config is rebuilt.
                serde_json::Value::Number(_) | serde_json::Value::Null => match value {
                    "" | "none" => serde_json::Value::Null,
                    _ => value
                        .parse::<u64>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?,
                },
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                }
                serde_json::Value::String(_) => serde_json::Value::String(value.into()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined or created.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing the defaults if no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, if
    /// its settings are invalid, or if the default config cannot be written.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content)?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no config file, writing defaults");
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// # Errors
    ///
    /// See [`Config::save`].
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => Some("none".to_string()),
            other => Some(other.to_string()),
        }
    }

    /// Update a value in memory. The result must still resolve to valid
    /// durations, otherwise nothing changes.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the updated config is invalid.
    pub fn update(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save.
    ///
    /// # Errors
    ///
    /// See [`Config::update`] and [`Config::save`].
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.update(key, value)?;
        self.save()
    }

    /// Every dot-path key with its current value, sorted by key.
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        if let Ok(serde_json::Value::Object(sections)) = serde_json::to_value(self) {
            for (section, fields) in sections {
                if let serde_json::Value::Object(fields) = fields {
                    for name in fields.keys() {
                        let key = format!("{section}.{name}");
                        if let Some(value) = self.get(&key) {
                            out.push((key, value));
                        }
                    }
                }
            }
        }
        out
    }

    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] if any section is out of range.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        Durations::resolve(&self.cycle)?;
        if self.engine.tick_interval_ms == 0 {
            return Err(ConfigurationError::NonPositiveDuration {
                field: "engine.tick_interval_ms",
            });
        }
        if self.engine.eye_rest_seconds == Some(0) {
            return Err(ConfigurationError::NonPositiveDuration {
                field: "engine.eye_rest_seconds",
            });
        }
        Ok(())
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            tick_ms: self.engine.tick_interval_ms,
            eye_rest_ms: self.engine.eye_rest_seconds.map(|s| u64::from(s) * 1000),
            rearm: match self.engine.rearm {
                RearmMode::Fixed => RearmPolicy::Fixed(EYE_REST_MS),
                RearmMode::EyeRestEnd => RearmPolicy::EyeRestEnd,
            },
        }
    }

    /// Engine for this config, seeded from `engine.seed` when set.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] if the config is invalid.
    pub fn build_engine(&self) -> Result<CycleEngine, ConfigurationError> {
        CycleEngine::with_source(
            &self.cycle,
            self.engine_options(),
            Box::new(SeededIntervals::new(self.engine.seed)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::TimeUnit;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
        assert_eq!(parsed.cycle.study_duration, 90);
        assert_eq!(parsed.engine.tick_interval_ms, 1000);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            [cycle]
            study_duration = 45
            min_alarm_interval = 2
            max_alarm_interval = 4
            time_unit = "seconds"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.cycle.study_duration, 45);
        assert_eq!(parsed.cycle.time_unit, TimeUnit::Seconds);
        assert!(!parsed.cycle.test_mode);
        assert_eq!(parsed.engine, EngineConfig::default());
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("cycle.study_duration").as_deref(), Some("90"));
        assert_eq!(cfg.get("cycle.time_unit").as_deref(), Some("minutes"));
        assert_eq!(cfg.get("engine.rearm").as_deref(), Some("fixed"));
        assert_eq!(cfg.get("engine.seed").as_deref(), Some("none"));
        assert!(cfg.get("cycle.missing_key").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn update_changes_number_bool_and_enum() {
        let mut cfg = Config::default();
        cfg.update("cycle.study_duration", "60").unwrap();
        cfg.update("cycle.test_mode", "true").unwrap();
        cfg.update("engine.rearm", "eye_rest_end").unwrap();
        assert_eq!(cfg.cycle.study_duration, 60);
        assert!(cfg.cycle.test_mode);
        assert_eq!(cfg.engine.rearm, RearmMode::EyeRestEnd);
    }

    #[test]
    fn update_sets_and_clears_optional_values() {
        let mut cfg = Config::default();
        cfg.update("engine.seed", "1234").unwrap();
        assert_eq!(cfg.engine.seed, Some(1234));
        cfg.update("engine.seed", "none").unwrap();
        assert_eq!(cfg.engine.seed, None);
    }

    #[test]
    fn update_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.update("cycle.nonexistent_key", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            cfg.update("nope.study_duration", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn update_rejects_invalid_type() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.update("cycle.test_mode", "not_a_bool"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            cfg.update("engine.rearm", "sometimes"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn update_revalidates_settings() {
        let mut cfg = Config::default();
        let err = cfg.update("cycle.min_alarm_interval", "10").unwrap_err();
        assert_eq!(
            err,
            ConfigError::Rejected(ConfigurationError::IntervalBoundsInverted { min: 10, max: 5 })
        );
        assert!(cfg.update("cycle.study_duration", "0").is_err());
        assert!(cfg.update("engine.eye_rest_seconds", "0").is_err());
        assert!(matches!(
            cfg.update("cycle.study_duration", "none"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn save_and_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.update("cycle.study_duration", "50").unwrap();
        cfg.update("engine.seed", "7").unwrap();
        cfg.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), cfg);
    }

    #[test]
    fn load_writes_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn load_rejects_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        std::fs::write(&path, "cycle = [not toml").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::ParseFailed(_))
        ));

        std::fs::write(
            &path,
            "[cycle]\nstudy_duration = 10\nmin_alarm_interval = 3\nmax_alarm_interval = 20\n",
        )
        .unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Rejected(ConfigurationError::IntervalExceedsStudy { .. }))
        ));
    }

    #[test]
    fn entries_cover_every_key() {
        let keys: Vec<String> = Config::default()
            .entries()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        for key in [
            "cycle.study_duration",
            "cycle.min_alarm_interval",
            "cycle.max_alarm_interval",
            "cycle.test_mode",
            "cycle.time_unit",
            "engine.tick_interval_ms",
            "engine.seed",
            "engine.rearm",
            "engine.eye_rest_seconds",
        ] {
            assert!(keys.iter().any(|k| k == key), "missing {key}");
        }
    }

    #[test]
    fn engine_options_follow_config() {
        let mut cfg = Config::default();
        assert_eq!(cfg.engine_options(), EngineOptions::default());

        cfg.update("engine.eye_rest_seconds", "25").unwrap();
        cfg.update("engine.rearm", "eye_rest_end").unwrap();
        let options = cfg.engine_options();
        assert_eq!(options.eye_rest_ms, Some(25_000));
        assert_eq!(options.rearm, RearmPolicy::EyeRestEnd);

        let engine = cfg.build_engine().unwrap();
        assert_eq!(engine.active_durations().eye_rest_ms, 25_000);
    }
}
