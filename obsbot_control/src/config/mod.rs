// config.rs

use crate::model::types::DeviceInfo;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    ops::RangeInclusive,
    path::{Path, PathBuf},
};
use thiserror::Error;

const APP_NAME: &str = "obsbot-control";
const CONFIG_FILE_NAME: &str = "config.json";

pub fn default_config_path() -> PathBuf {
    let mut dir = dirs_next::config_dir().unwrap_or_else(|| {
        dirs_next::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
    });
    dir.push(APP_NAME);
    dir.push(CONFIG_FILE_NAME);
    dir
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// What to do with values outside the documented hardware range
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RangePolicy {
    /// Forward the value untouched and let the camera decide
    #[default]
    PassThrough,
    /// Clamp to the range before forwarding
    Clamp,
    /// Refuse the command
    Reject,
}

/// Outcome of checking a value against a [`RangePolicy`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constrained<T> {
    Forward(T),
    Rejected,
}

impl RangePolicy {
    /// Check `value` in its own type, so integers are never widened or rounded
    pub fn constrain<T>(self, value: T, range: &RangeInclusive<T>) -> Constrained<T>
    where
        T: PartialOrd + Copy,
    {
        match self {
            RangePolicy::PassThrough => Constrained::Forward(value),
            // NaN compares unordered even with itself
            RangePolicy::Clamp if value.partial_cmp(&value).is_none() => Constrained::Rejected,
            RangePolicy::Clamp if value < *range.start() => Constrained::Forward(*range.start()),
            RangePolicy::Clamp if value > *range.end() => Constrained::Forward(*range.end()),
            RangePolicy::Clamp => Constrained::Forward(value),
            RangePolicy::Reject if range.contains(&value) => Constrained::Forward(value),
            RangePolicy::Reject => Constrained::Rejected,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Serial of the camera selected automatically after a scan
    pub default_device: Option<String>,
    pub range_policy: RangePolicy,
    /// Speed used for held-button gimbal moves (degrees per second)
    pub speed_step: f32,
    /// Cameras attached to the simulated SDK
    pub simulated_devices: Vec<DeviceInfo>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_device: None,
            range_policy: RangePolicy::PassThrough,
            speed_step: 30.0,
            simulated_devices: vec![
                DeviceInfo::new("RMOWA0000001", "OBSBOT Tiny 2"),
                DeviceInfo::new("RMOWB0000002", "OBSBOT Meet 2"),
            ],
        }
    }
}

impl Config {
    /// Load from the default location, or return default if missing
    pub fn load_or_default() -> Result<Self, ConfigError> {
        Self::load_from_or_default(&default_config_path())
    }

    /// Load from `path`, or return default if missing
    pub fn load_from_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let raw = fs::read_to_string(path)?;
            let cfg = serde_json::from_str(&raw)?;
            Ok(cfg)
        } else {
            Ok(Config::default())
        }
    }

    /// Save current config to the default location
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&default_config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from_or_default(&dir.path().join("config.json")).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let cfg = Config {
            default_device: Some("RMOWA0000001".to_owned()),
            range_policy: RangePolicy::Reject,
            ..Config::default()
        };
        cfg.save_to(&path).unwrap();

        assert_eq!(Config::load_from_or_default(&path).unwrap(), cfg);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "range_policy": "clamp" }"#).unwrap();

        let cfg = Config::load_from_or_default(&path).unwrap();
        assert_eq!(cfg.range_policy, RangePolicy::Clamp);
        assert_eq!(cfg.speed_step, 30.0);
        assert_eq!(cfg.simulated_devices.len(), 2);
    }

    #[test]
    fn test_invalid_json_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(
            Config::load_from_or_default(&path),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_range_policies() {
        let range = -45.0f32..=45.0;
        assert_eq!(
            RangePolicy::PassThrough.constrain(60.0, &range),
            Constrained::Forward(60.0)
        );
        assert_eq!(
            RangePolicy::Clamp.constrain(60.0, &range),
            Constrained::Forward(45.0)
        );
        assert_eq!(
            RangePolicy::Reject.constrain(60.0, &range),
            Constrained::Rejected
        );
        assert_eq!(
            RangePolicy::Reject.constrain(-45.0, &range),
            Constrained::Forward(-45.0)
        );
        assert_eq!(
            RangePolicy::Clamp.constrain(f32::NAN, &range),
            Constrained::Rejected
        );
    }

    #[test]
    fn test_integer_values_stay_exact() {
        let range = 0..=100;
        assert_eq!(
            RangePolicy::PassThrough.constrain(16_777_217, &range),
            Constrained::Forward(16_777_217)
        );
        assert_eq!(
            RangePolicy::Clamp.constrain(i32::MIN, &range),
            Constrained::Forward(0)
        );
        assert_eq!(
            RangePolicy::Reject.constrain(101, &range),
            Constrained::Rejected
        );
    }
}
