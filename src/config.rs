//! Configuration loading for nudge.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. User config (`~/.nudge/config.toml`)
//! 3. Defaults (lowest priority)
//!
//! All configuration is optional. The system runs with sensible defaults
//! when no config exists.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{FailOpen, NudgeError, Result};
use crate::util::{is_not_found, read_to_string_limited};

/// Interval choices offered when creating a goal, in minutes.
pub const DEFAULT_ALLOWED_INTERVALS: &[u32] = &[1, 5, 15, 30, 60, 120];

/// Main configuration struct for nudge.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Goal creation and validation rules.
    pub goals: GoalsConfig,
    /// Persistence settings.
    pub storage: StorageConfig,
}

/// Goal creation and validation rules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GoalsConfig {
    /// The fixed set of intervals a goal may use, in minutes.
    pub allowed_intervals: Vec<u32>,
    /// Interval preselected for new goals.
    pub default_interval: u32,
    /// Success threshold for new goals (percent).
    pub default_success_threshold: u8,
}

impl Default for GoalsConfig {
    fn default() -> Self {
        Self {
            allowed_intervals: DEFAULT_ALLOWED_INTERVALS.to_vec(),
            default_interval: 15,
            default_success_threshold: 80,
        }
    }
}

impl GoalsConfig {
    /// Check if an interval is one of the allowed choices.
    pub fn is_allowed_interval(&self, minutes: u32) -> bool {
        minutes > 0 && self.allowed_intervals.contains(&minutes)
    }

    /// Check if a threshold is a valid percentage.
    pub fn is_valid_threshold(value: u8) -> bool {
        value <= 100
    }

    /// Snap an arbitrary interval to the closest allowed one.
    ///
    /// Used to pre-select the picker when editing a goal whose stored
    /// interval is no longer offered. Ties go to the smaller interval.
    pub fn nearest_interval(&self, minutes: u32) -> u32 {
        let mut allowed: Vec<u32> = self.allowed_intervals.clone();
        allowed.sort_unstable();
        allowed
            .into_iter()
            .filter(|m| *m > 0)
            .min_by_key(|m| m.abs_diff(minutes))
            .unwrap_or(self.default_interval)
    }

    /// Reject rule sets that would make every goal invalid.
    pub fn validate(&self) -> Result<()> {
        if !self.allowed_intervals.iter().any(|m| *m > 0) {
            return Err(NudgeError::config(
                "goals.allowed_intervals must contain a positive interval",
            ));
        }
        if !self.is_allowed_interval(self.default_interval) {
            return Err(NudgeError::config(format!(
                "goals.default_interval {} is not in allowed_intervals",
                self.default_interval
            )));
        }
        if !Self::is_valid_threshold(self.default_success_threshold) {
            return Err(NudgeError::config(format!(
                "goals.default_success_threshold {} is outside 0-100",
                self.default_success_threshold
            )));
        }
        Ok(())
    }

    /// Bring merged rules back into a consistent state.
    ///
    /// Layers are merged field by field, so a file that only narrows
    /// `allowed_intervals` still carries the default `default_interval`.
    /// That interval is snapped to the nearest allowed one. Rules with no
    /// usable interval fall back to the default `[goals]` section. Returns
    /// whether anything was changed.
    fn repair(&mut self) -> bool {
        if self.validate().is_ok() {
            return false;
        }

        if !self.allowed_intervals.iter().any(|m| *m > 0) {
            tracing::warn!(
                allowed_intervals = ?self.allowed_intervals,
                "no usable goal interval configured, using default goal rules"
            );
            *self = GoalsConfig::default();
            return true;
        }

        if !self.is_allowed_interval(self.default_interval) {
            let snapped = self.nearest_interval(self.default_interval);
            tracing::warn!(
                default_interval = self.default_interval,
                snapped,
                "default interval is not allowed, snapping to nearest"
            );
            self.default_interval = snapped;
        }

        if !Self::is_valid_threshold(self.default_success_threshold) {
            let fallback = GoalsConfig::default().default_success_threshold;
            tracing::warn!(
                default_success_threshold = self.default_success_threshold,
                fallback,
                "default success threshold is outside 0-100"
            );
            self.default_success_threshold = fallback;
        }

        true
    }
}

/// Persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// File name of the goal collection inside the nudge home.
    pub file_name: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            file_name: "goals.json".to_string(),
        }
    }
}

impl Config {
    /// Load configuration with the full precedence chain.
    pub fn load() -> Self {
        let mut config = Config::default();

        if let Some(user_config) = Self::load_user_config() {
            config = config.merge(user_config);
        }

        config.finish()
    }

    /// Load configuration from an explicit home directory.
    pub fn load_from_home(home: &Path) -> Self {
        let mut config = Config::default();

        match Self::load_from_file(&home.join("config.toml")) {
            Ok(user_config) => config = config.merge(user_config),
            Err(e) if is_not_found(&e) => {}
            Err(e) => tracing::warn!(error = %e, "ignoring invalid config file"),
        }

        config.finish()
    }

    /// Apply env overrides to the merged layers, then repair the goal rules.
    ///
    /// Validation only makes sense on the merged result: a single layer may
    /// legitimately state half of a consistent rule set.
    fn finish(mut self) -> Self {
        self.apply_env_overrides();
        self.goals.repair();
        self
    }

    /// Load user config from `<nudge_home>/config.toml`.
    fn load_user_config() -> Option<Config> {
        let home = nudge_home()?;
        match Self::load_from_file(&home.join("config.toml")) {
            Ok(config) => Some(config),
            Err(e) if is_not_found(&e) => None,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring invalid config file");
                None
            }
        }
    }

    /// Load config from a specific file path.
    fn load_from_file(path: &Path) -> Result<Config> {
        let content = read_to_string_limited(path)?;
        let config: Config =
            toml::from_str(&content).map_err(|e| NudgeError::config(e.to_string()))?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // NUDGE_DEFAULT_INTERVAL
        if let Ok(val) = env::var("NUDGE_DEFAULT_INTERVAL") {
            match val.parse::<u32>() {
                Ok(n) if self.goals.is_allowed_interval(n) => self.goals.default_interval = n,
                Ok(n) => tracing::warn!(
                    "Invalid NUDGE_DEFAULT_INTERVAL value '{}'. Valid values: {:?}. Using '{}'.",
                    n,
                    self.goals.allowed_intervals,
                    self.goals.default_interval
                ),
                Err(_) => tracing::warn!(
                    "Invalid NUDGE_DEFAULT_INTERVAL value '{}'. Expected minutes. Using '{}'.",
                    val,
                    self.goals.default_interval
                ),
            }
        }

        // NUDGE_DEFAULT_THRESHOLD
        if let Ok(val) = env::var("NUDGE_DEFAULT_THRESHOLD") {
            match val.parse::<u8>() {
                Ok(n) if GoalsConfig::is_valid_threshold(n) => {
                    self.goals.default_success_threshold = n
                }
                _ => tracing::warn!(
                    "Invalid NUDGE_DEFAULT_THRESHOLD value '{}'. Must be 0-100. Using '{}'.",
                    val,
                    self.goals.default_success_threshold
                ),
            }
        }
    }

    /// Merge another config into this one.
    ///
    /// The `other` config takes precedence for every field that differs from
    /// the default. A layer cannot set a value back to its default to undo a
    /// lower layer; each layer only states its customizations.
    fn merge(mut self, other: Config) -> Self {
        let default_goals = GoalsConfig::default();
        if other.goals.allowed_intervals != default_goals.allowed_intervals {
            self.goals.allowed_intervals = other.goals.allowed_intervals;
        }
        if other.goals.default_interval != default_goals.default_interval {
            self.goals.default_interval = other.goals.default_interval;
        }
        if other.goals.default_success_threshold != default_goals.default_success_threshold {
            self.goals.default_success_threshold = other.goals.default_success_threshold;
        }

        if other.storage.file_name != StorageConfig::default().file_name {
            self.storage.file_name = other.storage.file_name;
        }

        self
    }

    /// Load config with fail-open behavior.
    ///
    /// Merged rules are repaired during loading; anything still inconsistent
    /// falls back to defaults.
    pub fn load_fail_open() -> Self {
        let config = Self::load();
        let checked: Result<Self> = config.goals.validate().map(|_| config);
        checked.fail_open_default("loading config")
    }

    /// Save configuration to `<home>/config.toml`.
    ///
    /// Uses atomic write (write to temp file, then rename).
    pub fn save_to_home(&self, home: &Path) -> Result<()> {
        if !home.exists() {
            fs::create_dir_all(home).map_err(|e| NudgeError::storage(home, e))?;
        }

        let config_path = home.join("config.toml");
        let content =
            toml::to_string_pretty(self).map_err(|e| NudgeError::config(e.to_string()))?;

        let temp_path = home.join(".config.toml.tmp");
        fs::write(&temp_path, &content).map_err(|e| NudgeError::storage(&temp_path, e))?;
        fs::rename(&temp_path, &config_path).map_err(|e| NudgeError::storage(&config_path, e))?;

        Ok(())
    }

    /// Path of the goals file under the given home.
    pub fn goals_path(&self, home: &Path) -> PathBuf {
        home.join(&self.storage.file_name)
    }
}

/// Get the nudge home directory.
///
/// Checks `NUDGE_HOME` first, then falls back to `~/.nudge`.
/// An empty `NUDGE_HOME` is ignored.
pub fn nudge_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("NUDGE_HOME") {
        if home.is_empty() {
            tracing::warn!("NUDGE_HOME is empty, using default");
        } else {
            let path = PathBuf::from(&home);
            if path.is_absolute() {
                return Some(path);
            }
            if let Ok(canonical) = path.canonicalize() {
                return Some(canonical);
            }
            tracing::warn!("NUDGE_HOME is relative and doesn't exist, using as-is");
            return Some(path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        return Some(home.join(".nudge"));
    }

    // Containerized/minimal environments without HOME
    let fallback_path = env::temp_dir().join("nudge");
    tracing::warn!(
        "HOME not set, using fallback location: {}",
        fallback_path.display()
    );
    Some(fallback_path)
}
