//! Banner configuration schema.
//!
//! # Responsibility
//! - Define persisted settings with defaults for every field.
//! - Validate values at the configuration boundary before they reach the pool
//!   or the placement engine.
//! - Parse raw numeric input, keeping the previous value on failure.
//!
//! # Invariants
//! - A `BannerSettings` held by the runtime always passes [`BannerSettings::validate`].
//! - `ignore_patterns` keeps the user's line order; evaluation is last-match-wins.

use crate::model::policy::{EditModeBehavior, MobileBehavior};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const DEFAULT_CAPACITY: usize = 4;
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;
pub const DEFAULT_TEARDOWN_GRACE_MS: u64 = 1_000;
pub const DEFAULT_BANNER_HEIGHT_PX: u32 = 200;

/// Numeric settings accepted from free-form input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NumericSetting {
    Capacity,
    DebounceMs,
    TeardownGraceMs,
    BannerHeightPx,
}

impl NumericSetting {
    pub const ALL: [NumericSetting; 4] = [
        Self::Capacity,
        Self::DebounceMs,
        Self::TeardownGraceMs,
        Self::BannerHeightPx,
    ];

    /// Persisted key name.
    pub fn key(self) -> &'static str {
        match self {
            Self::Capacity => "capacity",
            Self::DebounceMs => "debounce_ms",
            Self::TeardownGraceMs => "teardown_grace_ms",
            Self::BannerHeightPx => "banner_height_px",
        }
    }

    /// Inclusive accepted range.
    pub fn bounds(self) -> (u64, u64) {
        match self {
            Self::Capacity => (1, 32),
            Self::DebounceMs => (0, 10_000),
            Self::TeardownGraceMs => (0, 60_000),
            Self::BannerHeightPx => (50, 2_000),
        }
    }
}

/// Rejected configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Input is not a non-negative integer.
    NotANumber {
        key: &'static str,
        raw: String,
    },
    OutOfRange {
        key: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotANumber { key, raw } => {
                write!(f, "setting `{key}` expects a whole number, got `{raw}`")
            }
            Self::OutOfRange {
                key,
                value,
                min,
                max,
            } => write!(
                f,
                "setting `{key}` must be between {min} and {max}, got {value}"
            ),
        }
    }
}

impl Error for ConfigError {}

/// Persisted banner configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BannerSettings {
    /// Maximum number of live embedded views.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Quiet window collapsing layout-change bursts.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Delay before a retired view is destroyed.
    #[serde(default = "default_teardown_grace_ms")]
    pub teardown_grace_ms: u64,
    #[serde(default = "default_banner_height_px")]
    pub banner_height_px: u32,
    /// Documents whose banner was switched off with the toggle command.
    #[serde(default)]
    pub disabled_notes: BTreeSet<String>,
    /// Raw ignore lines, in evaluation order.
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
    #[serde(default)]
    pub edit_mode_behavior: EditModeBehavior,
    #[serde(default)]
    pub mobile_behavior: MobileBehavior,
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

fn default_teardown_grace_ms() -> u64 {
    DEFAULT_TEARDOWN_GRACE_MS
}

fn default_banner_height_px() -> u32 {
    DEFAULT_BANNER_HEIGHT_PX
}

impl Default for BannerSettings {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            debounce_ms: default_debounce_ms(),
            teardown_grace_ms: default_teardown_grace_ms(),
            banner_height_px: default_banner_height_px(),
            disabled_notes: BTreeSet::new(),
            ignore_patterns: Vec::new(),
            edit_mode_behavior: EditModeBehavior::default(),
            mobile_behavior: MobileBehavior::default(),
        }
    }
}

impl BannerSettings {
    /// Checks every numeric field against its bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for setting in NumericSetting::ALL {
            check_bounds(setting, self.numeric(setting))?;
        }
        Ok(())
    }

    pub fn numeric(&self, setting: NumericSetting) -> u64 {
        match setting {
            NumericSetting::Capacity => self.capacity as u64,
            NumericSetting::DebounceMs => self.debounce_ms,
            NumericSetting::TeardownGraceMs => self.teardown_grace_ms,
            NumericSetting::BannerHeightPx => u64::from(self.banner_height_px),
        }
    }

    /// Parses raw input for one numeric setting and stores it when valid.
    ///
    /// Returns the applied value. On error the previous value is kept.
    pub fn set_numeric(&mut self, setting: NumericSetting, raw: &str) -> Result<u64, ConfigError> {
        let trimmed = raw.trim();
        let value = trimmed
            .parse::<u64>()
            .map_err(|_| ConfigError::NotANumber {
                key: setting.key(),
                raw: trimmed.to_string(),
            })?;
        check_bounds(setting, value)?;

        // Bounds keep every value within the target field's range.
        match setting {
            NumericSetting::Capacity => self.capacity = value as usize,
            NumericSetting::DebounceMs => self.debounce_ms = value,
            NumericSetting::TeardownGraceMs => self.teardown_grace_ms = value,
            NumericSetting::BannerHeightPx => self.banner_height_px = value as u32,
        }
        Ok(value)
    }

    pub fn is_note_disabled(&self, path: &str) -> bool {
        self.disabled_notes.contains(path)
    }

    /// Flips the per-note disable entry. Returns `true` when now disabled.
    pub fn toggle_note(&mut self, path: &str) -> bool {
        if self.disabled_notes.remove(path) {
            false
        } else {
            self.disabled_notes.insert(path.to_string());
            true
        }
    }
}

fn check_bounds(setting: NumericSetting, value: u64) -> Result<(), ConfigError> {
    let (min, max) = setting.bounds();
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            key: setting.key(),
            value,
            min,
            max,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{BannerSettings, ConfigError, NumericSetting, DEFAULT_CAPACITY};
    use crate::model::policy::{EditModeBehavior, MobileBehavior};

    #[test]
    fn defaults_are_valid() {
        let settings = BannerSettings::default();
        settings.validate().expect("defaults should validate");
        assert_eq!(settings.capacity, DEFAULT_CAPACITY);
        assert!(settings.teardown_grace_ms > 0);
    }

    #[test]
    fn set_numeric_accepts_trimmed_input() {
        let mut settings = BannerSettings::default();
        let applied = settings
            .set_numeric(NumericSetting::Capacity, " 6 ")
            .expect("6 is a valid capacity");
        assert_eq!(applied, 6);
        assert_eq!(settings.capacity, 6);
    }

    #[test]
    fn malformed_numeric_input_keeps_previous_value() {
        let mut settings = BannerSettings::default();
        let err = settings
            .set_numeric(NumericSetting::DebounceMs, "fast")
            .expect_err("non-numeric input must fail");
        assert!(matches!(err, ConfigError::NotANumber { key: "debounce_ms", .. }));
        assert_eq!(settings.debounce_ms, BannerSettings::default().debounce_ms);

        let err = settings
            .set_numeric(NumericSetting::Capacity, "0")
            .expect_err("zero capacity must fail");
        assert_eq!(
            err,
            ConfigError::OutOfRange {
                key: "capacity",
                value: 0,
                min: 1,
                max: 32
            }
        );
        assert_eq!(settings.capacity, DEFAULT_CAPACITY);

        assert!(settings.set_numeric(NumericSetting::BannerHeightPx, "-5").is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_fields() {
        let mut settings = BannerSettings::default();
        settings.banner_height_px = 10;
        let err = settings.validate().expect_err("height below minimum");
        assert!(err.to_string().contains("banner_height_px"));
    }

    #[test]
    fn toggle_note_flips_membership() {
        let mut settings = BannerSettings::default();
        assert!(settings.toggle_note("a.md"));
        assert!(settings.is_note_disabled("a.md"));
        assert!(!settings.toggle_note("a.md"));
        assert!(!settings.is_note_disabled("a.md"));
    }

    #[test]
    fn deserializes_partial_blob_with_defaults() {
        let json = r#"{"capacity": 2, "edit_mode_behavior": "hidden", "mobile_behavior": "simplified"}"#;
        let settings: BannerSettings = serde_json::from_str(json).expect("partial blob parses");
        assert_eq!(settings.capacity, 2);
        assert_eq!(settings.edit_mode_behavior, EditModeBehavior::Hidden);
        assert_eq!(settings.mobile_behavior, MobileBehavior::Simplified);
        assert_eq!(settings.debounce_ms, BannerSettings::default().debounce_ms);
        assert!(settings.ignore_patterns.is_empty());
    }
}
