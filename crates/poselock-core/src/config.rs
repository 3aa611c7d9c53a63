//! Configuration parsing and validation.
//!
//! This module handles parsing of kiosk configuration files (TOML) that
//! define the target password, capture timing, video acquisition
//! parameters, and the class-to-letter bindings. Validation is
//! fail-closed: a configuration that parses but violates an invariant is
//! rejected with a descriptive message rather than patched up.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::buffer::DEFAULT_MAX_LEN;
use crate::classify::{TiePolicy, DEFAULT_CONFIDENCE_THRESHOLD};
use crate::cycle::{DEFAULT_INITIAL_GRACE_SECS, DEFAULT_STEADY_SECS, DEFAULT_URGENCY_THRESHOLD_SECS};

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML did not parse.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration could not be serialized.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The configuration parsed but violates an invariant.
    #[error("invalid config: {0}")]
    Validation(String),
}

/// Top-level kiosk configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KioskConfig {
    /// Session settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Capture cycle settings.
    #[serde(default)]
    pub capture: CaptureConfig,

    /// Video acquisition settings.
    #[serde(default)]
    pub video: VideoConfig,

    /// Class label to password letter bindings, in model order.
    #[serde(default = "default_class_bindings")]
    pub classes: Vec<ClassBinding>,
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            capture: CaptureConfig::default(),
            video: VideoConfig::default(),
            classes: default_class_bindings(),
        }
    }
}

/// Session settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Target password the sample buffer is compared against.
    #[serde(default = "default_target_password")]
    pub target_password: String,

    /// Maximum sample buffer length.
    #[serde(default = "default_max_buffer_len")]
    pub max_buffer_len: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            target_password: default_target_password(),
            max_buffer_len: default_max_buffer_len(),
        }
    }
}

/// Capture cycle settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaptureConfig {
    /// Length of the first interval, giving the operator time to take
    /// position before the first sample.
    #[serde(default = "default_initial_grace_secs")]
    pub initial_grace_secs: u32,

    /// Length of every interval after the first.
    #[serde(default = "default_steady_interval_secs")]
    pub steady_interval_secs: u32,

    /// Remaining seconds at or below which the countdown display turns
    /// urgent.
    #[serde(default = "default_urgency_threshold_secs")]
    pub urgency_threshold_secs: u32,

    /// Strict confidence threshold a class must exceed to become a
    /// capture candidate.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,

    /// Tie-break policy when several classes clear the threshold.
    #[serde(default)]
    pub tie_policy: TiePolicy,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            initial_grace_secs: default_initial_grace_secs(),
            steady_interval_secs: default_steady_interval_secs(),
            urgency_threshold_secs: default_urgency_threshold_secs(),
            confidence_threshold: default_confidence_threshold(),
            tie_policy: TiePolicy::default(),
        }
    }
}

/// Video acquisition settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VideoConfig {
    /// Frame width in pixels.
    #[serde(default = "default_video_dimension")]
    pub width: u32,

    /// Frame height in pixels.
    #[serde(default = "default_video_dimension")]
    pub height: u32,

    /// Whether frames are mirrored horizontally (selfie view).
    #[serde(default = "default_mirrored")]
    pub mirrored: bool,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            width: default_video_dimension(),
            height: default_video_dimension(),
            mirrored: default_mirrored(),
        }
    }
}

/// Binding from a trained class label to the password letter it
/// contributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassBinding {
    /// Class label as configured in the model.
    pub label: String,
    /// Password letter appended when this class wins a capture cycle.
    pub key: char,
}

fn default_target_password() -> String {
    "TIK".to_string()
}

const fn default_max_buffer_len() -> usize {
    DEFAULT_MAX_LEN
}

const fn default_initial_grace_secs() -> u32 {
    DEFAULT_INITIAL_GRACE_SECS
}

const fn default_steady_interval_secs() -> u32 {
    DEFAULT_STEADY_SECS
}

const fn default_urgency_threshold_secs() -> u32 {
    DEFAULT_URGENCY_THRESHOLD_SECS
}

const fn default_confidence_threshold() -> f32 {
    DEFAULT_CONFIDENCE_THRESHOLD
}

const fn default_video_dimension() -> u32 {
    640
}

const fn default_mirrored() -> bool {
    true
}

fn default_class_bindings() -> Vec<ClassBinding> {
    ["I", "K", "T", "O"]
        .into_iter()
        .map(|label| ClassBinding {
            label: label.to_string(),
            key: label.chars().next().unwrap_or('?'),
        })
        .collect()
}

impl KioskConfig {
    /// Loads and validates configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// parsed configuration violates an invariant.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or the configuration
    /// violates an invariant.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Looks up the password letter bound to a class label.
    #[must_use]
    pub fn key_for(&self, label: &str) -> Option<char> {
        self.classes
            .iter()
            .find(|binding| binding.label == label)
            .map(|binding| binding.key)
    }

    /// Validates the configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] on the first violated
    /// invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.capture.confidence_threshold;
        if !(threshold > 0.0 && threshold < 1.0) {
            return Err(ConfigError::Validation(format!(
                "capture.confidence_threshold must be within (0, 1), got {threshold}"
            )));
        }
        if self.capture.initial_grace_secs == 0 {
            return Err(ConfigError::Validation(
                "capture.initial_grace_secs must be at least 1".to_string(),
            ));
        }
        if self.capture.steady_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "capture.steady_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.video.width == 0 || self.video.height == 0 {
            return Err(ConfigError::Validation(
                "video.width and video.height must be non-zero".to_string(),
            ));
        }
        if self.classes.is_empty() {
            return Err(ConfigError::Validation(
                "at least one class binding is required".to_string(),
            ));
        }

        let mut labels = HashSet::new();
        let mut keys = HashSet::new();
        for binding in &self.classes {
            if binding.label.is_empty() {
                return Err(ConfigError::Validation(
                    "class binding labels must be non-empty".to_string(),
                ));
            }
            if !labels.insert(binding.label.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate class binding label: {}",
                    binding.label
                )));
            }
            if !keys.insert(binding.key) {
                return Err(ConfigError::Validation(format!(
                    "duplicate class binding key: {}",
                    binding.key
                )));
            }
        }

        if self.session.target_password.is_empty() {
            return Err(ConfigError::Validation(
                "session.target_password must be non-empty".to_string(),
            ));
        }
        if self.session.max_buffer_len < self.session.target_password.chars().count() {
            return Err(ConfigError::Validation(format!(
                "session.max_buffer_len ({}) is shorter than the target password",
                self.session.max_buffer_len
            )));
        }
        // Every target letter must be reachable through some bound class,
        // otherwise the kiosk can never be unlocked.
        for ch in self.session.target_password.chars() {
            if !keys.contains(&ch) {
                return Err(ConfigError::Validation(format!(
                    "target password letter '{ch}' has no class binding"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = KioskConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.session.target_password, "TIK");
        assert_eq!(config.capture.initial_grace_secs, 20);
        assert_eq!(config.capture.steady_interval_secs, 10);
        assert_eq!(config.capture.tie_policy, TiePolicy::LastWins);
        assert!(config.video.mirrored);
    }

    #[test]
    fn toml_round_trip_preserves_config() {
        let config = KioskConfig::default();
        let toml = config.to_toml().unwrap();
        let parsed = KioskConfig::from_toml(&toml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let parsed = KioskConfig::from_toml("").unwrap();
        assert_eq!(parsed, KioskConfig::default());
    }

    #[test]
    fn from_file_reads_and_validates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[session]
target_password = "KIT"

[capture]
steady_interval_secs = 5
tie_policy = "highest-confidence"
"#
        )
        .unwrap();
        let config = KioskConfig::from_file(file.path()).unwrap();
        assert_eq!(config.session.target_password, "KIT");
        assert_eq!(config.capture.steady_interval_secs, 5);
        assert_eq!(config.capture.tie_policy, TiePolicy::HighestConfidence);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = KioskConfig::from_toml("[session]\nlegacy_password = \"x\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn threshold_out_of_range_is_rejected() {
        for bad in ["0.0", "1.0", "1.5", "-0.1"] {
            let toml = format!("[capture]\nconfidence_threshold = {bad}\n");
            let err = KioskConfig::from_toml(&toml).unwrap_err();
            assert!(matches!(err, ConfigError::Validation(_)), "accepted {bad}");
        }
    }

    #[test]
    fn zero_intervals_are_rejected() {
        let err = KioskConfig::from_toml("[capture]\ninitial_grace_secs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        let err = KioskConfig::from_toml("[capture]\nsteady_interval_secs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn duplicate_bindings_are_rejected() {
        let toml = r#"
[[classes]]
label = "I"
key = "I"

[[classes]]
label = "I"
key = "K"
"#;
        let err = KioskConfig::from_toml(toml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn unreachable_target_password_is_rejected() {
        let toml = r#"
[session]
target_password = "TIX"
"#;
        let err = KioskConfig::from_toml(toml).unwrap_err();
        let message = err.to_string();
        assert!(message.contains('X'), "unexpected message: {message}");
    }

    #[test]
    fn key_lookup_follows_bindings() {
        let config = KioskConfig::default();
        assert_eq!(config.key_for("T"), Some('T'));
        assert_eq!(config.key_for("unknown"), None);
    }
}
