//! Progression configuration: the recognized options and their defaults.
//!
//! Option names on disk are camelCase (`actionProbabilityPercent`, ...).
//! Missing options fall back to their defaults, so a config file only has to
//! name what it changes. Durations are expressed in real-time minutes and
//! converted to ticks at 20 ticks per second.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Simulation ticks per real second.
pub const TICKS_PER_SECOND: u64 = 20;

/// Simulation ticks per real minute.
pub const TICKS_PER_MINUTE: u64 = TICKS_PER_SECOND * 60;

/// Which shared parentage forbids pairing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SiblingRule {
    /// Reject only when both father and mother match.
    #[default]
    FullSiblings,
    /// Reject when either parent matches.
    AnySharedParent,
}

/// What the engine does when a pair audit finds a broken invariant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InvariantMode {
    /// Repair the pair and log a warning.
    #[default]
    Heal,
    /// Log an error and panic. Meant for test suites.
    Assert,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported config format: {0} (expected .toml or .json)")]
    UnsupportedFormat(PathBuf),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tunables consumed by the progression controller and transition rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProgressionConfig {
    /// Master switch. When false the controller never acts.
    pub enabled: bool,

    /// Time alive before an agent becomes visible to the controller.
    pub activation_threshold_minutes: u32,

    /// Cooldown between two evaluations of the same agent.
    pub evaluation_interval_minutes: u32,

    /// Cooldown given to a freshly created or reset progression state.
    ///
    /// This is a raw tick count, not minutes, so a new agent gets its first
    /// evaluation almost as soon as it passes the activation threshold.
    pub initial_cooldown_ticks: u32,

    /// Chance that an evaluation whose cooldown expired acts at all.
    pub action_probability_percent: u8,

    /// Chance that a conception attempt succeeds when the pair is close enough.
    pub conception_probability_percent: u8,

    /// Chance that a pair tries for another child after a birth.
    pub continuation_probability_percent: u8,

    /// Maximum distance between spouses for conception.
    pub conception_proximity: f32,

    /// Eligible Gestating evaluations before the child is born.
    pub gestation_duration_ticks: u32,

    /// Children a pair may have before the cycle stops for good.
    pub max_children_per_pair: u32,

    /// Radius searched for a partner.
    pub partner_search_radius: f32,

    /// Time alive before a child becomes an adult. 0 disables maturation.
    pub childhood_duration_minutes: u32,

    pub sibling_rule: SiblingRule,

    pub invariant_mode: InvariantMode,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            activation_threshold_minutes: 120,
            evaluation_interval_minutes: 20,
            initial_cooldown_ticks: 20,
            action_probability_percent: 75,
            conception_probability_percent: 50,
            continuation_probability_percent: 50,
            conception_proximity: 8.5,
            gestation_duration_ticks: 1,
            max_children_per_pair: 4,
            partner_search_radius: 15.0,
            childhood_duration_minutes: 180,
            sibling_rule: SiblingRule::FullSiblings,
            invariant_mode: InvariantMode::Heal,
        }
    }
}

impl ProgressionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activation threshold in ticks.
    pub fn activation_threshold_ticks(&self) -> u64 {
        u64::from(self.activation_threshold_minutes) * TICKS_PER_MINUTE
    }

    /// Evaluation interval in ticks, saturated to fit the cooldown counter.
    pub fn evaluation_interval_ticks(&self) -> u32 {
        let ticks = u64::from(self.evaluation_interval_minutes) * TICKS_PER_MINUTE;
        u32::try_from(ticks).unwrap_or(u32::MAX)
    }

    /// Childhood duration in ticks, or `None` when maturation is disabled.
    pub fn childhood_duration_ticks(&self) -> Option<u64> {
        match self.childhood_duration_minutes {
            0 => None,
            minutes => Some(u64::from(minutes) * TICKS_PER_MINUTE),
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file, picking the parser from the file extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&text),
            Some("json") => Self::from_json_str(&text),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// Validate configuration for internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let percents = [
            ("actionProbabilityPercent", self.action_probability_percent),
            ("conceptionProbabilityPercent", self.conception_probability_percent),
            ("continuationProbabilityPercent", self.continuation_probability_percent),
        ];
        for (name, value) in percents {
            if value > 100 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be within 0..=100, got {value}"
                )));
            }
        }

        if !self.conception_proximity.is_finite() || self.conception_proximity < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "conceptionProximity must be a non-negative distance, got {}",
                self.conception_proximity
            )));
        }

        if !self.partner_search_radius.is_finite() || self.partner_search_radius <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "partnerSearchRadius must be positive, got {}",
                self.partner_search_radius
            )));
        }

        if self.gestation_duration_ticks == 0 {
            return Err(ConfigError::Invalid(
                "gestationDurationTicks must be at least 1".into(),
            ));
        }

        Ok(())
    }
}
