//! Engine configuration types.
//!
//! Scoring weights, grade banding, telemetry cadence and the session's
//! student identity. Every section deserializes from TOML with defaults
//! filled in for missing keys.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::scoring::GradeScale;

/// Main configuration for the lesson engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Score accrual and completion thresholds.
    pub scoring: ScoringConfig,
    /// Letter grade banding.
    pub grading: GradingConfig,
    /// Session telemetry reporter.
    pub telemetry: TelemetryConfig,
    /// Session identity.
    pub session: SessionConfig,
}

impl EngineConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }
}

/// Scoring configuration for the completion tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Maximum points earned by viewing lesson content.
    pub content_cap: f64,
    /// Starting (and maximum) app-usage score.
    pub app_usage_ceiling: f64,
    /// Points removed per recorded mistake.
    pub mistake_penalty: f64,
    /// Per mistake-type overrides of `mistake_penalty`.
    pub mistake_penalties: HashMap<String, f64>,
    /// Points removed when a negative condition fires.
    pub negative_condition_penalty: f64,
    /// Points restored when a positive condition fires.
    pub positive_condition_bonus: f64,
    /// Weight of the quiz percentage in the final blend (0.0 to 1.0).
    pub quiz_weight: f64,
    /// Fraction of required actions needed for auto-completion.
    pub required_action_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            content_cap: 30.0,
            app_usage_ceiling: 70.0,
            mistake_penalty: 5.0,
            mistake_penalties: HashMap::new(),
            negative_condition_penalty: 5.0,
            positive_condition_bonus: 2.0,
            quiz_weight: 0.25,
            required_action_threshold: 1.0,
        }
    }
}

impl ScoringConfig {
    /// Penalty for a mistake of the given type.
    pub fn penalty_for(&self, mistake_type: &str) -> f64 {
        self.mistake_penalties
            .get(mistake_type)
            .copied()
            .unwrap_or(self.mistake_penalty)
            .max(0.0)
    }
}

/// Letter grade configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradingConfig {
    /// Banding table used for completion records.
    pub scale: GradeScale,
}

/// Configuration for the session telemetry reporter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Whether the reporter should run at all.
    pub enabled: bool,
    /// Session-persistence endpoint receiving POSTed snapshots.
    pub endpoint: Option<String>,
    /// Interval between snapshots in milliseconds.
    pub interval_ms: u64,
    /// Skip sends whose content matches the last successful send.
    pub dedupe: bool,
    /// HTTP timeout for a single send in seconds.
    pub timeout_secs: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            interval_ms: 1000,
            dedupe: true,
            timeout_secs: 10,
        }
    }
}

impl TelemetryConfig {
    /// Interval between snapshots.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }

    /// Timeout for a single HTTP send.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Session identity reported with telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Student the session belongs to.
    pub student_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            student_name: "student".to_string(),
        }
    }
}
