use std::collections::HashMap;

use bankwise_lessons::GradeScale;
use serde::Deserialize;

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawBankwiseConfig {
    #[serde(default)]
    pub scoring: RawScoringConfig,

    #[serde(default)]
    pub grading: RawGradingConfig,

    #[serde(default)]
    pub telemetry: RawTelemetryConfig,

    #[serde(default)]
    pub session: RawSessionConfig,
}

/// Scoring section as stored in TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawScoringConfig {
    pub content_cap: Option<f64>,
    pub app_usage_ceiling: Option<f64>,
    pub mistake_penalty: Option<f64>,
    /// Per mistake-type penalties; keys merge across layers
    #[serde(default)]
    pub mistake_penalties: HashMap<String, f64>,
    pub negative_condition_penalty: Option<f64>,
    pub positive_condition_bonus: Option<f64>,
    pub quiz_weight: Option<f64>,
    pub required_action_threshold: Option<f64>,
}

/// Grading section as stored in TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawGradingConfig {
    pub scale: Option<GradeScale>,
}

/// Telemetry section as stored in TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawTelemetryConfig {
    pub enabled: Option<bool>,
    pub endpoint: Option<String>,
    pub interval_ms: Option<u64>,
    pub dedupe: Option<bool>,
    pub timeout_secs: Option<u64>,
}

/// Session section as stored in TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawSessionConfig {
    /// Student reported in telemetry
    pub student_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_is_all_none() {
        let raw: RawBankwiseConfig = toml::from_str("").unwrap();
        assert!(raw.scoring.content_cap.is_none());
        assert!(raw.grading.scale.is_none());
        assert!(raw.telemetry.endpoint.is_none());
        assert!(raw.session.student_name.is_none());
    }

    #[test]
    fn test_partial_sections_parse() {
        let raw: RawBankwiseConfig = toml::from_str(
            r#"
[scoring]
quiz_weight = 0.4
mistake_penalties = { overdraft = 10.0 }

[grading]
scale = "plus_minus"
"#,
        )
        .unwrap();

        assert_eq!(raw.scoring.quiz_weight, Some(0.4));
        assert_eq!(raw.scoring.mistake_penalties.get("overdraft"), Some(&10.0));
        assert!(raw.scoring.mistake_penalty.is_none());
        assert_eq!(raw.grading.scale, Some(GradeScale::PlusMinus));
    }
}
