use super::types::{
    RawBankwiseConfig, RawGradingConfig, RawScoringConfig, RawSessionConfig, RawTelemetryConfig,
};
use anyhow::{Context, Result};
use bankwise_lessons::{EngineConfig, GradingConfig, ScoringConfig, SessionConfig, TelemetryConfig};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<EngineConfig> {
        let user_path = Self::user_config_path();
        Self::load_from_paths(user_path.as_deref(), &Self::project_config_path())
    }

    /// Load and merge the given layers; missing files are skipped
    pub fn load_from_paths(user_path: Option<&Path>, project_path: &Path) -> Result<EngineConfig> {
        let mut raw = RawBankwiseConfig::default();

        // Layer 1: User config
        if let Some(user_path) = user_path
            && user_path.exists()
        {
            raw = Self::merge_raw(raw, Self::read_raw(user_path)?);
        }

        // Layer 2: Project config
        if project_path.exists() {
            raw = Self::merge_raw(raw, Self::read_raw(project_path)?);
        }

        // Convert to final config with defaults applied
        Ok(Self::finalize(raw))
    }

    fn read_raw(path: &Path) -> Result<RawBankwiseConfig> {
        debug!(path = %path.display(), "Reading config layer");
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("Invalid config in {}", path.display()))
    }

    /// Get user config path (platform-specific)
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "bankwise").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get project config path
    /// Can be overridden with BANKWISE_PROJECT_CONFIG_DIR env var (useful for isolated tests)
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("BANKWISE_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".bankwise/config.toml")
        }
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawBankwiseConfig, overlay: RawBankwiseConfig) -> RawBankwiseConfig {
        let mut mistake_penalties = base.scoring.mistake_penalties;
        mistake_penalties.extend(overlay.scoring.mistake_penalties);

        RawBankwiseConfig {
            scoring: RawScoringConfig {
                content_cap: overlay.scoring.content_cap.or(base.scoring.content_cap),
                app_usage_ceiling: overlay
                    .scoring
                    .app_usage_ceiling
                    .or(base.scoring.app_usage_ceiling),
                mistake_penalty: overlay.scoring.mistake_penalty.or(base.scoring.mistake_penalty),
                mistake_penalties,
                negative_condition_penalty: overlay
                    .scoring
                    .negative_condition_penalty
                    .or(base.scoring.negative_condition_penalty),
                positive_condition_bonus: overlay
                    .scoring
                    .positive_condition_bonus
                    .or(base.scoring.positive_condition_bonus),
                quiz_weight: overlay.scoring.quiz_weight.or(base.scoring.quiz_weight),
                required_action_threshold: overlay
                    .scoring
                    .required_action_threshold
                    .or(base.scoring.required_action_threshold),
            },
            grading: RawGradingConfig {
                scale: overlay.grading.scale.or(base.grading.scale),
            },
            telemetry: RawTelemetryConfig {
                enabled: overlay.telemetry.enabled.or(base.telemetry.enabled),
                endpoint: overlay.telemetry.endpoint.or(base.telemetry.endpoint),
                interval_ms: overlay.telemetry.interval_ms.or(base.telemetry.interval_ms),
                dedupe: overlay.telemetry.dedupe.or(base.telemetry.dedupe),
                timeout_secs: overlay.telemetry.timeout_secs.or(base.telemetry.timeout_secs),
            },
            session: RawSessionConfig {
                student_name: overlay.session.student_name.or(base.session.student_name),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawBankwiseConfig) -> EngineConfig {
        let scoring = ScoringConfig::default();
        let telemetry = TelemetryConfig::default();
        let session = SessionConfig::default();

        EngineConfig {
            scoring: ScoringConfig {
                content_cap: raw.scoring.content_cap.unwrap_or(scoring.content_cap),
                app_usage_ceiling: raw
                    .scoring
                    .app_usage_ceiling
                    .unwrap_or(scoring.app_usage_ceiling),
                mistake_penalty: raw.scoring.mistake_penalty.unwrap_or(scoring.mistake_penalty),
                mistake_penalties: raw.scoring.mistake_penalties,
                negative_condition_penalty: raw
                    .scoring
                    .negative_condition_penalty
                    .unwrap_or(scoring.negative_condition_penalty),
                positive_condition_bonus: raw
                    .scoring
                    .positive_condition_bonus
                    .unwrap_or(scoring.positive_condition_bonus),
                quiz_weight: raw.scoring.quiz_weight.unwrap_or(scoring.quiz_weight),
                required_action_threshold: raw
                    .scoring
                    .required_action_threshold
                    .unwrap_or(scoring.required_action_threshold),
            },
            grading: GradingConfig {
                scale: raw.grading.scale.unwrap_or_default(),
            },
            telemetry: TelemetryConfig {
                enabled: raw.telemetry.enabled.unwrap_or(telemetry.enabled),
                endpoint: raw.telemetry.endpoint.or(telemetry.endpoint),
                interval_ms: raw.telemetry.interval_ms.unwrap_or(telemetry.interval_ms),
                dedupe: raw.telemetry.dedupe.unwrap_or(telemetry.dedupe),
                timeout_secs: raw.telemetry.timeout_secs.unwrap_or(telemetry.timeout_secs),
            },
            session: SessionConfig {
                student_name: raw.session.student_name.unwrap_or(session.student_name),
            },
        }
    }
}
