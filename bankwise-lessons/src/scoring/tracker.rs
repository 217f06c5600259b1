//! Per-lesson score accrual and completion detection.
//!
//! [`CompletionTracker`] is stateless apart from its configuration. It
//! mutates a lesson's [`ScoreState`] as events arrive and decides when the
//! lesson is done; the registry owns the state itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::grade::GradeScale;
use super::record::{CompletionReason, CompletionRecord, LessonScore, ScoreBreakdown};
use crate::config::ScoringConfig;
use crate::lesson::{ActionParams, Condition, Lesson, Polarity};

/// Action type reporting slide progress.
pub const LESSON_CONTENT_VIEWED: &str = "lesson_content_viewed";

/// Score given to slider-only lessons once all content is viewed.
const SLIDER_ONLY_SCORE: f64 = 100.0;

/// Lifecycle phase of an active lesson.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonPhase {
    #[default]
    Fresh,
    InProgress,
}

/// One quiz result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizScore {
    pub earned: f64,
    pub possible: f64,
    pub label: String,
}

impl QuizScore {
    pub fn new(earned: f64, possible: f64, label: impl Into<String>) -> Self {
        Self {
            earned,
            possible,
            label: label.into(),
        }
    }

    /// Percentage in 0..=100.
    pub fn percentage(&self) -> f64 {
        if self.possible > 0.0 {
            (self.earned / self.possible * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        }
    }
}

/// A recorded student mistake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MistakeRecord {
    pub mistake_type: String,
    pub details: Value,
    pub penalty: f64,
    pub recorded_at: DateTime<Utc>,
}

/// Running totals for one active lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreState {
    pub phase: LessonPhase,
    pub content_score: f64,
    pub app_usage_score: f64,
    pub slides_viewed: u32,
    pub total_slides: Option<u32>,
    /// Set once every slide has been viewed; a later, larger slide
    /// count does not clear it.
    #[serde(default)]
    pub content_viewed: bool,
    pub quiz_scores: Vec<QuizScore>,
    pub positive_conditions_met: Vec<String>,
    pub negative_conditions_triggered: Vec<String>,
    pub required_actions_completed: Vec<String>,
    pub mistakes: Vec<MistakeRecord>,
}

impl ScoreState {
    /// Fresh state with the app-usage score at `ceiling`.
    pub fn new(ceiling: f64) -> Self {
        Self {
            phase: LessonPhase::Fresh,
            content_score: 0.0,
            app_usage_score: ceiling,
            slides_viewed: 0,
            total_slides: None,
            content_viewed: false,
            quiz_scores: Vec::new(),
            positive_conditions_met: Vec::new(),
            negative_conditions_triggered: Vec::new(),
            required_actions_completed: Vec::new(),
            mistakes: Vec::new(),
        }
    }

    /// Whether every slide has been viewed.
    pub fn content_fully_viewed(&self) -> bool {
        self.content_viewed
            || matches!(self.total_slides, Some(total) if total > 0 && self.slides_viewed >= total)
    }

    /// Aggregate quiz percentage across all quizzes.
    pub fn quiz_percentage(&self) -> Option<f64> {
        let possible: f64 = self.quiz_scores.iter().map(|q| q.possible).sum();
        if self.quiz_scores.is_empty() || possible <= 0.0 {
            return None;
        }
        let earned: f64 = self.quiz_scores.iter().map(|q| q.earned).sum();
        Some((earned / possible * 100.0).clamp(0.0, 100.0))
    }

    fn start(&mut self) {
        self.phase = LessonPhase::InProgress;
    }
}

impl Default for ScoreState {
    fn default() -> Self {
        Self::new(ScoringConfig::default().app_usage_ceiling)
    }
}

/// Applies scoring rules to lesson state.
#[derive(Debug, Clone, Default)]
pub struct CompletionTracker {
    config: ScoringConfig,
    scale: GradeScale,
}

impl CompletionTracker {
    pub fn new(config: ScoringConfig, scale: GradeScale) -> Self {
        Self { config, scale }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn scale(&self) -> GradeScale {
        self.scale
    }

    /// Initial state for a newly activated lesson.
    pub fn initial_state(&self, lesson: &Lesson) -> ScoreState {
        let mut state = ScoreState::new(self.config.app_usage_ceiling);
        state.total_slides = lesson.total_slides();
        state
    }

    /// Account for an action performed inside `lesson`.
    ///
    /// Handles content progress and required-action bookkeeping. Condition
    /// matching happens separately in the matcher.
    pub fn observe_action(
        &self,
        lesson: &Lesson,
        state: &mut ScoreState,
        action_type: &str,
        params: &ActionParams,
    ) {
        state.start();

        if action_type == LESSON_CONTENT_VIEWED {
            self.record_content(lesson, state, params);
        }

        if lesson.required_actions().iter().any(|a| a == action_type)
            && !state
                .required_actions_completed
                .iter()
                .any(|a| a == action_type)
        {
            debug!(
                lesson_id = %lesson.id(),
                action_type,
                "Required action completed"
            );
            state
                .required_actions_completed
                .push(action_type.to_string());
        }
    }

    fn record_content(&self, lesson: &Lesson, state: &mut ScoreState, params: &ActionParams) {
        let viewed = count_param(params, &["slidesViewed", "slides_viewed"]);
        let total = count_param(params, &["totalSlides", "total_slides"])
            .or(state.total_slides)
            .or(lesson.total_slides());

        let (Some(viewed), Some(total)) = (viewed, total) else {
            debug!(lesson_id = %lesson.id(), "Content event without slide counts, ignored");
            return;
        };
        if total == 0 {
            debug!(lesson_id = %lesson.id(), "Content event with zero slides, ignored");
            return;
        }

        let viewed = viewed.min(total);
        state.total_slides = Some(total);
        state.slides_viewed = state.slides_viewed.max(viewed);
        state.content_viewed |= state.slides_viewed >= total;

        let cap = self.config.content_cap.max(0.0);
        let score = (cap * f64::from(viewed) / f64::from(total))
            .round()
            .clamp(0.0, cap);
        state.content_score = state.content_score.max(score);
    }

    /// Account for a newly met condition according to its polarity.
    pub fn record_condition(&self, state: &mut ScoreState, condition: &Condition) {
        state.start();
        match condition.polarity {
            Polarity::Positive => {
                state.positive_conditions_met.push(condition.id.clone());
                state.app_usage_score = (state.app_usage_score
                    + self.config.positive_condition_bonus)
                    .min(self.config.app_usage_ceiling);
            }
            Polarity::Negative => {
                state
                    .negative_conditions_triggered
                    .push(condition.id.clone());
                state.app_usage_score =
                    (state.app_usage_score - self.config.negative_condition_penalty).max(0.0);
            }
            Polarity::Neutral => {}
        }
    }

    /// Record a mistake; the app-usage score never increases here.
    pub fn record_mistake(&self, state: &mut ScoreState, mistake_type: &str, details: Value) {
        state.start();
        let penalty = self.config.penalty_for(mistake_type);
        state.app_usage_score = (state.app_usage_score - penalty).max(0.0);
        state.mistakes.push(MistakeRecord {
            mistake_type: mistake_type.to_string(),
            details,
            penalty,
            recorded_at: Utc::now(),
        });
    }

    /// Record a quiz result. Returns false when `possible` is not positive.
    pub fn add_quiz_score(&self, state: &mut ScoreState, quiz: QuizScore) -> bool {
        if quiz.possible.is_nan() || quiz.possible <= 0.0 || !quiz.earned.is_finite() {
            warn!(
                label = %quiz.label,
                earned = quiz.earned,
                possible = quiz.possible,
                "Ignoring quiz score with invalid totals"
            );
            return false;
        }
        state.start();
        let earned = quiz.earned.clamp(0.0, quiz.possible);
        state.quiz_scores.push(QuizScore { earned, ..quiz });
        true
    }

    /// Current score components.
    pub fn breakdown(&self, state: &ScoreState) -> ScoreBreakdown {
        ScoreBreakdown {
            content_score: state.content_score,
            app_usage_score: state.app_usage_score,
            combined_score: state.content_score + state.app_usage_score,
            quiz_percentage: state.quiz_percentage(),
            quiz_count: state.quiz_scores.len(),
            mistake_count: state.mistakes.len(),
            positive_conditions_met: state.positive_conditions_met.clone(),
            negative_conditions_triggered: state.negative_conditions_triggered.clone(),
            required_actions_completed: state.required_actions_completed.clone(),
        }
    }

    /// Blended final score, rounded and clamped to 0..=100.
    pub fn final_score(&self, state: &ScoreState) -> f64 {
        let combined = state.content_score + state.app_usage_score;
        let blended = match state.quiz_percentage() {
            Some(quiz) => {
                let weight = self.config.quiz_weight.clamp(0.0, 1.0);
                combined * (1.0 - weight) + quiz * weight
            }
            None => combined,
        };
        blended.round().clamp(0.0, 100.0)
    }

    /// Fraction of required actions performed, 1.0 when none are required.
    pub fn required_fraction(&self, lesson: &Lesson, state: &ScoreState) -> f64 {
        let required = lesson.required_actions();
        if required.is_empty() {
            return 1.0;
        }
        let done = required
            .iter()
            .filter(|a| state.required_actions_completed.contains(a))
            .count();
        done as f64 / required.len() as f64
    }

    /// Automatic completion check, run after every action and quiz score.
    pub fn check_completion(&self, lesson: &Lesson, state: &ScoreState) -> Option<CompletionReason> {
        let has_quiz = !state.quiz_scores.is_empty();

        if !lesson.required_actions().is_empty() {
            let enough = self.required_fraction(lesson, state) >= self.config.required_action_threshold;
            return (enough && (!lesson.requires_quiz() || has_quiz))
                .then_some(CompletionReason::RequiredActions);
        }

        if !state.content_fully_viewed() {
            return None;
        }
        if !lesson.requires_quiz() {
            Some(CompletionReason::SliderOnly)
        } else if has_quiz {
            Some(CompletionReason::Quiz)
        } else {
            None
        }
    }

    /// Build the completion record for `lesson`.
    pub fn finalize(
        &self,
        lesson: &Lesson,
        state: &ScoreState,
        reason: CompletionReason,
    ) -> CompletionRecord {
        let final_score = match reason {
            CompletionReason::SliderOnly => SLIDER_ONLY_SCORE,
            _ => self.final_score(state),
        };
        CompletionRecord {
            lesson_id: lesson.id().clone(),
            lesson_title: lesson.title().to_string(),
            completed_at: Utc::now(),
            snapshot: self.breakdown(state),
            score: LessonScore {
                final_score,
                grade: self.scale.grade(final_score),
            },
            reason,
        }
    }
}

/// Read a non-negative count from the first key present.
fn count_param(params: &ActionParams, keys: &[&str]) -> Option<u32> {
    keys.iter().find_map(|key| {
        let value = params.get(*key)?;
        let n = value
            .as_u64()
            .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))?;
        Some(u32::try_from(n).unwrap_or(u32::MAX))
    })
}
