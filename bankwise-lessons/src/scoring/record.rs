//! Completion records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::grade::Grade;
use crate::lesson::LessonId;

/// Why a lesson completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    /// A completion reaction fired.
    Explicit,
    /// Enough required actions were performed.
    RequiredActions,
    /// No required actions; all content viewed.
    SliderOnly,
    /// No required actions; content viewed and a quiz was taken.
    Quiz,
}

impl CompletionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionReason::Explicit => "explicit",
            CompletionReason::RequiredActions => "required_actions",
            CompletionReason::SliderOnly => "slider_only",
            CompletionReason::Quiz => "quiz",
        }
    }
}

impl std::fmt::Display for CompletionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Score components at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub content_score: f64,
    pub app_usage_score: f64,
    pub combined_score: f64,
    /// Aggregate quiz percentage, when any quiz was recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz_percentage: Option<f64>,
    pub quiz_count: usize,
    pub mistake_count: usize,
    #[serde(default)]
    pub positive_conditions_met: Vec<String>,
    #[serde(default)]
    pub negative_conditions_triggered: Vec<String>,
    #[serde(default)]
    pub required_actions_completed: Vec<String>,
}

/// Final numeric score and its grade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonScore {
    pub final_score: f64,
    pub grade: Grade,
}

/// Immutable record of a completed lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRecord {
    pub lesson_id: LessonId,
    pub lesson_title: String,
    pub completed_at: DateTime<Utc>,
    pub snapshot: ScoreBreakdown,
    pub score: LessonScore,
    pub reason: CompletionReason,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_serializes_camel_case() {
        let record = CompletionRecord {
            lesson_id: LessonId::from("intro"),
            lesson_title: "Intro".to_string(),
            completed_at: Utc::now(),
            snapshot: ScoreBreakdown {
                content_score: 30.0,
                app_usage_score: 70.0,
                combined_score: 100.0,
                ..ScoreBreakdown::default()
            },
            score: LessonScore {
                final_score: 100.0,
                grade: Grade::A,
            },
            reason: CompletionReason::SliderOnly,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["lessonId"], "intro");
        assert_eq!(json["score"]["finalScore"], 100.0);
        assert_eq!(json["score"]["grade"], "A");
        assert_eq!(json["snapshot"]["contentScore"], 30.0);
        assert_eq!(json["reason"], "slider_only");
        assert!(json["snapshot"].get("quizPercentage").is_none());

        let back: CompletionRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
