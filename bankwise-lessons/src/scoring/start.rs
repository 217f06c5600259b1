//! Lesson (re)entry validation.

use serde::{Deserialize, Serialize};

use super::record::CompletionRecord;

/// Where a student stands on entering a lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartStatus {
    /// Never started.
    New,
    /// Some but not all conditions met.
    Partial,
    /// Active with nothing met yet.
    InProgress,
    /// Already completed; entry is blocked.
    Completed,
}

impl StartStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StartStatus::New => "new",
            StartStatus::Partial => "partial",
            StartStatus::InProgress => "in_progress",
            StartStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for StartStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of checking whether a lesson may be (re)entered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonStartValidation {
    pub status: StartStatus,
    pub should_proceed: bool,
    pub completed_count: usize,
    pub total_count: usize,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<CompletionRecord>,
}

impl LessonStartValidation {
    /// Blocked entry into a completed lesson.
    pub fn completed(record: CompletionRecord, total_count: usize) -> Self {
        let message = format!(
            "You have already completed '{}' with a score of {} ({}).",
            record.lesson_title, record.score.final_score, record.score.grade
        );
        Self {
            status: StartStatus::Completed,
            should_proceed: false,
            completed_count: total_count,
            total_count,
            message,
            record: Some(record),
        }
    }

    /// Entry into a lesson that is not completed.
    ///
    /// `active` says whether the lesson is currently in the active set.
    pub fn from_progress(active: bool, met: usize, total: usize) -> Self {
        let (status, message) = if met > 0 && met < total {
            (
                StartStatus::Partial,
                format!("Welcome back! You have completed {met} of {total} steps."),
            )
        } else if active {
            (
                StartStatus::InProgress,
                "Continue where you left off.".to_string(),
            )
        } else {
            (StartStatus::New, "Starting a new lesson.".to_string())
        };

        Self {
            status,
            should_proceed: true,
            completed_count: met,
            total_count: total,
            message,
            record: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lesson::LessonId;
    use crate::scoring::{CompletionReason, Grade, LessonScore, ScoreBreakdown};
    use chrono::Utc;

    #[test]
    fn partial_progress_proceeds() {
        let validation = LessonStartValidation::from_progress(true, 1, 3);
        assert_eq!(validation.status, StartStatus::Partial);
        assert!(validation.should_proceed);
        assert_eq!(validation.completed_count, 1);
        assert_eq!(validation.total_count, 3);
    }

    #[test]
    fn new_and_in_progress() {
        assert_eq!(
            LessonStartValidation::from_progress(false, 0, 3).status,
            StartStatus::New
        );
        assert_eq!(
            LessonStartValidation::from_progress(true, 0, 3).status,
            StartStatus::InProgress
        );
        assert_eq!(
            LessonStartValidation::from_progress(true, 3, 3).status,
            StartStatus::InProgress
        );
    }

    #[test]
    fn completed_blocks() {
        let record = CompletionRecord {
            lesson_id: LessonId::from("intro"),
            lesson_title: "Intro".to_string(),
            completed_at: Utc::now(),
            snapshot: ScoreBreakdown::default(),
            score: LessonScore {
                final_score: 92.0,
                grade: Grade::A,
            },
            reason: CompletionReason::Explicit,
        };
        let validation = LessonStartValidation::completed(record, 2);

        assert_eq!(validation.status, StartStatus::Completed);
        assert!(!validation.should_proceed);
        assert!(validation.message.contains("92"));
        assert!(validation.record.is_some());

        let json = serde_json::to_value(&validation).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["shouldProceed"], false);
    }
}
