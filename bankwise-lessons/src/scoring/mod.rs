//! Completion detection, scoring and grading.

mod grade;
mod record;
mod start;
mod tracker;

pub use grade::{Grade, GradeScale, score_to_grade, score_to_plus_minus_grade};
pub use record::{CompletionReason, CompletionRecord, LessonScore, ScoreBreakdown};
pub use start::{LessonStartValidation, StartStatus};
pub use tracker::{
    CompletionTracker, LESSON_CONTENT_VIEWED, LessonPhase, MistakeRecord, QuizScore, ScoreState,
};
