//! Lesson session: the owner of all per-student engine state.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::lesson::{ActionParams, Lesson, LessonId};
use crate::matcher::{self, ActionOutcome};
use crate::reaction::ReactionDispatcher;
use crate::registry::{ActiveLesson, LessonRegistry};
use crate::scoring::{
    CompletionReason, CompletionRecord, CompletionTracker, LessonScore, LessonStartValidation,
    QuizScore, ScoreBreakdown, ScoreState,
};
use crate::snapshot::{ActiveLessonSnapshot, SessionSnapshot};

/// Session shared between event handlers and the telemetry reporter.
pub type SharedSession = Arc<RwLock<LessonSession>>;

/// Unique identifier for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Create a new session ID with a UUIDv7 (time-ordered).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One student's lesson engine.
///
/// All inbound calls go through `&mut self`; wrap in [`SharedSession`] to
/// share across tasks.
#[derive(Debug)]
pub struct LessonSession {
    id: SessionId,
    student_name: String,
    registry: LessonRegistry,
    dispatcher: ReactionDispatcher,
    tracker: CompletionTracker,
}

impl LessonSession {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            id: SessionId::new(),
            student_name: config.session.student_name.clone(),
            registry: LessonRegistry::new(),
            dispatcher: ReactionDispatcher::new(),
            tracker: CompletionTracker::new(config.scoring.clone(), config.grading.scale),
        }
    }

    #[must_use]
    pub fn with_dispatcher(mut self, dispatcher: ReactionDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: SessionId) -> Self {
        self.id = id;
        self
    }

    pub fn into_shared(self) -> SharedSession {
        Arc::new(RwLock::new(self))
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn student_name(&self) -> &str {
        &self.student_name
    }

    pub fn dispatcher_mut(&mut self) -> &mut ReactionDispatcher {
        &mut self.dispatcher
    }

    pub fn tracker(&self) -> &CompletionTracker {
        &self.tracker
    }

    /// Add a lesson to the active set.
    pub fn activate_lesson(&mut self, lesson: Arc<Lesson>) -> Result<()> {
        self.registry.activate(lesson, &self.tracker).map(|_| ())
    }

    /// Remove a lesson from the active set. Returns whether it was active.
    pub fn deactivate_lesson(&mut self, id: &LessonId) -> bool {
        self.registry.deactivate(id).is_some()
    }

    /// Check whether a student may enter `lesson`.
    pub fn validate_lesson_start(&self, lesson: &Lesson) -> LessonStartValidation {
        let total = lesson.conditions().len();
        if let Some(record) = self.registry.completion_record(lesson.id()) {
            return LessonStartValidation::completed(record.clone(), total);
        }
        match self.registry.get(lesson.id()) {
            Some(active) => LessonStartValidation::from_progress(true, active.met_count(), total),
            None => LessonStartValidation::from_progress(false, 0, total),
        }
    }

    /// Validate, then activate when allowed. A blocked start changes nothing.
    pub fn start_lesson(&mut self, lesson: Arc<Lesson>) -> Result<LessonStartValidation> {
        let validation = self.validate_lesson_start(&lesson);
        if validation.should_proceed {
            self.activate_lesson(lesson)?;
        } else {
            info!(lesson_id = %lesson.id(), status = %validation.status, "Lesson start blocked");
        }
        Ok(validation)
    }

    /// Feed one in-app action through the engine.
    pub fn process_action(&mut self, action_type: &str, params: &ActionParams) -> ActionOutcome {
        matcher::process_action(
            &mut self.registry,
            &self.tracker,
            &self.dispatcher,
            action_type,
            params,
        )
    }

    /// Record a mistake against every active lesson.
    ///
    /// Returns the number of lessons affected.
    pub fn record_lesson_mistake(&mut self, mistake_type: &str, details: Value) -> usize {
        let mut affected = 0;
        for active in self.registry.active_mut() {
            self.tracker
                .record_mistake(&mut active.score, mistake_type, details.clone());
            debug!(
                lesson_id = %active.id(),
                mistake_type,
                app_usage_score = active.score.app_usage_score,
                "Mistake recorded"
            );
            affected += 1;
        }
        if affected == 0 {
            debug!(mistake_type, "No active lessons, mistake ignored");
        }
        affected
    }

    /// Record a quiz score against every active lesson and check completion.
    pub fn add_quiz_score(
        &mut self,
        earned: f64,
        possible: f64,
        label: impl Into<String>,
    ) -> Vec<CompletionRecord> {
        let quiz = QuizScore::new(earned, possible, label);
        let mut finished = Vec::new();

        for active in self.registry.active_mut() {
            if !self.tracker.add_quiz_score(&mut active.score, quiz.clone()) {
                continue;
            }
            let lesson = Arc::clone(active.lesson());
            if let Some(reason) = self.tracker.check_completion(&lesson, &active.score) {
                finished.push(self.tracker.finalize(&lesson, &active.score, reason));
            }
        }

        finished
            .into_iter()
            .filter(|record| self.registry.complete(record.clone()))
            .inspect(|record| {
                info!(
                    lesson_id = %record.lesson_id,
                    reason = %record.reason,
                    score = record.score.final_score,
                    "Lesson completed"
                );
            })
            .collect()
    }

    /// Complete an active lesson on the caller's behalf, as a completion
    /// reaction would.
    pub fn complete_lesson(&mut self, id: &LessonId) -> Result<CompletionRecord> {
        if self.registry.is_completed(id) {
            return Err(EngineError::AlreadyCompleted(id.to_string()));
        }
        let active = self
            .registry
            .get(id)
            .ok_or_else(|| EngineError::LessonNotActive(id.to_string()))?;

        let record = self
            .tracker
            .finalize(active.lesson(), active.score(), CompletionReason::Explicit);
        self.registry.complete(record.clone());
        info!(
            lesson_id = %id,
            score = record.score.final_score,
            "Lesson completed by caller"
        );
        Ok(record)
    }

    /// Accumulate elapsed seconds on every active lesson.
    pub fn tick(&mut self, seconds: f64) {
        for active in self.registry.active_mut() {
            active.add_elapsed(seconds);
        }
    }

    /// Forget all progress for a lesson (admin/debug).
    pub fn reset_lesson(&mut self, id: &LessonId) -> bool {
        self.registry.reset(id)
    }

    pub fn is_active(&self, id: &LessonId) -> bool {
        self.registry.is_active(id)
    }

    pub fn is_completed(&self, id: &LessonId) -> bool {
        self.registry.is_completed(id)
    }

    pub fn completed_records(&self) -> &[CompletionRecord] {
        self.registry.completed()
    }

    pub fn completion_record(&self, id: &LessonId) -> Option<&CompletionRecord> {
        self.registry.completion_record(id)
    }

    pub fn active_lessons(&self) -> &[ActiveLesson] {
        self.registry.active()
    }

    pub fn active_lesson(&self, id: &LessonId) -> Option<&ActiveLesson> {
        self.registry.get(id)
    }

    pub fn score_state(&self, id: &LessonId) -> Option<&ScoreState> {
        self.registry.get(id).map(ActiveLesson::score)
    }

    /// Running score components of an active lesson.
    pub fn breakdown(&self, id: &LessonId) -> Option<ScoreBreakdown> {
        self.score_state(id).map(|s| self.tracker.breakdown(s))
    }

    /// Score the lesson would receive if it completed now.
    pub fn current_score(&self, id: &LessonId) -> Option<LessonScore> {
        self.score_state(id).map(|state| {
            let final_score = self.tracker.final_score(state);
            LessonScore {
                final_score,
                grade: self.tracker.scale().grade(final_score),
            }
        })
    }

    /// Capture active and completed lessons.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            active_lessons: self
                .registry
                .active()
                .iter()
                .map(ActiveLessonSnapshot::from)
                .collect(),
            completed_lessons: self.registry.completed().to_vec(),
        }
    }

    /// Reactivate `lesson` from persisted state without firing reactions.
    pub fn resume(&mut self, lesson: Arc<Lesson>, saved: &ActiveLessonSnapshot) -> Result<()> {
        if &saved.id != lesson.id() {
            return Err(EngineError::InvalidLesson(format!(
                "snapshot for '{}' does not match lesson '{}'",
                saved.id,
                lesson.id()
            )));
        }

        let active = self.registry.activate(lesson, &self.tracker)?;
        active.set_elapsed(saved.elapsed_time);

        let mut restored = 0;
        for condition_id in &saved.met_conditions {
            match active.lesson().condition_index(condition_id) {
                Some(index) => {
                    if active.restore_met(index) {
                        restored += 1;
                    }
                }
                None => warn!(
                    lesson_id = %saved.id,
                    condition_id = %condition_id,
                    "Unknown condition in snapshot, ignored"
                ),
            }
        }

        info!(
            lesson_id = %saved.id,
            elapsed_time = saved.elapsed_time,
            restored,
            "Lesson resumed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lesson::{Condition, action_params};
    use crate::reaction::Reaction;
    use crate::scoring::StartStatus;
    use serde_json::json;

    fn session() -> LessonSession {
        LessonSession::new(&EngineConfig::default())
    }

    fn three_conditions() -> Arc<Lesson> {
        Arc::new(
            Lesson::new("budgeting", "Budgeting")
                .with_condition(Condition::new("bill_created", Reaction::message("1", "one")))
                .with_condition(Condition::new("bill_paid", Reaction::message("2", "two")))
                .with_condition(Condition::new("budget_set", Reaction::message("3", "three")))
                .with_required_actions(["bill_created", "bill_paid", "budget_set"]),
        )
    }

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
        assert_eq!(session().student_name(), "student");
    }

    #[test]
    fn start_lesson_new_then_in_progress() {
        let mut session = session();
        let lesson = three_conditions();

        let first = session.start_lesson(Arc::clone(&lesson)).unwrap();
        assert_eq!(first.status, StartStatus::New);
        assert!(session.is_active(lesson.id()));

        let second = session.start_lesson(lesson).unwrap();
        assert_eq!(second.status, StartStatus::InProgress);
    }

    #[test]
    fn partial_resume_reports_progress() {
        let mut session = session();
        let lesson = three_conditions();
        let saved = ActiveLessonSnapshot {
            id: lesson.id().clone(),
            title: lesson.title().to_string(),
            elapsed_time: 90.0,
            met_conditions: vec!["bill_paid#1".to_string(), "missing#9".to_string()],
        };

        session.resume(Arc::clone(&lesson), &saved).unwrap();
        let validation = session.validate_lesson_start(&lesson);

        assert_eq!(validation.status, StartStatus::Partial);
        assert!(validation.should_proceed);
        assert_eq!(validation.completed_count, 1);
        assert_eq!(validation.total_count, 3);
        assert_eq!(
            session.active_lesson(lesson.id()).unwrap().elapsed_time(),
            90.0
        );
    }

    #[test]
    fn resumed_conditions_do_not_refire() {
        let mut session = session();
        let lesson = three_conditions();
        let saved = ActiveLessonSnapshot {
            id: lesson.id().clone(),
            title: String::new(),
            elapsed_time: 0.0,
            met_conditions: vec!["bill_created#0".to_string()],
        };
        session.resume(lesson, &saved).unwrap();

        let active = session.active_lesson(&LessonId::from("budgeting")).unwrap();
        let state = &active.condition_states()[0];
        assert!(state.is_met);
        assert_eq!(state.fire_count, 0);

        let outcome = session.process_action("bill_created", &ActionParams::new());
        assert!(outcome.fired.is_empty());
    }

    #[test]
    fn duplicate_condition_ids_survive_snapshot_round_trip() {
        let lesson = Arc::new(
            Lesson::new("bills", "Bills")
                .with_condition(
                    Condition::new("deposit_made", Reaction::message("1", "one")).with_id("c"),
                )
                .with_condition(
                    Condition::new("bill_paid", Reaction::message("2", "two")).with_id("c"),
                ),
        );

        let mut first = session();
        first.activate_lesson(Arc::clone(&lesson)).unwrap();
        assert_eq!(first.process_action("bill_paid", &ActionParams::new()).fired.len(), 1);
        let snapshot = first.snapshot();
        let saved = &snapshot.active_lessons[0];
        assert_eq!(saved.met_conditions, vec!["bill_paid#1"]);

        let mut second = session();
        second.resume(lesson, saved).unwrap();
        let outcome = second.process_action("bill_paid", &ActionParams::new());
        assert!(outcome.fired.is_empty());
        assert_eq!(second.process_action("deposit_made", &ActionParams::new()).fired.len(), 1);
    }

    #[test]
    fn resume_rejects_mismatched_snapshot() {
        let mut session = session();
        let saved = ActiveLessonSnapshot {
            id: LessonId::from("other"),
            title: String::new(),
            elapsed_time: 0.0,
            met_conditions: vec![],
        };
        let result = session.resume(three_conditions(), &saved);
        assert!(matches!(result, Err(EngineError::InvalidLesson(_))));
    }

    #[test]
    fn completed_lesson_blocks_start() {
        let mut session = session();
        let lesson = Arc::new(Lesson::new("intro", "Intro").with_total_slides(3));
        session.activate_lesson(Arc::clone(&lesson)).unwrap();
        session.process_action(
            "lesson_content_viewed",
            &action_params(json!({"slidesViewed": 3, "totalSlides": 3})),
        );
        assert!(session.is_completed(lesson.id()));

        let validation = session.start_lesson(Arc::clone(&lesson)).unwrap();
        assert_eq!(validation.status, StartStatus::Completed);
        assert!(!validation.should_proceed);
        assert!(!session.is_active(lesson.id()));
        assert_eq!(session.completed_records().len(), 1);
    }

    #[test]
    fn mistakes_apply_to_active_lessons() {
        let mut session = session();
        assert_eq!(session.record_lesson_mistake("overdraft", json!({})), 0);

        session.activate_lesson(three_conditions()).unwrap();
        assert_eq!(session.record_lesson_mistake("overdraft", json!({})), 1);

        let state = session.score_state(&LessonId::from("budgeting")).unwrap();
        assert_eq!(state.app_usage_score, 65.0);
    }

    #[test]
    fn quiz_completes_quiz_lesson() {
        let mut session = session();
        let lesson = Arc::new(
            Lesson::new("quiz", "Quiz")
                .with_total_slides(1)
                .requiring_quiz(),
        );
        session.activate_lesson(Arc::clone(&lesson)).unwrap();
        session.process_action(
            "lesson_content_viewed",
            &action_params(json!({"slidesViewed": 1})),
        );
        assert!(session.is_active(lesson.id()));

        let completed = session.add_quiz_score(10.0, 10.0, "final");
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].score.final_score, 100.0);
        assert!(session.is_completed(lesson.id()));
    }

    #[test]
    fn complete_lesson_requires_active_lesson() {
        let mut session = session();
        let lesson = three_conditions();

        let result = session.complete_lesson(lesson.id());
        assert!(matches!(result, Err(EngineError::LessonNotActive(_))));

        session.activate_lesson(Arc::clone(&lesson)).unwrap();
        session.record_lesson_mistake("overdraft", json!({}));
        let record = session.complete_lesson(lesson.id()).unwrap();
        assert_eq!(record.reason, CompletionReason::Explicit);
        assert_eq!(record.score.final_score, 65.0);
        assert!(session.is_completed(lesson.id()));

        let again = session.complete_lesson(lesson.id());
        assert!(matches!(again, Err(EngineError::AlreadyCompleted(_))));
    }

    #[test]
    fn tick_accumulates_elapsed_time() {
        let mut session = session();
        session.activate_lesson(three_conditions()).unwrap();
        session.tick(1.0);
        session.tick(2.5);
        session.tick(-4.0);

        let snapshot = session.snapshot();
        assert_eq!(snapshot.active_lessons[0].elapsed_time, 3.5);
    }

    #[test]
    fn current_score_reflects_state() {
        let mut session = session();
        let lesson = three_conditions();
        session.activate_lesson(Arc::clone(&lesson)).unwrap();

        let score = session.current_score(lesson.id()).unwrap();
        assert_eq!(score.final_score, 70.0);
        assert!(session.current_score(&LessonId::from("nope")).is_none());
    }
}
