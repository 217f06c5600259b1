//! Active and completed lesson sets for one session.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{EngineError, Result};
use crate::lesson::{Lesson, LessonId};
use crate::scoring::{CompletionRecord, CompletionTracker, LessonPhase, ScoreState};

/// Per-session state of one condition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionState {
    pub is_met: bool,
    pub fire_count: u32,
    pub met_at: Option<DateTime<Utc>>,
}

/// A lesson in the active set together with its progress.
#[derive(Debug, Clone)]
pub struct ActiveLesson {
    lesson: Arc<Lesson>,
    /// Indexed by condition position in `lesson`.
    conditions: Vec<ConditionState>,
    fired_actions: BTreeSet<String>,
    elapsed_time: f64,
    pub(crate) score: ScoreState,
    activated_at: DateTime<Utc>,
}

impl ActiveLesson {
    fn new(lesson: Arc<Lesson>, score: ScoreState) -> Self {
        Self {
            conditions: vec![ConditionState::default(); lesson.conditions().len()],
            lesson,
            fired_actions: BTreeSet::new(),
            elapsed_time: 0.0,
            score,
            activated_at: Utc::now(),
        }
    }

    /// Swap in a new definition, carrying met flags over by condition id.
    fn redefine(&mut self, lesson: Arc<Lesson>) {
        let conditions = lesson
            .conditions()
            .iter()
            .map(|c| {
                self.lesson
                    .condition_index(&c.id)
                    .and_then(|i| self.conditions.get(i).cloned())
                    .unwrap_or_default()
            })
            .collect();
        self.conditions = conditions;
        if let Some(total) = lesson.total_slides() {
            self.score.total_slides = Some(total);
        }
        self.lesson = lesson;
    }

    pub fn lesson(&self) -> &Arc<Lesson> {
        &self.lesson
    }

    pub fn id(&self) -> &LessonId {
        self.lesson.id()
    }

    pub fn condition_states(&self) -> &[ConditionState] {
        &self.conditions
    }

    pub fn is_met(&self, condition_id: &str) -> bool {
        self.lesson
            .condition_index(condition_id)
            .and_then(|i| self.conditions.get(i))
            .is_some_and(|s| s.is_met)
    }

    pub fn met_count(&self) -> usize {
        self.conditions.iter().filter(|s| s.is_met).count()
    }

    pub fn total_count(&self) -> usize {
        self.conditions.len()
    }

    /// Ids of met conditions in definition order.
    pub fn met_condition_ids(&self) -> Vec<String> {
        self.lesson
            .conditions()
            .iter()
            .zip(&self.conditions)
            .filter(|(_, state)| state.is_met)
            .map(|(c, _)| c.id.clone())
            .collect()
    }

    pub fn fired_actions(&self) -> &BTreeSet<String> {
        &self.fired_actions
    }

    pub fn elapsed_time(&self) -> f64 {
        self.elapsed_time
    }

    pub fn score(&self) -> &ScoreState {
        &self.score
    }

    pub fn phase(&self) -> LessonPhase {
        self.score.phase
    }

    pub fn activated_at(&self) -> DateTime<Utc> {
        self.activated_at
    }

    /// Mark the condition at `index` met. Returns false if it already was.
    pub(crate) fn mark_met(&mut self, index: usize) -> bool {
        let Some(state) = self.conditions.get_mut(index) else {
            return false;
        };
        if state.is_met {
            return false;
        }
        state.is_met = true;
        state.fire_count += 1;
        state.met_at = Some(Utc::now());
        if let Some(condition) = self.lesson.conditions().get(index) {
            self.fired_actions.insert(condition.action_type.clone());
        }
        true
    }

    /// Mark the condition at `index` met from saved progress.
    ///
    /// Unlike [`mark_met`](Self::mark_met) this records no fire: the
    /// reaction ran in an earlier session.
    pub(crate) fn restore_met(&mut self, index: usize) -> bool {
        let Some(state) = self.conditions.get_mut(index) else {
            return false;
        };
        if state.is_met {
            return false;
        }
        state.is_met = true;
        if let Some(condition) = self.lesson.conditions().get(index) {
            self.fired_actions.insert(condition.action_type.clone());
        }
        true
    }

    pub(crate) fn add_elapsed(&mut self, seconds: f64) {
        if seconds.is_finite() && seconds > 0.0 {
            self.elapsed_time += seconds;
        }
    }

    pub(crate) fn set_elapsed(&mut self, seconds: f64) {
        if seconds.is_finite() && seconds >= 0.0 {
            self.elapsed_time = seconds;
        }
    }
}

/// Active set (activation order) and completed set.
///
/// The two sets are disjoint: completing a lesson removes it from the
/// active set and completed lessons cannot be reactivated.
#[derive(Debug, Default)]
pub struct LessonRegistry {
    active: Vec<ActiveLesson>,
    completed: Vec<CompletionRecord>,
}

impl LessonRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `lesson` to the active set.
    ///
    /// Reactivating an active lesson replaces its definition but keeps met
    /// flags, fired actions, elapsed time and scores.
    pub fn activate(
        &mut self,
        lesson: Arc<Lesson>,
        tracker: &CompletionTracker,
    ) -> Result<&mut ActiveLesson> {
        if !lesson.id().is_well_formed() {
            warn!(lesson_title = %lesson.title(), "Rejecting lesson without id");
            return Err(EngineError::InvalidLesson(format!(
                "lesson '{}' has an empty id",
                lesson.title()
            )));
        }
        if self.is_completed(lesson.id()) {
            return Err(EngineError::AlreadyCompleted(lesson.id().to_string()));
        }

        let index = match self.position(lesson.id()) {
            Some(index) => {
                debug!(lesson_id = %lesson.id(), "Lesson already active, refreshing definition");
                self.active[index].redefine(lesson);
                index
            }
            None => {
                info!(
                    lesson_id = %lesson.id(),
                    conditions = lesson.conditions().len(),
                    "Lesson activated"
                );
                let score = tracker.initial_state(&lesson);
                self.active.push(ActiveLesson::new(lesson, score));
                self.active.len() - 1
            }
        };
        Ok(&mut self.active[index])
    }

    /// Remove a lesson from the active set; no-op when absent.
    pub fn deactivate(&mut self, id: &LessonId) -> Option<ActiveLesson> {
        let index = self.position(id)?;
        debug!(lesson_id = %id, "Lesson deactivated");
        Some(self.active.remove(index))
    }

    /// Move a lesson into the completed set.
    ///
    /// Returns false when the lesson was already completed.
    pub fn complete(&mut self, record: CompletionRecord) -> bool {
        if self.is_completed(&record.lesson_id) {
            return false;
        }
        if let Some(index) = self.position(&record.lesson_id) {
            self.active.remove(index);
        }
        self.completed.push(record);
        true
    }

    /// Forget all progress for a lesson, including its completion.
    pub fn reset(&mut self, id: &LessonId) -> bool {
        let was_active = self.deactivate(id).is_some();
        let before = self.completed.len();
        self.completed.retain(|r| &r.lesson_id != id);
        let reset = was_active || self.completed.len() != before;
        if reset {
            info!(lesson_id = %id, "Lesson reset");
        }
        reset
    }

    pub fn is_active(&self, id: &LessonId) -> bool {
        self.position(id).is_some()
    }

    pub fn is_completed(&self, id: &LessonId) -> bool {
        self.completed.iter().any(|r| &r.lesson_id == id)
    }

    pub fn has_active(&self) -> bool {
        !self.active.is_empty()
    }

    pub fn get(&self, id: &LessonId) -> Option<&ActiveLesson> {
        self.active.iter().find(|a| a.id() == id)
    }

    pub fn get_mut(&mut self, id: &LessonId) -> Option<&mut ActiveLesson> {
        self.active.iter_mut().find(|a| a.id() == id)
    }

    pub fn active(&self) -> &[ActiveLesson] {
        &self.active
    }

    pub(crate) fn active_mut(&mut self) -> impl Iterator<Item = &mut ActiveLesson> {
        self.active.iter_mut()
    }

    pub fn completed(&self) -> &[CompletionRecord] {
        &self.completed
    }

    pub fn completion_record(&self, id: &LessonId) -> Option<&CompletionRecord> {
        self.completed.iter().find(|r| &r.lesson_id == id)
    }

    fn position(&self, id: &LessonId) -> Option<usize> {
        self.active.iter().position(|a| a.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lesson::Condition;
    use crate::reaction::Reaction;
    use crate::scoring::CompletionReason;

    fn lesson(id: &str) -> Arc<Lesson> {
        Arc::new(
            Lesson::new(id, id.to_uppercase())
                .with_condition(Condition::new("deposit_made", Reaction::message("A", "a")))
                .with_condition(Condition::new("bill_paid", Reaction::message("B", "b"))),
        )
    }

    fn record(id: &str) -> CompletionRecord {
        let tracker = CompletionTracker::default();
        let lesson = lesson(id);
        tracker.finalize(&lesson, &tracker.initial_state(&lesson), CompletionReason::Explicit)
    }

    #[test]
    fn activation_order_is_preserved() {
        let tracker = CompletionTracker::default();
        let mut registry = LessonRegistry::new();
        for id in ["c", "a", "b"] {
            registry.activate(lesson(id), &tracker).unwrap();
        }
        let ids: Vec<_> = registry.active().iter().map(|a| a.id().as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn empty_id_is_rejected() {
        let tracker = CompletionTracker::default();
        let mut registry = LessonRegistry::new();
        let result = registry.activate(Arc::new(Lesson::new(" ", "Blank")), &tracker);
        assert!(matches!(result, Err(EngineError::InvalidLesson(_))));
        assert!(!registry.has_active());
    }

    #[test]
    fn reactivation_keeps_progress() {
        let tracker = CompletionTracker::default();
        let mut registry = LessonRegistry::new();
        let active = registry.activate(lesson("savings"), &tracker).unwrap();
        assert!(active.mark_met(1));
        active.add_elapsed(12.5);

        let active = registry.activate(lesson("savings"), &tracker).unwrap();
        assert!(active.is_met("bill_paid#1"));
        assert!(!active.is_met("deposit_made#0"));
        assert_eq!(active.elapsed_time(), 12.5);
        assert_eq!(active.fired_actions().len(), 1);
        assert_eq!(registry.active().len(), 1);
    }

    #[test]
    fn reactivation_adopts_new_slide_count() {
        let tracker = CompletionTracker::default();
        let mut registry = LessonRegistry::new();
        let four = Arc::new(Lesson::new("x", "X").with_total_slides(4));
        registry.activate(four, &tracker).unwrap();

        let two = Arc::new(Lesson::new("x", "X").with_total_slides(2));
        let active = registry.activate(two, &tracker).unwrap();
        assert_eq!(active.score().total_slides, Some(2));

        let untouched = Arc::new(Lesson::new("x", "X"));
        let active = registry.activate(untouched, &tracker).unwrap();
        assert_eq!(active.score().total_slides, Some(2));
    }

    #[test]
    fn restore_met_records_no_fire() {
        let tracker = CompletionTracker::default();
        let mut registry = LessonRegistry::new();
        let active = registry.activate(lesson("x"), &tracker).unwrap();

        assert!(active.restore_met(1));
        assert!(!active.restore_met(1));
        assert!(!active.mark_met(1));
        let state = &active.condition_states()[1];
        assert!(state.is_met);
        assert_eq!(state.fire_count, 0);
        assert!(state.met_at.is_none());
        assert!(active.fired_actions().contains("show_message"));
    }

    #[test]
    fn mark_met_is_idempotent() {
        let tracker = CompletionTracker::default();
        let mut registry = LessonRegistry::new();
        let active = registry.activate(lesson("x"), &tracker).unwrap();

        assert!(active.mark_met(0));
        assert!(!active.mark_met(0));
        assert!(!active.mark_met(9));
        assert_eq!(active.condition_states()[0].fire_count, 1);
        assert_eq!(active.met_condition_ids(), vec!["deposit_made#0"]);
    }

    #[test]
    fn completed_lessons_cannot_reactivate() {
        let tracker = CompletionTracker::default();
        let mut registry = LessonRegistry::new();
        registry.activate(lesson("intro"), &tracker).unwrap();

        assert!(registry.complete(record("intro")));
        assert!(!registry.is_active(&LessonId::from("intro")));
        assert!(registry.is_completed(&LessonId::from("intro")));
        assert!(!registry.complete(record("intro")));

        let result = registry.activate(lesson("intro"), &tracker);
        assert!(matches!(result, Err(EngineError::AlreadyCompleted(_))));
    }

    #[test]
    fn reset_clears_both_sets() {
        let tracker = CompletionTracker::default();
        let mut registry = LessonRegistry::new();
        registry.activate(lesson("a"), &tracker).unwrap();
        registry.complete(record("b"));

        assert!(registry.reset(&LessonId::from("a")));
        assert!(registry.reset(&LessonId::from("b")));
        assert!(!registry.reset(&LessonId::from("c")));
        assert!(!registry.has_active());
        assert!(registry.completed().is_empty());
    }

    #[test]
    fn deactivate_absent_is_noop() {
        let mut registry = LessonRegistry::new();
        assert!(registry.deactivate(&LessonId::from("nope")).is_none());
    }
}
