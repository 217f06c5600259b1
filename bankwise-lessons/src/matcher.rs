//! Condition matching.
//!
//! [`process_action`] is the single path by which an inbound action changes
//! lesson state: it updates content and required-action progress, marks
//! matching conditions met, dispatches their reactions and moves finished
//! lessons into the completed set.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, trace};

use crate::lesson::ActionParams;
use crate::reaction::{DispatchOutcome, ReactionDispatcher, ReactionInvocation};
use crate::registry::LessonRegistry;
use crate::scoring::{CompletionReason, CompletionRecord, CompletionTracker, LESSON_CONTENT_VIEWED};

/// One reaction fired by an action.
#[derive(Debug, Clone, PartialEq)]
pub struct FiredReaction {
    pub invocation: ReactionInvocation,
    pub outcome: DispatchOutcome,
}

/// Everything that happened in response to one action.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionOutcome {
    /// Reactions fired, in activation then condition order.
    pub fired: Vec<FiredReaction>,
    /// Lessons completed by this action.
    pub completed: Vec<CompletionRecord>,
}

impl ActionOutcome {
    /// Whether the action changed nothing observable.
    pub fn is_empty(&self) -> bool {
        self.fired.is_empty() && self.completed.is_empty()
    }
}

/// Run one action through every active lesson.
///
/// Guard mismatches and already-met conditions are skipped silently
/// (trace level); a condition fires at most once per session.
pub fn process_action(
    registry: &mut LessonRegistry,
    tracker: &CompletionTracker,
    dispatcher: &ReactionDispatcher,
    action_type: &str,
    params: &ActionParams,
) -> ActionOutcome {
    let mut outcome = ActionOutcome::default();

    if !registry.has_active() {
        debug!(action_type, "No active lessons, action ignored");
        return outcome;
    }

    let scope = lesson_scope(action_type, params);
    let mut finished = Vec::new();

    for active in registry.active_mut() {
        if scope.is_some_and(|id| id != active.id().as_str()) {
            continue;
        }

        let lesson = Arc::clone(active.lesson());
        tracker.observe_action(&lesson, &mut active.score, action_type, params);

        let mut explicit = false;
        for (index, condition) in lesson.conditions().iter().enumerate() {
            if condition.condition_type != action_type {
                continue;
            }
            if active.condition_states()[index].is_met {
                trace!(
                    lesson_id = %lesson.id(),
                    condition_id = %condition.id,
                    "Condition already met, skipping"
                );
                continue;
            }
            if let Some(guard) = &condition.guard
                && let Err(mismatch) = guard.evaluate(params)
            {
                trace!(
                    lesson_id = %lesson.id(),
                    condition_id = %condition.id,
                    %mismatch,
                    "Guard not satisfied"
                );
                continue;
            }

            if !active.mark_met(index) {
                continue;
            }
            tracker.record_condition(&mut active.score, condition);

            let invocation = ReactionInvocation {
                lesson_id: lesson.id().clone(),
                lesson_title: lesson.title().to_string(),
                condition_id: condition.id.clone(),
                action_type: condition.action_type.clone(),
                reaction: condition.reaction.clone(),
            };
            let dispatched = dispatcher.dispatch(&invocation);
            explicit |= dispatched == DispatchOutcome::CompletionRequested;

            debug!(
                lesson_id = %lesson.id(),
                condition_id = %condition.id,
                action_type = %condition.action_type,
                "Condition met"
            );
            outcome.fired.push(FiredReaction {
                invocation,
                outcome: dispatched,
            });
        }

        let reason = if explicit {
            Some(CompletionReason::Explicit)
        } else {
            tracker.check_completion(&lesson, &active.score)
        };
        if let Some(reason) = reason {
            finished.push(tracker.finalize(&lesson, &active.score, reason));
        }
    }

    for record in finished {
        if registry.complete(record.clone()) {
            info!(
                lesson_id = %record.lesson_id,
                reason = %record.reason,
                score = record.score.final_score,
                grade = %record.score.grade,
                "Lesson completed"
            );
            outcome.completed.push(record);
        }
    }

    outcome
}

/// Content events may name the lesson they belong to.
fn lesson_scope<'a>(action_type: &str, params: &'a ActionParams) -> Option<&'a str> {
    if action_type != LESSON_CONTENT_VIEWED {
        return None;
    }
    ["lessonId", "lesson_id"]
        .iter()
        .find_map(|key| params.get(*key).and_then(Value::as_str))
}
