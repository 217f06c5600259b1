//! Reaction dispatch.
//!
//! [`ReactionDispatcher`] maps each [`ReactionKind`] to a handler closure.
//! Display, challenge and content reactions are usually routed to a
//! [`ReactionRenderer`]; stub reactions only log. Completion reactions are
//! acted on by the completion tracker, so their handler is optional.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::payload::{ChallengeReaction, ContentReaction, DisplayReaction, Reaction, ReactionKind};
use crate::lesson::LessonId;

/// A reaction about to be invoked for a satisfied condition.
#[derive(Debug, Clone, PartialEq)]
pub struct ReactionInvocation {
    pub lesson_id: LessonId,
    pub lesson_title: String,
    pub condition_id: String,
    /// Action type as authored on the condition.
    pub action_type: String,
    pub reaction: Reaction,
}

impl ReactionInvocation {
    /// Outbound payload `{ title?, message?, ...details }`.
    pub fn payload(&self) -> Value {
        self.reaction.payload()
    }
}

/// Rendering collaborator for reactions that produce UI.
pub trait ReactionRenderer: Send + Sync {
    /// Show a transient message surface.
    fn display(&self, invocation: &ReactionInvocation, reaction: &DisplayReaction);

    /// Show an interactive challenge.
    fn challenge(&self, invocation: &ReactionInvocation, reaction: &ChallengeReaction);

    /// Append a content block to the lesson narrative.
    fn content(&self, invocation: &ReactionInvocation, reaction: &ContentReaction);
}

/// Handler invoked for one reaction kind.
pub type ReactionHandler = Box<dyn Fn(&ReactionInvocation) + Send + Sync>;

/// Result of dispatching one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A registered handler ran.
    Handled,
    /// The reaction asks for lesson completion.
    CompletionRequested,
    /// No handler registered for the kind; logged and skipped.
    Unhandled,
    /// The reaction never resolved at load time; logged and skipped.
    UnknownReaction,
}

/// Registry of reaction handlers keyed by kind.
pub struct ReactionDispatcher {
    handlers: HashMap<ReactionKind, ReactionHandler>,
}

impl Default for ReactionDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReactionDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.handlers.keys().collect();
        kinds.sort();
        f.debug_struct("ReactionDispatcher")
            .field("kinds", &kinds)
            .finish()
    }
}

impl ReactionDispatcher {
    /// Create a dispatcher with only the stub handler registered.
    pub fn new() -> Self {
        let mut dispatcher = Self {
            handlers: HashMap::new(),
        };
        dispatcher.register(ReactionKind::Stub, |invocation| {
            if let Reaction::Stub(stub) = &invocation.reaction {
                info!(
                    lesson_id = %invocation.lesson_id,
                    feature = stub.feature.as_deref().unwrap_or("unnamed"),
                    "Feature coming soon"
                );
            }
        });
        dispatcher
    }

    /// Create a dispatcher routing UI reactions to `renderer`.
    pub fn with_renderer(renderer: Arc<dyn ReactionRenderer>) -> Self {
        let mut dispatcher = Self::new();

        let display = Arc::clone(&renderer);
        dispatcher.register(ReactionKind::Display, move |invocation| {
            if let Reaction::Display(reaction) = &invocation.reaction {
                display.display(invocation, reaction);
            }
        });

        let challenge = Arc::clone(&renderer);
        dispatcher.register(ReactionKind::Challenge, move |invocation| {
            if let Reaction::Challenge(reaction) = &invocation.reaction {
                challenge.challenge(invocation, reaction);
            }
        });

        dispatcher.register(ReactionKind::Content, move |invocation| {
            if let Reaction::Content(reaction) = &invocation.reaction {
                renderer.content(invocation, reaction);
            }
        });

        dispatcher
    }

    /// Register (or replace) the handler for a kind.
    pub fn register<F>(&mut self, kind: ReactionKind, handler: F)
    where
        F: Fn(&ReactionInvocation) + Send + Sync + 'static,
    {
        self.handlers.insert(kind, Box::new(handler));
    }

    /// Whether a handler exists for `kind`.
    pub fn handles(&self, kind: ReactionKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Invoke the handler for one satisfied condition.
    ///
    /// Never panics on unknown or unhandled reactions; they are logged so a
    /// malformed lesson cannot stop evaluation of other lessons.
    pub fn dispatch(&self, invocation: &ReactionInvocation) -> DispatchOutcome {
        let Some(kind) = invocation.reaction.kind() else {
            if let Reaction::Unresolved { reason, .. } = &invocation.reaction {
                warn!(
                    lesson_id = %invocation.lesson_id,
                    condition_id = %invocation.condition_id,
                    action_type = %invocation.action_type,
                    reason = %reason,
                    "Unknown reaction, skipping"
                );
            }
            return DispatchOutcome::UnknownReaction;
        };

        let handler = self.handlers.get(&kind);
        if let Some(handler) = handler {
            debug!(
                lesson_id = %invocation.lesson_id,
                condition_id = %invocation.condition_id,
                kind = %kind,
                "Dispatching reaction"
            );
            handler(invocation);
        }

        match (kind, handler) {
            (ReactionKind::Complete, _) => DispatchOutcome::CompletionRequested,
            (_, Some(_)) => DispatchOutcome::Handled,
            (_, None) => {
                warn!(
                    lesson_id = %invocation.lesson_id,
                    action_type = %invocation.action_type,
                    kind = %kind,
                    "No handler registered for reaction kind"
                );
                DispatchOutcome::Unhandled
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingRenderer {
        calls: Mutex<Vec<String>>,
    }

    impl ReactionRenderer for RecordingRenderer {
        fn display(&self, _invocation: &ReactionInvocation, reaction: &DisplayReaction) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("display:{}", reaction.message));
        }

        fn challenge(&self, _invocation: &ReactionInvocation, reaction: &ChallengeReaction) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("challenge:{}", reaction.prompt));
        }

        fn content(&self, _invocation: &ReactionInvocation, reaction: &ContentReaction) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("content:{}", reaction.body));
        }
    }

    fn invocation(action_type: &str, details: serde_json::Value) -> ReactionInvocation {
        ReactionInvocation {
            lesson_id: LessonId::from("budgeting"),
            lesson_title: "Budgeting".to_string(),
            condition_id: "bill_created#0".to_string(),
            action_type: action_type.to_string(),
            reaction: Reaction::resolve(action_type, &details),
        }
    }

    #[test]
    fn renderer_receives_display_challenge_and_content() {
        let renderer = Arc::new(RecordingRenderer::default());
        let dispatcher = ReactionDispatcher::with_renderer(renderer.clone());

        let outcomes = [
            dispatcher.dispatch(&invocation("show_message", json!({"message": "hi"}))),
            dispatcher.dispatch(&invocation("show_challenge", json!({"prompt": "why?"}))),
            dispatcher.dispatch(&invocation("add_content", json!({"body": "more"}))),
        ];

        assert!(outcomes.iter().all(|o| *o == DispatchOutcome::Handled));
        assert_eq!(
            *renderer.calls.lock().unwrap(),
            vec!["display:hi", "challenge:why?", "content:more"]
        );
    }

    #[test]
    fn unknown_reaction_is_absorbed() {
        let dispatcher = ReactionDispatcher::new();
        let outcome = dispatcher.dispatch(&invocation("launch_rocket", json!({})));
        assert_eq!(outcome, DispatchOutcome::UnknownReaction);
    }

    #[test]
    fn missing_handler_is_unhandled() {
        let dispatcher = ReactionDispatcher::new();
        let outcome = dispatcher.dispatch(&invocation("show_message", json!({"message": "hi"})));
        assert_eq!(outcome, DispatchOutcome::Unhandled);
    }

    #[test]
    fn completion_is_requested_without_handler() {
        let dispatcher = ReactionDispatcher::new();
        let outcome = dispatcher.dispatch(&invocation("complete_lesson", json!({})));
        assert_eq!(outcome, DispatchOutcome::CompletionRequested);
    }

    #[test]
    fn stub_is_handled_by_default() {
        let dispatcher = ReactionDispatcher::new();
        assert!(dispatcher.handles(ReactionKind::Stub));
        let outcome =
            dispatcher.dispatch(&invocation("coming_soon", json!({"feature": "crypto"})));
        assert_eq!(outcome, DispatchOutcome::Handled);
    }

    #[test]
    fn register_replaces_handler() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);

        let mut dispatcher = ReactionDispatcher::new();
        dispatcher.register(ReactionKind::Stub, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        dispatcher.dispatch(&invocation("noop", json!({})));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
