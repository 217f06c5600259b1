use bankwise_lessons::ReactionInvocation;
use bankwise_lessons::ReactionRenderer;
use bankwise_lessons::reaction::{ChallengeReaction, ContentReaction, DisplayReaction};
use tracing::info;

/// Renderer that writes reactions to the log instead of a UI.
pub struct LogRenderer;

impl ReactionRenderer for LogRenderer {
    fn display(&self, invocation: &ReactionInvocation, reaction: &DisplayReaction) {
        info!(
            lesson_id = %invocation.lesson_id,
            style = reaction.style.as_str(),
            title = reaction.title.as_deref().unwrap_or(""),
            "{}",
            reaction.message
        );
    }

    fn challenge(&self, invocation: &ReactionInvocation, reaction: &ChallengeReaction) {
        info!(
            lesson_id = %invocation.lesson_id,
            options = ?reaction.options,
            "Challenge: {}",
            reaction.prompt
        );
    }

    fn content(&self, invocation: &ReactionInvocation, reaction: &ContentReaction) {
        info!(
            lesson_id = %invocation.lesson_id,
            heading = reaction.heading.as_deref().unwrap_or(""),
            "{}",
            reaction.body
        );
    }
}
