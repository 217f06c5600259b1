//! Reactions fired when a condition is satisfied.

mod dispatcher;
mod payload;

pub use dispatcher::{
    DispatchOutcome, ReactionDispatcher, ReactionHandler, ReactionInvocation, ReactionRenderer,
};
pub use payload::{
    ChallengeReaction, CompletionReaction, ContentReaction, DisplayReaction, DisplayStyle,
    Reaction, ReactionKind, StubReaction,
};
