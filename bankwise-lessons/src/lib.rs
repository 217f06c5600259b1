//! Lesson condition and completion engine for the bankwise banking simulator.
//!
//! The engine watches a stream of in-app financial actions, matches them
//! against declarative per-lesson conditions, fires each condition's
//! reaction at most once, and computes a blended completion score.
//!
//! # Architecture
//!
//! - **Lessons** ([`Lesson`], [`LessonCatalog`]) are immutable definitions
//!   loaded from TOML or JSON and shared through `Arc`
//! - **Session** ([`LessonSession`]) owns all per-student state and is the
//!   only entry point for inbound calls
//! - **Matcher** ([`process_action`]) marks conditions met and hands them to
//!   the [`ReactionDispatcher`]
//! - **Tracker** ([`CompletionTracker`]) accrues content and app-usage
//!   scores and decides when a lesson is complete
//! - **Telemetry** ([`TelemetryReporter`]) periodically pushes a snapshot of
//!   the session to a [`TelemetrySink`]

pub mod config;
mod error;
pub mod lesson;
mod matcher;
pub mod reaction;
mod registry;
pub mod scoring;
mod session;
mod snapshot;
pub mod telemetry;

// Configuration
pub use config::{EngineConfig, GradingConfig, ScoringConfig, SessionConfig, TelemetryConfig};

// Errors
pub use error::{EngineError, Result, TelemetryError};

// Lessons
pub use lesson::{
    ActionParams, Condition, Guard, Lesson, LessonCatalog, LessonDefinition, LessonId, Polarity,
    action_params,
};

// Matching
pub use matcher::{ActionOutcome, FiredReaction, process_action};

// Reactions
pub use reaction::{DispatchOutcome, Reaction, ReactionDispatcher, ReactionInvocation, ReactionRenderer};

// Registry
pub use registry::{ActiveLesson, ConditionState, LessonRegistry};

// Scoring
pub use scoring::{
    CompletionReason, CompletionRecord, CompletionTracker, Grade, GradeScale, LessonScore,
    LessonStartValidation, StartStatus, score_to_grade,
};

// Session
pub use session::{LessonSession, SessionId, SharedSession};
pub use snapshot::{ActiveLessonSnapshot, SessionSnapshot};

// Telemetry
pub use telemetry::{HttpTelemetrySink, TelemetryPayload, TelemetryReporter, TelemetrySink};
