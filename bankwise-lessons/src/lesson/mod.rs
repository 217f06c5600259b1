//! Lesson definitions, conditions and guards.

mod definition;
mod guard;
mod model;

pub use definition::{
    CompiledLesson, ConditionDefinition, LessonCatalog, LessonDefinition, LessonWarning,
};
pub use guard::{
    ActionParams, CompareOp, Comparison, Guard, GuardMismatch, GuardValue, MismatchReason,
    action_params, values_equal,
};
pub use model::{Condition, Lesson, LessonId, Polarity};
