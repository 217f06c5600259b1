//! Immutable lesson definitions.
//!
//! A [`Lesson`] never changes after it is loaded and can be shared through
//! an `Arc` by any number of sessions. Per-student progress lives in the
//! registry's condition-state table, not here.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::guard::Guard;
use crate::reaction::Reaction;

/// Opaque lesson identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LessonId(String);

impl LessonId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An id is well formed when it has non-whitespace content.
    pub fn is_well_formed(&self) -> bool {
        !self.0.trim().is_empty()
    }
}

impl fmt::Display for LessonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LessonId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for LessonId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Scoring direction of a condition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// Good behaviour; restores app-usage points.
    #[default]
    Positive,
    /// Teachable mistake; costs app-usage points.
    Negative,
    /// Informational only.
    Neutral,
}

/// One declarative rule of a lesson.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub id: String,
    pub condition_type: String,
    pub guard: Option<Guard>,
    pub action_type: String,
    pub reaction: Reaction,
    pub polarity: Polarity,
}

impl Condition {
    /// Condition firing `reaction` whenever `condition_type` occurs.
    ///
    /// The action type defaults to the reaction kind's canonical name.
    pub fn new(condition_type: impl Into<String>, reaction: Reaction) -> Self {
        let action_type = match &reaction {
            Reaction::Unresolved { action_type, .. } => action_type.clone(),
            other => other
                .kind()
                .map(|kind| kind.action_type().to_string())
                .unwrap_or_default(),
        };
        Self {
            id: String::new(),
            condition_type: condition_type.into(),
            guard: None,
            action_type,
            reaction,
            polarity: Polarity::default(),
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    #[must_use]
    pub fn with_guard(mut self, guard: Guard) -> Self {
        self.guard = if guard.is_empty() { None } else { Some(guard) };
        self
    }

    #[must_use]
    pub fn with_polarity(mut self, polarity: Polarity) -> Self {
        self.polarity = polarity;
        self
    }
}

/// A pedagogical unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Lesson {
    id: LessonId,
    title: String,
    conditions: Vec<Condition>,
    required_actions: Vec<String>,
    total_slides: Option<u32>,
    requires_quiz: bool,
}

impl Lesson {
    pub fn new(id: impl Into<LessonId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            conditions: Vec::new(),
            required_actions: Vec::new(),
            total_slides: None,
            requires_quiz: false,
        }
    }

    /// Append a condition.
    ///
    /// An empty id, or one already used in this lesson, becomes
    /// `"{condition_type}#{index}"` so condition ids stay unique.
    #[must_use]
    pub fn with_condition(mut self, mut condition: Condition) -> Self {
        let derived = format!("{}#{}", condition.condition_type, self.conditions.len());
        if condition.id.trim().is_empty() {
            condition.id = derived;
        } else if self.condition_index(&condition.id).is_some() {
            warn!(
                lesson_id = %self.id,
                condition_id = %condition.id,
                replacement = %derived,
                "Duplicate condition id, deriving a new one"
            );
            condition.id = derived;
        }
        self.conditions.push(condition);
        self
    }

    #[must_use]
    pub fn with_required_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_actions = actions.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_total_slides(mut self, total: u32) -> Self {
        self.total_slides = Some(total);
        self
    }

    #[must_use]
    pub fn requiring_quiz(mut self) -> Self {
        self.requires_quiz = true;
        self
    }

    pub fn id(&self) -> &LessonId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn required_actions(&self) -> &[String] {
        &self.required_actions
    }

    pub fn total_slides(&self) -> Option<u32> {
        self.total_slides
    }

    pub fn requires_quiz(&self) -> bool {
        self.requires_quiz
    }

    /// Lessons without required actions complete from content alone.
    pub fn is_slider_only(&self) -> bool {
        self.required_actions.is_empty()
    }

    /// Position of a condition by id.
    pub fn condition_index(&self, condition_id: &str) -> Option<usize> {
        self.conditions.iter().position(|c| c.id == condition_id)
    }
}
