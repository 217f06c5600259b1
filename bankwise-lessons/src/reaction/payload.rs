//! Typed reaction payloads.
//!
//! Lesson authors write an `action_type` string plus loosely shaped
//! `action_details`. Both are resolved into a [`Reaction`] when the lesson
//! is loaded, so a malformed payload is reported once at load time instead
//! of every time the condition fires.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Category of a reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionKind {
    /// Transient message surface (modal, tip, validation, warning).
    Display,
    /// Interactive challenge surface.
    Challenge,
    /// Content block appended to the lesson narrative.
    Content,
    /// Marks the lesson complete.
    Complete,
    /// Placeholder for features that are not available yet.
    Stub,
}

impl ReactionKind {
    /// Resolve an authored action type into a reaction kind.
    pub fn from_action_type(action_type: &str) -> Option<Self> {
        match action_type {
            "show_message" | "show_modal" | "show_tip" | "show_validation" | "show_warning" => {
                Some(ReactionKind::Display)
            }
            "show_challenge" | "start_challenge" => Some(ReactionKind::Challenge),
            "add_content" | "append_content" => Some(ReactionKind::Content),
            "complete_lesson" | "lesson_completion" => Some(ReactionKind::Complete),
            "coming_soon" | "noop" => Some(ReactionKind::Stub),
            _ => None,
        }
    }

    /// Canonical action type for this kind.
    pub fn action_type(&self) -> &'static str {
        match self {
            ReactionKind::Display => "show_message",
            ReactionKind::Challenge => "show_challenge",
            ReactionKind::Content => "add_content",
            ReactionKind::Complete => "complete_lesson",
            ReactionKind::Stub => "coming_soon",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionKind::Display => "display",
            ReactionKind::Challenge => "challenge",
            ReactionKind::Content => "content",
            ReactionKind::Complete => "complete",
            ReactionKind::Stub => "stub",
        }
    }
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visual surface used by a display reaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayStyle {
    #[default]
    Modal,
    Tip,
    Validation,
    Warning,
}

impl DisplayStyle {
    fn from_action_type(action_type: &str) -> Self {
        match action_type {
            "show_tip" => DisplayStyle::Tip,
            "show_validation" => DisplayStyle::Validation,
            "show_warning" => DisplayStyle::Warning,
            _ => DisplayStyle::Modal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayStyle::Modal => "modal",
            DisplayStyle::Tip => "tip",
            DisplayStyle::Validation => "validation",
            DisplayStyle::Warning => "warning",
        }
    }
}

/// Message shown in a modal, tip or validation surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayReaction {
    #[serde(skip)]
    pub style: DisplayStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(alias = "text", alias = "content")]
    pub message: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Interactive challenge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeReaction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "message", alias = "prompt", alias = "question")]
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Content block appended to the lesson narrative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentReaction {
    #[serde(
        rename = "title",
        alias = "heading",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub heading: Option<String>,
    #[serde(rename = "message", alias = "body", alias = "content", alias = "text")]
    pub body: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Author-declared lesson completion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionReaction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Placeholder reaction; logged only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StubReaction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A resolved reaction.
#[derive(Debug, Clone, PartialEq)]
pub enum Reaction {
    Display(DisplayReaction),
    Challenge(ChallengeReaction),
    Content(ContentReaction),
    Complete(CompletionReaction),
    Stub(StubReaction),
    /// Action type with no reaction kind, or a payload that failed validation.
    Unresolved { action_type: String, reason: String },
}

impl Reaction {
    /// Resolve an authored action type and details into a reaction.
    ///
    /// Never fails: unknown action types and malformed payloads become
    /// [`Reaction::Unresolved`], which the dispatcher logs and skips.
    pub fn resolve(action_type: &str, details: &Value) -> Self {
        let Some(kind) = ReactionKind::from_action_type(action_type) else {
            return Reaction::Unresolved {
                action_type: action_type.to_string(),
                reason: "no reaction registered for this action type".to_string(),
            };
        };

        let details = match details {
            Value::Null => Value::Object(Map::new()),
            other => other.clone(),
        };

        let resolved = match kind {
            ReactionKind::Display => serde_json::from_value::<DisplayReaction>(details).map(|mut d| {
                d.style = DisplayStyle::from_action_type(action_type);
                Reaction::Display(d)
            }),
            ReactionKind::Challenge => serde_json::from_value(details).map(Reaction::Challenge),
            ReactionKind::Content => serde_json::from_value(details).map(Reaction::Content),
            ReactionKind::Complete => serde_json::from_value(details).map(Reaction::Complete),
            ReactionKind::Stub => serde_json::from_value(details).map(Reaction::Stub),
        };

        resolved.unwrap_or_else(|e| Reaction::Unresolved {
            action_type: action_type.to_string(),
            reason: format!("invalid {kind} payload: {e}"),
        })
    }

    /// Display reaction with a modal style.
    pub fn message(title: impl Into<String>, message: impl Into<String>) -> Self {
        Reaction::Display(DisplayReaction {
            style: DisplayStyle::Modal,
            title: Some(title.into()),
            message: message.into(),
            extra: Map::new(),
        })
    }

    /// Completion reaction without a message.
    pub fn complete() -> Self {
        Reaction::Complete(CompletionReaction::default())
    }

    /// Kind of this reaction, if it resolved.
    pub fn kind(&self) -> Option<ReactionKind> {
        match self {
            Reaction::Display(_) => Some(ReactionKind::Display),
            Reaction::Challenge(_) => Some(ReactionKind::Challenge),
            Reaction::Content(_) => Some(ReactionKind::Content),
            Reaction::Complete(_) => Some(ReactionKind::Complete),
            Reaction::Stub(_) => Some(ReactionKind::Stub),
            Reaction::Unresolved { .. } => None,
        }
    }

    /// Whether the reaction failed to resolve.
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Reaction::Unresolved { .. })
    }

    /// Payload handed to the rendering collaborator.
    ///
    /// Shape: `{ title?, message?, ...details }`.
    pub fn payload(&self) -> Value {
        let value = match self {
            Reaction::Display(r) => serde_json::to_value(r),
            Reaction::Challenge(r) => serde_json::to_value(r),
            Reaction::Content(r) => serde_json::to_value(r),
            Reaction::Complete(r) => serde_json::to_value(r),
            Reaction::Stub(r) => serde_json::to_value(r),
            Reaction::Unresolved { .. } => Ok(Value::Object(Map::new())),
        };
        let mut value = value.unwrap_or_else(|_| Value::Object(Map::new()));
        if let (Reaction::Display(r), Value::Object(map)) = (self, &mut value) {
            map.insert(
                "style".to_string(),
                serde_json::to_value(r.style).unwrap_or(Value::Null),
            );
        }
        value
    }

    /// Title, when the reaction carries one.
    pub fn title(&self) -> Option<&str> {
        match self {
            Reaction::Display(r) => r.title.as_deref(),
            Reaction::Challenge(r) => r.title.as_deref(),
            Reaction::Content(r) => r.heading.as_deref(),
            Reaction::Complete(r) => r.title.as_deref(),
            Reaction::Stub(r) => r.title.as_deref(),
            Reaction::Unresolved { .. } => None,
        }
    }
}
