//! Authored lesson definitions and catalogs.
//!
//! Definitions are the loosely typed shape lessons are written in (TOML or
//! JSON). [`LessonDefinition::compile`] validates one into a [`Lesson`],
//! reporting problems as [`LessonWarning`]s so a single bad condition does
//! not prevent the rest of the lesson from loading.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::guard::{Guard, GuardValue};
use super::model::{Condition, Lesson, LessonId, Polarity};
use crate::error::{EngineError, Result};
use crate::reaction::Reaction;

/// A condition as authored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(alias = "conditionType")]
    pub condition_type: String,
    #[serde(
        default,
        alias = "conditionValue",
        skip_serializing_if = "Option::is_none"
    )]
    pub condition_value: Option<BTreeMap<String, GuardValue>>,
    #[serde(alias = "actionType")]
    pub action_type: String,
    #[serde(default, alias = "actionDetails")]
    pub action_details: Value,
    #[serde(default)]
    pub polarity: Polarity,
}

/// A lesson as authored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonDefinition {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub conditions: Vec<ConditionDefinition>,
    #[serde(default, alias = "requiredActions")]
    pub required_actions: Vec<String>,
    #[serde(default, alias = "totalSlides", skip_serializing_if = "Option::is_none")]
    pub total_slides: Option<u32>,
    #[serde(default, alias = "requiresQuiz")]
    pub requires_quiz: bool,
}

/// Non-fatal problem found while compiling a lesson.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonWarning {
    pub lesson_id: String,
    pub condition_id: Option<String>,
    pub message: String,
}

impl fmt::Display for LessonWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.condition_id {
            Some(condition) => write!(f, "{} [{}]: {}", self.lesson_id, condition, self.message),
            None => write!(f, "{}: {}", self.lesson_id, self.message),
        }
    }
}

/// A compiled lesson plus the warnings produced while compiling it.
#[derive(Debug, Clone)]
pub struct CompiledLesson {
    pub lesson: Lesson,
    pub warnings: Vec<LessonWarning>,
}

impl LessonDefinition {
    /// Validate and compile into an immutable [`Lesson`].
    ///
    /// Fails only when the lesson id is blank. Conditions with a blank type
    /// are dropped; unresolvable reactions are kept (they log when fired).
    pub fn compile(self) -> Result<CompiledLesson> {
        let id = LessonId::new(self.id.trim());
        if !id.is_well_formed() {
            return Err(EngineError::InvalidLesson(
                "lesson id must not be empty".to_string(),
            ));
        }

        let mut warnings = Vec::new();
        let mut warn_on = |condition_id: Option<&str>, message: String| {
            warnings.push(LessonWarning {
                lesson_id: id.to_string(),
                condition_id: condition_id.map(str::to_string),
                message,
            });
        };

        let title = if self.title.trim().is_empty() {
            warn_on(None, "missing title, using id".to_string());
            id.to_string()
        } else {
            self.title
        };

        let mut lesson = Lesson::new(id.clone(), title);
        let mut seen_ids = HashSet::new();

        for (index, def) in self.conditions.into_iter().enumerate() {
            let condition_type = def.condition_type.trim().to_string();
            let condition_id = def
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| format!("{condition_type}#{index}"));

            if condition_type.is_empty() {
                warn_on(
                    Some(&condition_id),
                    "condition type is empty, condition dropped".to_string(),
                );
                continue;
            }
            if !seen_ids.insert(condition_id.clone()) {
                warn_on(
                    Some(&condition_id),
                    "duplicate condition id, condition dropped".to_string(),
                );
                continue;
            }

            let reaction = Reaction::resolve(&def.action_type, &def.action_details);
            if let Reaction::Unresolved { reason, .. } = &reaction {
                warn_on(
                    Some(&condition_id),
                    format!("action type '{}': {}", def.action_type, reason),
                );
            }

            let mut guard = def.condition_value.map(Guard::from).unwrap_or_default();
            let rewritten = guard.normalize_for(&condition_type);
            if rewritten > 0 {
                debug!(
                    lesson_id = %id,
                    condition_id = %condition_id,
                    rewritten,
                    "Normalized guard from condition type suffix"
                );
            }

            let mut condition = Condition::new(condition_type, reaction)
                .with_id(condition_id)
                .with_guard(guard)
                .with_polarity(def.polarity);
            condition.action_type = def.action_type;
            lesson = lesson.with_condition(condition);
        }

        lesson = lesson.with_required_actions(
            self.required_actions
                .into_iter()
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty()),
        );
        if let Some(total) = self.total_slides {
            if total == 0 {
                warn_on(None, "total_slides is zero, ignored".to_string());
            } else {
                lesson = lesson.with_total_slides(total);
            }
        }
        if self.requires_quiz {
            lesson = lesson.requiring_quiz();
        }

        Ok(CompiledLesson { lesson, warnings })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCatalog {
    Wrapped {
        #[serde(default)]
        lessons: Vec<LessonDefinition>,
    },
    List(Vec<LessonDefinition>),
}

impl RawCatalog {
    fn into_definitions(self) -> Vec<LessonDefinition> {
        match self {
            RawCatalog::Wrapped { lessons } => lessons,
            RawCatalog::List(lessons) => lessons,
        }
    }
}

/// A set of compiled lessons keyed by id.
#[derive(Debug, Clone, Default)]
pub struct LessonCatalog {
    lessons: Vec<Arc<Lesson>>,
    warnings: Vec<LessonWarning>,
}

impl LessonCatalog {
    /// Parse a TOML catalog (`[[lessons]]` tables).
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let raw: RawCatalog = toml::from_str(contents)?;
        Ok(Self::from_definitions(raw.into_definitions()))
    }

    /// Parse a JSON catalog: either `{"lessons": [...]}` or a bare array.
    pub fn from_json_str(contents: &str) -> Result<Self> {
        let raw: RawCatalog = serde_json::from_str(contents)?;
        Ok(Self::from_definitions(raw.into_definitions()))
    }

    /// Compile definitions, skipping invalid or duplicate lessons with a warning.
    pub fn from_definitions(definitions: Vec<LessonDefinition>) -> Self {
        let mut catalog = Self::default();

        for (index, definition) in definitions.into_iter().enumerate() {
            let raw_id = definition.id.clone();
            match definition.compile() {
                Ok(compiled) => {
                    if catalog.get(compiled.lesson.id()).is_some() {
                        catalog.warnings.push(LessonWarning {
                            lesson_id: compiled.lesson.id().to_string(),
                            condition_id: None,
                            message: "duplicate lesson id, later definition skipped".to_string(),
                        });
                        continue;
                    }
                    catalog.warnings.extend(compiled.warnings);
                    catalog.lessons.push(Arc::new(compiled.lesson));
                }
                Err(e) => {
                    warn!(index, error = %e, "Skipping invalid lesson definition");
                    catalog.warnings.push(LessonWarning {
                        lesson_id: if raw_id.trim().is_empty() {
                            format!("#{index}")
                        } else {
                            raw_id
                        },
                        condition_id: None,
                        message: e.to_string(),
                    });
                }
            }
        }

        for warning in &catalog.warnings {
            warn!(%warning, "Lesson catalog warning");
        }
        catalog
    }

    pub fn get(&self, id: &LessonId) -> Option<Arc<Lesson>> {
        self.lessons.iter().find(|l| l.id() == id).cloned()
    }

    pub fn lessons(&self) -> &[Arc<Lesson>] {
        &self.lessons
    }

    pub fn warnings(&self) -> &[LessonWarning] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.lessons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }
}
