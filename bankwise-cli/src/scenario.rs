//! Scripted action streams for `bankwise replay`.
//!
//! A scenario bundles lesson definitions with an ordered list of steps:
//!
//! ```toml
//! student_name = "Ada"
//!
//! [[lessons]]
//! id = "banking_basics"
//! title = "Banking Basics"
//!
//! [[steps]]
//! kind = "start"
//! lesson = "banking_basics"
//!
//! [[steps]]
//! kind = "action"
//! action_type = "deposit_made"
//! params = { amount = 500 }
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use bankwise_lessons::LessonDefinition;
use serde::Deserialize;
use serde_json::Value;

/// A replayable scenario.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Overrides the configured student name.
    #[serde(default)]
    pub student_name: Option<String>,
    #[serde(default)]
    pub lessons: Vec<LessonDefinition>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// One scripted step.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    /// Validate and activate a lesson.
    Start { lesson: String },
    /// An in-app action.
    Action {
        #[serde(alias = "type")]
        action_type: String,
        #[serde(default)]
        params: Value,
    },
    /// A student mistake.
    Mistake {
        #[serde(alias = "type")]
        mistake_type: String,
        #[serde(default)]
        details: Value,
    },
    /// A quiz result.
    Quiz {
        earned: f64,
        possible: f64,
        #[serde(default)]
        label: String,
    },
    /// Time spent in active lessons.
    Tick { seconds: f64 },
}

impl Scenario {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Invalid scenario {}", path.display()))
    }
}
