//! Persistable session state.

use serde::{Deserialize, Serialize};

use crate::lesson::LessonId;
use crate::registry::ActiveLesson;
use crate::scoring::CompletionRecord;

/// Resumable state of one active lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveLessonSnapshot {
    pub id: LessonId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub elapsed_time: f64,
    #[serde(default)]
    pub met_conditions: Vec<String>,
}

impl From<&ActiveLesson> for ActiveLessonSnapshot {
    fn from(active: &ActiveLesson) -> Self {
        Self {
            id: active.id().clone(),
            title: active.lesson().title().to_string(),
            elapsed_time: active.elapsed_time(),
            met_conditions: active.met_condition_ids(),
        }
    }
}

/// Active and completed lessons of a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    #[serde(default)]
    pub active_lessons: Vec<ActiveLessonSnapshot>,
    #[serde(default)]
    pub completed_lessons: Vec<CompletionRecord>,
}

impl SessionSnapshot {
    pub fn active_lesson(&self, id: &LessonId) -> Option<&ActiveLessonSnapshot> {
        self.active_lessons.iter().find(|a| &a.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_minimal_persisted_shape() {
        let json = r#"{"activeLessons": [{"id": "banking_basics", "title": "Banking Basics", "elapsedTime": 42}]}"#;
        let snapshot: SessionSnapshot = serde_json::from_str(json).unwrap();

        let lesson = snapshot
            .active_lesson(&LessonId::from("banking_basics"))
            .unwrap();
        assert_eq!(lesson.elapsed_time, 42.0);
        assert!(lesson.met_conditions.is_empty());
        assert!(snapshot.completed_lessons.is_empty());
    }

    #[test]
    fn serializes_camel_case() {
        let snapshot = SessionSnapshot {
            active_lessons: vec![ActiveLessonSnapshot {
                id: LessonId::from("x"),
                title: "X".to_string(),
                elapsed_time: 1.5,
                met_conditions: vec!["a#0".to_string()],
            }],
            completed_lessons: vec![],
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["activeLessons"][0]["elapsedTime"], 1.5);
        assert_eq!(json["activeLessons"][0]["metConditions"][0], "a#0");
    }
}
