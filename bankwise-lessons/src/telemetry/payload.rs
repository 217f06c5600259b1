//! Telemetry payload.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::session::{LessonSession, SessionId};
use crate::snapshot::SessionSnapshot;

/// Snapshot pushed to the session-persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryPayload {
    pub student_name: String,
    pub session_id: SessionId,
    #[serde(flatten)]
    pub state: SessionSnapshot,
    /// Capture time in epoch milliseconds.
    pub timestamp: i64,
}

impl TelemetryPayload {
    /// Capture the current state of `session`.
    pub fn capture(session: &LessonSession) -> Self {
        Self {
            student_name: session.student_name().to_string(),
            session_id: session.id(),
            state: session.snapshot(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// Equal apart from the capture time.
    pub fn same_state(&self, other: &Self) -> bool {
        self.student_name == other.student_name
            && self.session_id == other.session_id
            && self.state == other.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::lesson::Lesson;
    use std::sync::Arc;

    #[test]
    fn payload_shape_is_camel_case() {
        let mut session = LessonSession::new(&EngineConfig::default());
        session
            .activate_lesson(Arc::new(Lesson::new("savings", "Savings")))
            .unwrap();
        session.tick(2.0);

        let payload = TelemetryPayload::capture(&session);
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["studentName"], "student");
        assert_eq!(json["sessionId"], session.id().to_string());
        assert_eq!(json["activeLessons"][0]["id"], "savings");
        assert_eq!(json["activeLessons"][0]["title"], "Savings");
        assert_eq!(json["activeLessons"][0]["elapsedTime"], 2.0);
        assert!(json["activeLessons"][0]["metConditions"].is_array());
        assert!(json["completedLessons"].as_array().unwrap().is_empty());
        assert!(json["timestamp"].as_i64().unwrap() > 0);
    }

    #[test]
    fn same_state_ignores_timestamp() {
        let session = LessonSession::new(&EngineConfig::default());
        let first = TelemetryPayload::capture(&session);
        let mut second = first.clone();
        second.timestamp += 5_000;
        assert!(first.same_state(&second));

        second.student_name = "someone else".to_string();
        assert!(!first.same_state(&second));
    }
}
