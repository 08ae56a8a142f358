//! Response bodies shared by the polling endpoints and the live channel.

use crate::{quiz::QuestionId, session::QuizState, Question};
use alloc::{string::String, vec::Vec};
use serde::{Deserialize, Serialize};

/// Client-safe projection of the session.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct PublicState {
    pub state: QuizState,
    /// Current question. The answer key is withheld until it is revealed.
    pub question: Option<Question>,
    /// Only surfaced once the quiz has finished.
    pub final_image_url: Option<String>,
    pub total_questions: usize,
    pub remaining_seconds: Option<u32>,
}

/// Message pushed through the live channel.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum Event {
    State(PublicState),
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
}

/// Generic acknowledgement. Business-rule violations are reported through
/// this body with [`Status::Error`] instead of an error status code.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Reply {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<QuizState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_time_limit: Option<u32>,
}

impl Reply {
    pub const fn ok() -> Self {
        Self { status: Status::Ok, message: None, state: None, new_time_limit: None }
    }

    pub fn error(message: String) -> Self {
        Self { status: Status::Error, message: Some(message), ..Self::ok() }
    }

    pub fn notice(message: String) -> Self {
        Self { message: Some(message), ..Self::ok() }
    }

    pub fn with_state(state: QuizState) -> Self {
        Self { state: Some(state), ..Self::ok() }
    }

    pub fn extended(new_time_limit: u32) -> Self {
        Self { new_time_limit: Some(new_time_limit), ..Self::ok() }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ParticipantInfo {
    pub status: Status,
    pub name: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct AnswerStatus {
    pub status: Status,
    pub answered: bool,
    pub option_index: Option<usize>,
}

/// Number of selections per option of a single question.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct AggregateResult {
    pub question_id: QuestionId,
    pub counts: Vec<u32>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct AdminResults {
    pub per_question: Vec<AggregateResult>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ScoreboardEntry {
    pub participant_id: String,
    pub name: String,
    pub correct: u32,
    pub answered: u32,
    /// Number of gradable questions in the catalog.
    pub total_questions: u32,
    pub percentage: f64,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Scoreboard {
    pub entries: Vec<ScoreboardEntry>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ParticipantStatus {
    pub participant_id: String,
    pub name: String,
    pub answered_current: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ParticipantsStatus {
    pub participants: Vec<ParticipantStatus>,
}

#[cfg(test)]
mod tests {
    use super::{Event, PublicState, Reply};
    use crate::QuizState;

    #[test]
    fn events_are_tagged_as_state() {
        let event = Event::State(PublicState {
            state: QuizState::default(),
            question: None,
            final_image_url: None,
            total_questions: 3,
            remaining_seconds: None,
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "state");
        assert_eq!(value["payload"]["total_questions"], 3);
        assert_eq!(value["payload"]["state"]["current_question_index"], -1);
        assert!(value["payload"]["question"].is_null());
    }

    #[test]
    fn replies_omit_empty_fields() {
        let value = serde_json::to_value(Reply::ok()).unwrap();
        assert_eq!(value, serde_json::json!({ "status": "ok" }));

        let value = serde_json::to_value(Reply::error("Time expired".into())).unwrap();
        assert_eq!(value, serde_json::json!({ "status": "error", "message": "Time expired" }));

        let value = serde_json::to_value(Reply::extended(40)).unwrap();
        assert_eq!(value, serde_json::json!({ "status": "ok", "new_time_limit": 40 }));
    }
}
