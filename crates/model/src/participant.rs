use crate::quiz::QuestionId;
use alloc::string::String;
use serde::{Deserialize, Serialize};

/// Longest display name (in characters) kept for a participant.
pub const MAX_NAME_LENGTH: usize = 40;

/// Profile of a joined participant. The participant's identity is the name
/// they joined with, which is the key this profile is stored under.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Participant {
    pub name: String,
}

impl Participant {
    pub fn from_display_name(name: &str) -> Self {
        Self { name: name.chars().take(MAX_NAME_LENGTH).collect() }
    }
}

/// One entry of the answer ledger, in its flat persisted form.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct AnswerRecord {
    pub participant_id: String,
    pub question_id: QuestionId,
    pub option_index: usize,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct JoinRequest {
    pub name: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct JoinResponse {
    pub username: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AnswerRequest {
    pub participant_id: String,
    pub question_id: QuestionId,
    /// Signed so that out-of-range picks are reported as a rule violation
    /// rather than a malformed body.
    pub option_index: i64,
}
