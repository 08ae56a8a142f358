use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mutable progression state of the one live quiz session.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct QuizState {
    /// Index into the catalog. `-1` means the quiz has not started yet.
    pub current_question_index: i32,
    /// Whether the answer key of the current question is public.
    pub reveal_answer: bool,
    pub is_finished: bool,
    /// When the current question was put on screen.
    pub question_started_at: Option<DateTime<Utc>>,
    /// Effective time limit of the current question in seconds. Untimed
    /// questions leave this empty.
    pub question_time_limit: Option<u32>,
}

impl Default for QuizState {
    fn default() -> Self {
        Self {
            current_question_index: -1,
            reveal_answer: false,
            is_finished: false,
            question_started_at: None,
            question_time_limit: None,
        }
    }
}

/// Coarse view of a [`QuizState`] for matching on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    OnQuestion { index: usize, revealed: bool },
    Finished,
}

impl QuizState {
    pub fn phase(&self) -> Phase {
        if self.is_finished {
            return Phase::Finished;
        }
        match usize::try_from(self.current_question_index) {
            Ok(index) => Phase::OnQuestion { index, revealed: self.reveal_answer },
            Err(_) => Phase::NotStarted,
        }
    }

    /// Catalog index of the question currently open for answers.
    pub fn current_index(&self) -> Option<usize> {
        match self.phase() {
            Phase::OnQuestion { index, .. } => Some(index),
            _ => None,
        }
    }

    /// Clears the countdown. Every finished session is untimed.
    pub fn clear_timer(&mut self) {
        self.question_started_at = None;
        self.question_time_limit = None;
    }
}
