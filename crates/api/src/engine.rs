//! Progression state machine of the quiz session.

use crate::{
    projector,
    store::{JoinError, Ledger, Roster},
};
use alloc::{string::String, sync::Arc};
use chrono::{DateTime, Utc};
use core::fmt::{self, Display};
use model::{Catalog, Phase, Question, QuestionId, QuizState, Snapshot};

/// Business-rule violations. These are reported back to the caller as a
/// regular reply and never as a transport-level fault.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    UnknownParticipant,
    QuestionMismatch,
    TimeExpired,
    InvalidOption,
    AlreadyLocked,
    NotAllAnswered,
    QuizFinished,
    NoActiveTimer,
}

impl Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UnknownParticipant => "Unknown participant",
            Self::QuestionMismatch => "Question mismatch",
            Self::TimeExpired => "Time expired",
            Self::InvalidOption => "Invalid option index",
            Self::AlreadyLocked => "Answer already locked",
            Self::NotAllAnswered => "Not all participants answered yet",
            Self::QuizFinished => "Quiz finished",
            Self::NoActiveTimer => "No active timer",
        })
    }
}

/// The one live quiz session: progression state, participants and their answers.
pub struct Session {
    catalog: Arc<Catalog>,
    /// Fallback time limit for questions the catalog does not time.
    default_limit: u32,
    state: QuizState,
    roster: Roster,
    ledger: Ledger,
}

impl Session {
    pub fn new(catalog: Arc<Catalog>, default_limit: u32) -> Self {
        Self {
            catalog,
            default_limit,
            state: QuizState::default(),
            roster: Roster::default(),
            ledger: Ledger::default(),
        }
    }

    /// Replaces the session with a persisted snapshot. A snapshot taken against
    /// a longer catalog is rewound to the not-started state.
    pub fn restore(&mut self, Snapshot { participants, answers, quiz_state }: Snapshot) {
        self.roster = Roster::from(participants);
        self.ledger = answers.into_iter().collect();
        self.state = quiz_state;

        let index = self.state.current_question_index;
        let in_range = match usize::try_from(index) {
            Ok(index) => index < self.catalog.len(),
            Err(_) => index == -1,
        };
        if !in_range {
            self.state.current_question_index = -1;
            self.state.clear_timer();
        }
        if self.state.is_finished {
            self.state.clear_timer();
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            participants: self.roster.to_map(),
            answers: self.ledger.to_records(),
            quiz_state: self.state.clone(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub const fn state(&self) -> &QuizState {
        &self.state
    }

    pub const fn roster(&self) -> &Roster {
        &self.roster
    }

    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Question currently open for answers, if any.
    pub fn current_question(&self) -> Option<&Question> {
        self.state.current_index().and_then(|index| self.catalog.get(index))
    }

    /// Per-question override, then the catalog default, then the configured
    /// default. Zero means the question is untimed.
    pub fn effective_limit(&self, question: &Question) -> Option<u32> {
        let seconds = question
            .time_limit_seconds
            .or(self.catalog.meta.default_time_limit_seconds)
            .unwrap_or(self.default_limit);
        (seconds > 0).then_some(seconds)
    }

    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> Option<u32> {
        projector::remaining_seconds(&self.state, now)
    }

    pub fn all_answered_current(&self) -> bool {
        let Some(question) = self.current_question() else {
            return false;
        };
        !self.roster.is_empty() && self.roster.iter().all(|(id, _)| self.ledger.has_answered(id, question.id))
    }

    fn open_question(&mut self, index: usize, now: DateTime<Utc>) {
        let limit = self.catalog.get(index).and_then(|question| self.effective_limit(question));
        self.state.current_question_index = i32::try_from(index).unwrap_or(i32::MAX);
        self.state.reveal_answer = false;
        self.state.question_time_limit = limit;
        self.state.question_started_at = Some(now);
    }

    /// Opens the first question. Returns whether anything changed.
    pub fn start(&mut self, now: DateTime<Utc>) -> bool {
        if self.state.phase() != Phase::NotStarted || self.catalog.is_empty() {
            return false;
        }
        self.open_question(0, now);
        true
    }

    /// Moves on to the next question, or finishes the quiz after the last one.
    /// Blocked while a participant has yet to answer a question whose timer is
    /// still running.
    pub fn advance(&mut self, now: DateTime<Utc>) -> Result<(), Rejection> {
        if self.state.is_finished {
            return Ok(());
        }

        if !self.roster.is_empty() && !self.all_answered_current() {
            match self.remaining_seconds(now) {
                Some(0) => {}
                _ => return Err(Rejection::NotAllAnswered),
            }
        }

        let next = self.state.current_question_index.saturating_add(1);
        match usize::try_from(next) {
            Ok(next) if next < self.catalog.len() => self.open_question(next, now),
            _ => {
                self.state.is_finished = true;
                self.state.clear_timer();
            }
        }
        Ok(())
    }

    /// Steps back to the previous question and restarts its timer. Returns
    /// whether anything changed.
    pub fn retreat(&mut self, now: DateTime<Utc>) -> bool {
        match self.state.phase() {
            Phase::OnQuestion { index, .. } if index > 0 => {
                self.open_question(index - 1, now);
                true
            }
            _ => false,
        }
    }

    /// Exposes the answer key of the current question. Returns whether anything changed.
    pub fn reveal(&mut self) -> bool {
        !core::mem::replace(&mut self.state.reveal_answer, true)
    }

    /// Grants extra time on the running question and returns the new limit.
    pub fn extend(&mut self, extra_seconds: i64) -> Result<u32, Rejection> {
        if self.state.is_finished {
            return Err(Rejection::QuizFinished);
        }
        let limit = self.state.question_time_limit.filter(|&limit| limit > 0).ok_or(Rejection::NoActiveTimer)?;
        let extra = u32::try_from(extra_seconds.max(1)).unwrap_or(u32::MAX);
        let limit = limit.saturating_add(extra);
        self.state.question_time_limit = Some(limit);
        Ok(limit)
    }

    /// Forgets every participant and answer and rewinds to the not-started state.
    pub fn reset(&mut self) {
        self.roster.clear();
        self.ledger.clear();
        self.state = QuizState::default();
    }

    pub fn join(&mut self, name: &str) -> Result<String, JoinError> {
        self.roster.join(name)
    }

    pub fn submit_answer(
        &mut self,
        participant: &str,
        question_id: QuestionId,
        option_index: i64,
        now: DateTime<Utc>,
    ) -> Result<(), Rejection> {
        if !self.roster.contains(participant) {
            return Err(Rejection::UnknownParticipant);
        }

        let question = self.current_question().filter(|question| question.id == question_id);
        let option_count = question.ok_or(Rejection::QuestionMismatch)?.options.len();

        if self.remaining_seconds(now) == Some(0) {
            return Err(Rejection::TimeExpired);
        }

        let option = usize::try_from(option_index)
            .ok()
            .filter(|&option| option < option_count)
            .ok_or(Rejection::InvalidOption)?;

        if self.ledger.record(participant, question_id, option) {
            Ok(())
        } else {
            Err(Rejection::AlreadyLocked)
        }
    }
}
