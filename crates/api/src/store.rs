//! Participant roster and the write-once answer ledger.

use alloc::{
    collections::{btree_map::Entry, BTreeMap},
    string::String,
    vec::Vec,
};
use core::fmt::{self, Display};
use model::{AnswerRecord, Participant, QuestionId};

#[derive(Debug, PartialEq, Eq)]
pub enum JoinError {
    /// Nothing left of the name after trimming.
    Empty,
    /// Someone already joined with exactly this name.
    Taken,
}

impl Display for JoinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Empty => "Username cannot be empty",
            Self::Taken => "This username is already in use. Please choose a different one.",
        })
    }
}

/// Joined participants keyed by the (case-sensitive) name they joined with.
#[derive(Debug, Default)]
pub struct Roster(BTreeMap<String, Participant>);

impl From<BTreeMap<String, Participant>> for Roster {
    fn from(participants: BTreeMap<String, Participant>) -> Self {
        Self(participants)
    }
}

impl Roster {
    /// Registers a participant. The trimmed name is both the identity and the
    /// session token handed back to the client.
    pub fn join(&mut self, name: &str) -> Result<String, JoinError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(JoinError::Empty);
        }

        match self.0.entry(String::from(name)) {
            Entry::Occupied(_) => Err(JoinError::Taken),
            Entry::Vacant(entry) => {
                let id = entry.key().clone();
                entry.insert(Participant::from_display_name(name));
                Ok(id)
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Participant> {
        self.0.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Participant)> + '_ {
        self.0.iter().map(|(id, participant)| (id.as_str(), participant))
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn to_map(&self) -> BTreeMap<String, Participant> {
        self.0.clone()
    }
}

/// Composite ledger key. Kept as a pair so that no participant name can ever
/// collide with another participant's entry.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct AnswerKey {
    pub participant: String,
    pub question: QuestionId,
}

impl AnswerKey {
    fn new(participant: &str, question: QuestionId) -> Self {
        Self { participant: String::from(participant), question }
    }
}

/// Answers by participant and question. The first answer for a key is final.
#[derive(Debug, Default)]
pub struct Ledger(BTreeMap<AnswerKey, usize>);

impl FromIterator<AnswerRecord> for Ledger {
    fn from_iter<I: IntoIterator<Item = AnswerRecord>>(records: I) -> Self {
        let mut ledger = Self::default();
        for AnswerRecord { participant_id, question_id, option_index } in records {
            ledger.record(&participant_id, question_id, option_index);
        }
        ledger
    }
}

impl Ledger {
    /// Locks in an answer. Returns `false` without touching the ledger if the
    /// participant already answered this question.
    pub fn record(&mut self, participant: &str, question: QuestionId, option: usize) -> bool {
        match self.0.entry(AnswerKey::new(participant, question)) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(option);
                true
            }
        }
    }

    pub fn get(&self, participant: &str, question: QuestionId) -> Option<usize> {
        self.0.get(&AnswerKey::new(participant, question)).copied()
    }

    pub fn has_answered(&self, participant: &str, question: QuestionId) -> bool {
        self.get(participant, question).is_some()
    }

    /// Selected options of every participant for one question.
    pub fn answers_for(&self, question: QuestionId) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().filter(move |(key, _)| key.question == question).map(|(_, &option)| option)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn to_records(&self) -> Vec<AnswerRecord> {
        self.0
            .iter()
            .map(|(AnswerKey { participant, question }, &option_index)| AnswerRecord {
                participant_id: participant.clone(),
                question_id: *question,
                option_index,
            })
            .collect()
    }
}
