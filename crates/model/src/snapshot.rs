use crate::{participant::AnswerRecord, session::QuizState, Participant};
use alloc::{collections::BTreeMap, string::String, vec::Vec};
use serde::{de::IgnoredAny, Deserialize, Deserializer, Serialize};

/// Everything that must survive a restart of the process.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Snapshot {
    pub participants: BTreeMap<String, Participant>,
    #[serde(deserialize_with = "skip_malformed")]
    pub answers: Vec<AnswerRecord>,
    pub quiz_state: QuizState,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MaybeRecord {
    Record(AnswerRecord),
    Malformed(IgnoredAny),
}

/// A single corrupted ledger entry should not cost us the rest of the ledger.
fn skip_malformed<'de, D>(deserializer: D) -> Result<Vec<AnswerRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Vec::<MaybeRecord>::deserialize(deserializer)?;
    Ok(entries
        .into_iter()
        .filter_map(|entry| match entry {
            MaybeRecord::Record(record) => Some(record),
            MaybeRecord::Malformed(_) => None,
        })
        .collect())
}
