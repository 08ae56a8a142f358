use alloc::{collections::BTreeMap, string::String, vec::Vec};
use serde::{Deserialize, Deserializer, Serialize};

pub type QuestionId = i64;

/// Localized rendition of a [`Question`].
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Translation {
    pub text: String,
    pub options: Vec<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// A single entry of the quiz catalog.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Question {
    /// Stable identifier used by clients when submitting answers.
    pub id: QuestionId,
    /// Question to be displayed to the participants.
    pub text: String,
    /// Possible answers to select from.
    pub options: Vec<String>,
    /// Index of the correct option. Informational questions leave this empty
    /// and are never graded.
    #[serde(default)]
    pub correct_index: Option<usize>,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Overrides the catalog-wide time limit. Zero disables the timer.
    #[serde(default)]
    pub time_limit_seconds: Option<u32>,
    #[serde(default)]
    pub translations: Option<BTreeMap<String, Translation>>,
}

impl Question {
    pub const fn is_gradable(&self) -> bool {
        self.correct_index.is_some()
    }

    /// Clones the question without its answer key.
    pub fn redacted(&self) -> Self {
        Self { correct_index: None, ..self.clone() }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StrOrNum {
    Num(i64),
    Float(f64),
    Str(String),
}

/// Quiz authors occasionally write the default limit as a string. Anything that
/// is not a non-negative integer counts as "no timer".
fn lenient_seconds<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let seconds = Option::<StrOrNum>::deserialize(deserializer)?.map(|raw| match raw {
        StrOrNum::Num(num) => u32::try_from(num).unwrap_or(0),
        StrOrNum::Float(_) => 0,
        StrOrNum::Str(text) => text.trim().parse().unwrap_or(0),
    });
    Ok(seconds)
}

/// Catalog-level metadata that sits next to the question list.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Meta {
    /// Session-wide time limit for questions without their own override.
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub default_time_limit_seconds: Option<u32>,
    /// Image shown to every client once the quiz has finished.
    #[serde(default)]
    pub final_image_url: Option<String>,
}

/// Immutable, ordered sequence of questions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Catalog {
    pub questions: Vec<Question>,
    pub meta: Meta,
}

impl Catalog {
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    pub fn find(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|question| question.id == id)
    }

    pub fn gradable(&self) -> impl Iterator<Item = &Question> + '_ {
        self.questions.iter().filter(|question| question.is_gradable())
    }
}

#[cfg(test)]
mod tests {
    use super::{Meta, Question};

    #[test]
    fn default_limit_accepts_numbers_and_strings() {
        let meta: Meta = serde_json::from_str(r#"{"default_time_limit_seconds": 30}"#).unwrap();
        assert_eq!(meta.default_time_limit_seconds, Some(30));

        let meta: Meta = serde_json::from_str(r#"{"default_time_limit_seconds": " 45 "}"#).unwrap();
        assert_eq!(meta.default_time_limit_seconds, Some(45));

        let meta: Meta = serde_json::from_str(r#"{"default_time_limit_seconds": "soon"}"#).unwrap();
        assert_eq!(meta.default_time_limit_seconds, Some(0));

        let meta: Meta = serde_json::from_str(r#"{"default_time_limit_seconds": null}"#).unwrap();
        assert_eq!(meta.default_time_limit_seconds, None);

        let meta: Meta = serde_json::from_str("{}").unwrap();
        assert_eq!(meta, Meta::default());
    }

    #[test]
    fn redaction_only_strips_answer_key() {
        let question: Question = serde_json::from_str(
            r#"{"id": 7, "text": "2 + 2?", "options": ["3", "4"], "correct_index": 1, "time_limit_seconds": 15}"#,
        )
        .unwrap();
        assert!(question.is_gradable());

        let redacted = question.redacted();
        assert_eq!(redacted.correct_index, None);
        assert_eq!(redacted.id, 7);
        assert_eq!(redacted.options, question.options);
        assert_eq!(redacted.time_limit_seconds, Some(15));
    }
}
