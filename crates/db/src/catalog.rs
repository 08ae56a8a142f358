//! Loading of the quiz catalog. The document is either a bare list of
//! questions or an object holding the list under `questions` next to the
//! catalog metadata.

use crate::error;
use model::{Catalog, Meta, Question};
use serde::Deserialize;
use std::{collections::BTreeSet, fs, path::Path};

#[derive(Deserialize)]
#[serde(untagged)]
enum Document {
    Bare(Vec<Question>),
    Wrapped {
        #[serde(default)]
        questions: Vec<Question>,
        #[serde(flatten)]
        meta: Meta,
    },
}

fn validate(catalog: &Catalog) -> error::Result<()> {
    let mut seen = BTreeSet::new();
    for question in &catalog.questions {
        if !seen.insert(question.id) || question.options.len() < 2 {
            return Err(error::Error::BadInput);
        }
        if question.correct_index.is_some_and(|index| index >= question.options.len()) {
            return Err(error::Error::BadInput);
        }
    }
    Ok(())
}

pub fn parse(bytes: &[u8]) -> error::Result<Catalog> {
    let catalog = match serde_json::from_slice(bytes)? {
        Document::Bare(questions) => Catalog { questions, meta: Meta::default() },
        Document::Wrapped { questions, meta } => Catalog { questions, meta },
    };
    validate(&catalog)?;
    Ok(catalog)
}

pub fn load(path: &Path) -> error::Result<Catalog> {
    let bytes = fs::read(path)?;
    parse(&bytes)
}
