#![cfg_attr(not(test), no_std)]
extern crate alloc;

pub mod participant;
pub mod quiz;
pub mod session;
pub mod snapshot;
pub mod view;

pub use participant::{AnswerRecord, Participant};
pub use quiz::{Catalog, Meta, Question, QuestionId, Translation};
pub use session::{Phase, QuizState};
pub use snapshot::Snapshot;
