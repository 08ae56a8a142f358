//! Client-safe view of the session. The same projection backs both the
//! polling endpoint and every live broadcast.

use crate::engine::Session;
use alloc::{string::String, sync::Arc};
use chrono::{DateTime, Utc};
use model::{
    view::{Event, PublicState},
    QuizState,
};

/// Seconds left on the current question. Untimed questions and finished
/// sessions have no countdown at all. Never negative.
pub fn remaining_seconds(state: &QuizState, now: DateTime<Utc>) -> Option<u32> {
    if state.is_finished {
        return None;
    }
    let limit = state.question_time_limit.filter(|&limit| limit > 0)?;
    let started = state.question_started_at?;
    let elapsed = (now - started).num_seconds().max(0);
    let remaining = (i64::from(limit) - elapsed).max(0);
    Some(u32::try_from(remaining).unwrap_or(0))
}

pub fn project(session: &Session, now: DateTime<Utc>) -> PublicState {
    let state = session.state().clone();
    let catalog = session.catalog();
    let total_questions = catalog.len();

    if state.is_finished {
        return PublicState {
            state,
            question: None,
            final_image_url: catalog.meta.final_image_url.clone().filter(|url| !url.is_empty()),
            total_questions,
            remaining_seconds: None,
        };
    }

    let question = session.current_question().map(|question| {
        if state.reveal_answer {
            question.clone()
        } else {
            question.redacted()
        }
    });

    PublicState {
        remaining_seconds: remaining_seconds(&state, now),
        state,
        question,
        final_image_url: None,
        total_questions,
    }
}

/// Serializes the live-channel message once so that it can be shared by every subscriber.
pub fn encode(session: &Session, now: DateTime<Utc>) -> serde_json::Result<Arc<str>> {
    let text: String = serde_json::to_string(&Event::State(project(session, now)))?;
    Ok(Arc::from(text))
}
