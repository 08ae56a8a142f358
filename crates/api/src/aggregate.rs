use crate::store::{Ledger, Roster};
use alloc::{string::String, vec::Vec};
use core::cmp::Reverse;
use model::{
    view::{AdminResults, AggregateResult, ParticipantStatus, ParticipantsStatus, Scoreboard, ScoreboardEntry},
    Catalog, Question,
};

/// Number of selections per option for every question, regardless of which
/// question is current or whether the selection was correct.
pub fn tally(catalog: &Catalog, ledger: &Ledger) -> AdminResults {
    let per_question = catalog
        .questions
        .iter()
        .map(|question| {
            let mut counts = alloc::vec![0u32; question.options.len()];
            for option in ledger.answers_for(question.id) {
                if let Some(count) = counts.get_mut(option) {
                    *count += 1;
                }
            }
            AggregateResult { question_id: question.id, counts }
        })
        .collect();
    AdminResults { per_question }
}

/// Share of correct answers in percent, rounded to one decimal with ties going
/// to the even digit.
fn percentage(correct: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let percent = f64::from(correct) / f64::from(total) * 100.0;
    (percent * 10.0).round_ties_even() / 10.0
}

/// Scores every participant against the gradable questions. Sorted by most
/// correct answers first, then alphabetically ignoring case.
pub fn scoreboard(catalog: &Catalog, roster: &Roster, ledger: &Ledger) -> Scoreboard {
    let gradable: Vec<_> = catalog.gradable().collect();
    let total_questions = u32::try_from(gradable.len()).unwrap_or(u32::MAX);

    let mut entries: Vec<_> = roster
        .iter()
        .map(|(id, participant)| {
            let mut correct = 0;
            let mut answered = 0;
            for question in &gradable {
                let Some(option) = ledger.get(id, question.id) else {
                    continue;
                };
                answered += 1;
                if question.correct_index == Some(option) {
                    correct += 1;
                }
            }
            ScoreboardEntry {
                participant_id: String::from(id),
                name: participant.name.clone(),
                correct,
                answered,
                total_questions,
                percentage: percentage(correct, total_questions),
            }
        })
        .collect();

    entries.sort_by_cached_key(|entry| (Reverse(entry.correct), entry.name.to_lowercase()));
    Scoreboard { entries }
}

/// Whether each participant has answered the current question, sorted by name
/// ignoring case.
pub fn participant_statuses(roster: &Roster, ledger: &Ledger, current: Option<&Question>) -> ParticipantsStatus {
    let mut participants: Vec<_> = roster
        .iter()
        .map(|(id, participant)| ParticipantStatus {
            participant_id: String::from(id),
            name: participant.name.clone(),
            answered_current: current.is_some_and(|question| ledger.has_answered(id, question.id)),
        })
        .collect();
    participants.sort_by_cached_key(|status| status.name.to_lowercase());
    ParticipantsStatus { participants }
}
