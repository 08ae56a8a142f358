pub mod error;

use crate::{
    aggregate,
    engine::Session,
    hub::{Hub, Subscription},
    projector,
};
use alloc::{
    boxed::Box,
    string::{String, ToString},
    sync::Arc,
};
use chrono::Utc;
use db::Database;
use model::{
    participant::{AnswerRequest, JoinResponse},
    view::{AdminResults, AnswerStatus, ParticipantInfo, ParticipantsStatus, PublicState, Reply, Scoreboard, Status},
    Catalog, QuestionId,
};
use core::sync::atomic::{AtomicU64, Ordering};
use parking_lot::{Mutex, MutexGuard};

/// Owner of the live session. Every read-modify-write goes through the one
/// session lock, which is also held while the resulting state is published so
/// that clients observe transitions in order. Snapshots are stamped with a
/// revision under that lock but written to disk after it is released.
pub struct Lobby {
    session: Mutex<Session>,
    /// Last revision handed out. Only bumped while the session lock is held.
    revision: AtomicU64,
    /// Last revision known to be on disk. Serializes the writers.
    written: Mutex<u64>,
    db: Database,
    hub: Arc<Hub>,
    /// Shared secret for the admin endpoints.
    admin: Box<str>,
}

impl Lobby {
    pub fn new(session: Session, db: Database, admin: String) -> Self {
        Self {
            session: Mutex::new(session),
            revision: AtomicU64::new(0),
            written: Mutex::new(0),
            db,
            hub: Arc::default(),
            admin: admin.into_boxed_str(),
        }
    }

    /// Builds a fresh session over the catalog and restores the last snapshot
    /// from the database, if any.
    pub fn open(catalog: Catalog, default_limit: u32, db: Database, admin: String) -> Self {
        let mut session = Session::new(Arc::new(catalog), default_limit);
        match db.load() {
            Ok(Some(snapshot)) => {
                session.restore(snapshot);
                log::info!(
                    "restored session at question {} with {} participants",
                    session.state().current_question_index,
                    session.roster().len()
                );
            }
            Ok(None) => log::info!("no snapshot found, starting a fresh session"),
            Err(err) => log::error!("failed to load snapshot: {err}"),
        }
        Self::new(session, db, admin)
    }

    /// Compares the token against the admin secret in constant time. An empty
    /// secret admits nobody.
    pub fn is_admin(&self, token: &str) -> bool {
        use subtle::ConstantTimeEq;
        if self.admin.is_empty() {
            return false;
        }
        let expected = self.admin.as_bytes();
        let given = token.as_bytes();
        let lengths_equal = expected.len().ct_eq(&given.len());
        let max = expected.len().max(given.len());
        let mut left = alloc::vec![0u8; max];
        let mut right = alloc::vec![0xFFu8; max];
        left[..expected.len()].copy_from_slice(expected);
        right[..given.len()].copy_from_slice(given);
        (lengths_equal & left.ct_eq(&right)).into()
    }

    pub const fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// Snapshots the session, releases the lock and then writes the snapshot.
    /// A writer that lost the race to a newer revision skips its stale copy.
    fn persist(&self, session: MutexGuard<'_, Session>) {
        let revision = self.revision.fetch_add(1, Ordering::Relaxed) + 1;
        let snapshot = session.snapshot();
        drop(session);

        let mut written = self.written.lock();
        if *written >= revision {
            log::debug!("skipping stale snapshot revision {revision}");
            return;
        }
        match self.db.save(&snapshot) {
            Ok(()) => *written = revision,
            Err(err) => log::error!("failed to persist snapshot revision {revision}: {err}"),
        }
    }

    fn broadcast(&self, session: &Session) {
        match projector::encode(session, Utc::now()) {
            Ok(payload) => {
                let delivered = self.hub.publish(&payload);
                log::debug!("broadcast state to {delivered} subscribers");
            }
            Err(err) => log::error!("failed to encode state: {err}"),
        }
    }

    fn commit(&self, session: MutexGuard<'_, Session>) {
        self.broadcast(&session);
        self.persist(session);
    }

    /// Registers a live subscriber. Its first message is the current state.
    pub fn subscribe(&self) -> error::Result<Subscription> {
        let session = self.session.lock();
        let payload = projector::encode(&session, Utc::now()).map_err(|err| {
            log::error!("failed to encode state: {err}");
            error::Error::Fatal
        })?;
        Ok(self.hub.subscribe(payload))
    }

    pub fn state(&self) -> PublicState {
        projector::project(&self.session.lock(), Utc::now())
    }

    pub fn join(&self, name: &str) -> error::Result<JoinResponse> {
        let mut session = self.session.lock();
        let username = session.join(name)?;
        log::debug!("participant {username:?} joined");
        self.commit(session);
        Ok(JoinResponse { username })
    }

    pub fn participant(&self, id: &str) -> error::Result<ParticipantInfo> {
        let session = self.session.lock();
        let participant = session.roster().get(id).ok_or(error::Error::UnknownParticipant)?;
        Ok(ParticipantInfo { status: Status::Ok, name: participant.name.clone() })
    }

    pub fn submit_answer(&self, request: &AnswerRequest) -> Reply {
        let AnswerRequest { participant_id, question_id, option_index } = request;
        let mut session = self.session.lock();
        let outcome = session.submit_answer(participant_id, *question_id, *option_index, Utc::now());
        match outcome {
            Ok(()) => {
                log::debug!("{participant_id:?} answered question {question_id} with option {option_index}");
                self.persist(session);
                Reply::ok()
            }
            Err(rejection) => {
                log::debug!("rejected answer of {participant_id:?} to question {question_id}: {rejection}");
                Reply::error(rejection.to_string())
            }
        }
    }

    pub fn answer_status(&self, id: &str, question_id: QuestionId) -> error::Result<AnswerStatus> {
        let session = self.session.lock();
        if !session.roster().contains(id) {
            return Err(error::Error::UnknownParticipant);
        }
        session.catalog().find(question_id).ok_or(error::Error::UnknownQuestion)?;
        let option_index = session.ledger().get(id, question_id);
        Ok(AnswerStatus { status: Status::Ok, answered: option_index.is_some(), option_index })
    }

    pub fn scoreboard(&self) -> error::Result<Scoreboard> {
        let session = self.session.lock();
        if !session.state().is_finished {
            return Err(error::Error::QuizInProgress);
        }
        Ok(aggregate::scoreboard(session.catalog(), session.roster(), session.ledger()))
    }

    pub fn start(&self) -> Reply {
        let mut session = self.session.lock();
        let changed = session.start(Utc::now());
        let reply = Reply::with_state(session.state().clone());
        if changed {
            log::info!("quiz started");
            self.commit(session);
        }
        reply
    }

    pub fn advance(&self) -> Reply {
        let mut session = self.session.lock();
        if let Err(rejection) = session.advance(Utc::now()) {
            return Reply::error(rejection.to_string());
        }
        log::info!("advanced to question {}", session.state().current_question_index);
        let reply = Reply::with_state(session.state().clone());
        self.commit(session);
        reply
    }

    pub fn retreat(&self) -> Reply {
        let mut session = self.session.lock();
        let changed = session.retreat(Utc::now());
        let reply = Reply::with_state(session.state().clone());
        if changed {
            log::info!("went back to question {}", session.state().current_question_index);
            self.commit(session);
        }
        reply
    }

    pub fn reveal(&self) -> Reply {
        let mut session = self.session.lock();
        let changed = session.reveal();
        let reply = Reply::with_state(session.state().clone());
        if changed {
            log::info!("revealed answer of question {}", session.state().current_question_index);
            self.commit(session);
        }
        reply
    }

    pub fn extend(&self, extra_seconds: i64) -> Reply {
        let mut session = self.session.lock();
        let extended = session.extend(extra_seconds);
        match extended {
            Ok(limit) => {
                log::info!("time limit extended to {limit} seconds");
                self.commit(session);
                Reply::extended(limit)
            }
            Err(rejection) => Reply::error(rejection.to_string()),
        }
    }

    pub fn reset(&self) -> Reply {
        let mut session = self.session.lock();
        session.reset();
        log::info!("quiz has been reset");
        self.commit(session);
        Reply::notice(String::from("Quiz has been reset successfully"))
    }

    pub fn results(&self) -> AdminResults {
        let session = self.session.lock();
        aggregate::tally(session.catalog(), session.ledger())
    }

    pub fn participants(&self) -> ParticipantsStatus {
        let session = self.session.lock();
        aggregate::participant_statuses(session.roster(), session.ledger(), session.current_question())
    }
}

#[cfg(test)]
mod tests {
    use super::{error::Error, Lobby};
    use crate::engine::{tests::catalog, Session};
    use std::{sync::Barrier, thread};
    use db::Database;
    use model::{
        participant::AnswerRequest,
        view::{Event, Reply, Status},
        Catalog,
    };

    fn lobby() -> Lobby {
        Lobby::new(Session::new(catalog(), 0), Database::ephemeral(), String::from("s3cret"))
    }

    fn answer(participant_id: &str, question_id: i64, option_index: i64) -> AnswerRequest {
        AnswerRequest { participant_id: participant_id.into(), question_id, option_index }
    }

    fn next_state(sub: &mut crate::hub::Subscription) -> model::view::PublicState {
        let payload = sub.try_recv().expect("a broadcast was expected");
        let Event::State(state) = serde_json::from_str(&payload).unwrap();
        state
    }

    #[test]
    fn admin_token_comparison() {
        let lobby = lobby();
        assert!(lobby.is_admin("s3cret"));
        assert!(!lobby.is_admin("s3cre"));
        assert!(!lobby.is_admin("s3cret!"));
        assert!(!lobby.is_admin(""));
    }

    #[test]
    fn joins_are_broadcast_and_duplicates_rejected() {
        let lobby = lobby();
        let mut sub = lobby.subscribe().unwrap();
        assert_eq!(next_state(&mut sub).state.current_question_index, -1);

        assert_eq!(lobby.join("  Ada ").unwrap().username, "Ada");
        next_state(&mut sub);
        assert_eq!(lobby.join("Ada"), Err(Error::NameTaken));
        assert_eq!(lobby.join(""), Err(Error::EmptyName));
        assert!(sub.try_recv().is_none());

        assert_eq!(lobby.participant("Ada").unwrap().name, "Ada");
        assert_eq!(lobby.participant("ada"), Err(Error::UnknownParticipant));
        assert_eq!(lobby.participants().participants.len(), 1);
    }

    #[test]
    fn answers_are_soft_failures_and_not_broadcast() {
        let lobby = lobby();
        lobby.join("Ada").unwrap();
        lobby.start();
        let mut sub = lobby.subscribe().unwrap();
        next_state(&mut sub);

        assert_eq!(lobby.submit_answer(&answer("Ada", 10, 1)), Reply::ok());
        assert_eq!(lobby.submit_answer(&answer("Ada", 10, 2)), Reply::error("Answer already locked".into()));
        assert_eq!(lobby.submit_answer(&answer("Nobody", 10, 2)), Reply::error("Unknown participant".into()));
        assert!(sub.try_recv().is_none());

        let status = lobby.answer_status("Ada", 10).unwrap();
        assert!(status.answered);
        assert_eq!(status.option_index, Some(1));
        let status = lobby.answer_status("Ada", 20).unwrap();
        assert!(!status.answered);
        assert_eq!(status.option_index, None);
        assert_eq!(lobby.answer_status("Ada", 99), Err(Error::UnknownQuestion));
        assert_eq!(lobby.answer_status("Bob", 10), Err(Error::UnknownParticipant));
        assert!(lobby.participants().participants[0].answered_current);
    }

    #[test]
    fn blocked_advance_changes_nothing() {
        let lobby = lobby();
        lobby.join("Ada").unwrap();
        lobby.join("Grace").unwrap();
        lobby.start();
        let mut sub = lobby.subscribe().unwrap();
        next_state(&mut sub);

        lobby.submit_answer(&answer("Ada", 10, 0));
        let reply = lobby.advance();
        assert_eq!(reply.status, Status::Error);
        assert_eq!(reply.message.as_deref(), Some("Not all participants answered yet"));
        assert!(sub.try_recv().is_none());

        lobby.submit_answer(&answer("Grace", 10, 1));
        let reply = lobby.advance();
        assert_eq!(reply.status, Status::Ok);
        assert_eq!(reply.state.unwrap().current_question_index, 1);
        assert_eq!(next_state(&mut sub).state.current_question_index, 1);
    }

    #[test]
    fn scoreboard_only_after_finish() {
        let lobby = lobby();
        assert_eq!(lobby.scoreboard(), Err(Error::QuizInProgress));
        lobby.start();
        for _ in 0..3 {
            assert_eq!(lobby.advance().status, Status::Ok);
        }
        assert!(lobby.state().state.is_finished);
        assert!(lobby.scoreboard().unwrap().entries.is_empty());
    }

    #[test]
    fn idempotent_transitions_broadcast_once() {
        let lobby = lobby();
        let mut sub = lobby.subscribe().unwrap();
        next_state(&mut sub);

        let first = lobby.start();
        let second = lobby.start();
        assert_eq!(first, second);
        next_state(&mut sub);
        assert!(sub.try_recv().is_none());

        lobby.reveal();
        lobby.reveal();
        assert!(next_state(&mut sub).question.unwrap().correct_index.is_some());
        assert!(sub.try_recv().is_none());

        assert_eq!(lobby.extend(5), Reply::extended(35));
        assert_eq!(next_state(&mut sub).state.question_time_limit, Some(35));
        assert_eq!(lobby.retreat().state.unwrap().current_question_index, 0);
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn reset_clears_everything() {
        let lobby = lobby();
        lobby.join("Ada").unwrap();
        lobby.start();
        lobby.submit_answer(&answer("Ada", 10, 0));
        lobby.reveal();

        assert_eq!(lobby.reset().message.as_deref(), Some("Quiz has been reset successfully"));
        let view = lobby.state();
        assert_eq!(view.state.current_question_index, -1);
        assert!(!view.state.is_finished);
        assert!(lobby.participants().participants.is_empty());
        assert!(lobby.results().per_question.iter().all(|result| result.counts.iter().all(|&count| count == 0)));
    }

    #[test]
    fn state_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quiz_state.json");

        let lobby = Lobby::open((*catalog()).clone(), 0, Database::from(path.clone()), String::from("s3cret"));
        lobby.join("Ada").unwrap();
        lobby.start();
        lobby.submit_answer(&answer("Ada", 10, 2));
        drop(lobby);

        let lobby = Lobby::open((*catalog()).clone(), 0, Database::from(path.clone()), String::from("s3cret"));
        assert_eq!(lobby.state().state.current_question_index, 0);
        assert_eq!(lobby.answer_status("Ada", 10).unwrap().option_index, Some(2));

        // A shorter catalog rewinds the restored session.
        let lobby = Lobby::open(Catalog::default(), 0, Database::from(path), String::from("s3cret"));
        assert_eq!(lobby.state().state.current_question_index, -1);
        assert_eq!(lobby.participant("Ada").unwrap().name, "Ada");
    }

    #[test]
    fn empty_secret_admits_nobody() {
        let lobby = Lobby::new(Session::new(catalog(), 0), Database::ephemeral(), String::new());
        assert!(!lobby.is_admin(""));
        assert!(!lobby.is_admin("anything"));
    }

    #[test]
    fn write_failures_keep_the_session_authoritative() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("quiz_state.json");
        let lobby = Lobby::new(Session::new(catalog(), 0), Database::from(path.clone()), String::from("s3cret"));
        let mut sub = lobby.subscribe().unwrap();
        next_state(&mut sub);

        assert_eq!(lobby.join("Ada").unwrap().username, "Ada");
        next_state(&mut sub);
        assert_eq!(lobby.participant("Ada").unwrap().name, "Ada");

        assert_eq!(lobby.start().status, Status::Ok);
        assert_eq!(next_state(&mut sub).state.current_question_index, 0);
        assert_eq!(lobby.submit_answer(&answer("Ada", 10, 1)), Reply::ok());
        assert_eq!(lobby.answer_status("Ada", 10).unwrap().option_index, Some(1));

        assert_eq!(lobby.advance().status, Status::Ok);
        assert_eq!(next_state(&mut sub).state.current_question_index, 1);
        assert!(!path.exists());
    }

    #[test]
    fn racing_joins_claim_a_name_once() {
        let lobby = &lobby();
        let barrier = &Barrier::new(2);
        let outcomes: Vec<_> = thread::scope(|scope| {
            let racers: Vec<_> = (0..2)
                .map(|_| {
                    scope.spawn(move || {
                        barrier.wait();
                        lobby.join("Ada")
                    })
                })
                .collect();
            racers.into_iter().map(|racer| racer.join().unwrap()).collect()
        });

        assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
        assert!(outcomes.contains(&Err(Error::NameTaken)));
        assert_eq!(lobby.participants().participants.len(), 1);
    }

    #[test]
    fn concurrent_commits_leave_the_newest_snapshot_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quiz_state.json");
        let lobby = Lobby::new(Session::new(catalog(), 0), Database::from(path.clone()), String::from("s3cret"));

        let names: Vec<_> = (0..8).map(|index| format!("Player {index}")).collect();
        thread::scope(|scope| {
            for name in &names {
                let lobby = &lobby;
                scope.spawn(move || lobby.join(name).unwrap());
            }
        });
        drop(lobby);

        let restored = Lobby::open((*catalog()).clone(), 0, Database::from(path), String::from("s3cret"));
        assert_eq!(restored.participants().participants.len(), names.len());
    }
}
