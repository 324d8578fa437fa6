//! Owner of the live `QuestProgress` snapshot.
//!
//! All progress mutations go through the store, which applies the pure
//! transitions from `quest_core::progression`, announces rewards and queues the
//! new snapshot for persistence. Writes happen on a background task in the
//! order they were queued; a failed write is logged and the in-memory snapshot
//! stays authoritative.

use std::sync::{Arc, Weak};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use quest_core::Clock;
use quest_core::model::{
    AttemptRecord, NodeRef, QuestProgress, QuestShape, QuestionSource, RewardTable,
    SessionSettings, SubRoundRef,
};
use quest_core::progression::{self, ProgressAction, ProgressEvent, Rejection, Transition};
use storage::repository::Storage;

use crate::error::{SessionError, StoreError};
use crate::reward_sink::{LogRewardSink, RewardSink};
use crate::sessions::{SessionController, SessionPhase, Timers};

//
// ─── RESULTS ───────────────────────────────────────────────────────────────────
//

/// What a store mutation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreUpdate {
    /// Snapshot replaced; `events` is empty for a no-op.
    Applied(Vec<ProgressEvent>),
    /// Refused without mutation.
    Rejected(Rejection),
    /// A failed session was logged but did not touch progress.
    NotPassed,
}

/// Result of asking to play a sub-round.
pub enum SessionStart<T: Timers> {
    Started(SessionController<T>),
    Locked(SubRoundRef),
}

//
// ─── PERSISTENCE WRITER ────────────────────────────────────────────────────────
//

enum WriteRequest {
    Progress(Box<QuestProgress>),
    Attempt(AttemptRecord),
    Flush(oneshot::Sender<()>),
}

fn spawn_writer(storage: Storage) -> mpsc::UnboundedSender<WriteRequest> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(request) = rx.recv().await {
            match request {
                WriteRequest::Progress(progress) => {
                    if let Err(err) = storage.progress.save_progress(&progress).await {
                        warn!(error = %err, "failed to save progress; keeping in-memory snapshot");
                    }
                }
                WriteRequest::Attempt(attempt) => {
                    if let Err(err) = storage.attempts.append_attempt(&attempt).await {
                        warn!(error = %err, at = %attempt.at(), "failed to record attempt");
                    }
                }
                WriteRequest::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
        debug!("persistence writer stopped");
    });
    tx
}

//
// ─── STORE ─────────────────────────────────────────────────────────────────────
//

pub struct ProgressStore {
    progress: QuestProgress,
    settings: SessionSettings,
    clock: Clock,
    storage: Storage,
    rewards: Arc<dyn RewardSink>,
    writer: mpsc::UnboundedSender<WriteRequest>,
    // Live while the controller that holds the matching `Arc` exists and has
    // not been abandoned.
    active: Weak<SubRoundRef>,
}

impl ProgressStore {
    /// Load saved progress, or build a fresh tree from `source`.
    ///
    /// A snapshot that fails to load, does not match `shape`, or breaks the
    /// tree invariants is discarded with a warning. Must be called from within
    /// a Tokio runtime; the persistence writer is spawned here.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Progress` if a fresh tree cannot be built from
    /// `source`.
    pub async fn load(
        storage: Storage,
        source: &dyn QuestionSource,
        shape: &QuestShape,
        table: &RewardTable,
    ) -> Result<Self, StoreError> {
        let saved = match storage.progress.load_progress().await {
            Ok(Some(saved)) if !saved.conforms_to(shape) => {
                warn!("saved progress does not match the quest shape; starting fresh");
                None
            }
            Ok(Some(saved)) => match saved.check_invariants() {
                Ok(()) => Some(saved),
                Err(violation) => {
                    warn!(%violation, "saved progress is inconsistent; starting fresh");
                    None
                }
            },
            Ok(None) => {
                info!("no saved progress; starting fresh");
                None
            }
            Err(err) => {
                warn!(error = %err, "failed to load progress; starting fresh");
                None
            }
        };

        let fresh = saved.is_none();
        let progress = match saved {
            Some(progress) => progress,
            None => QuestProgress::build(shape, table, source)?,
        };
        info!(
            total_stars = progress.total_stars(),
            frontier = ?progress.frontier(),
            "progress loaded"
        );

        let writer = spawn_writer(storage.clone());
        let store = Self {
            progress,
            settings: SessionSettings::standard(),
            clock: Clock::default(),
            storage,
            rewards: Arc::new(LogRewardSink),
            writer,
            active: Weak::new(),
        };
        // The question draw is only stable once it has been saved.
        if fresh {
            store.queue(WriteRequest::Progress(Box::new(store.progress.clone())));
        }
        Ok(store)
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_session_settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_reward_sink(mut self, rewards: Arc<dyn RewardSink>) -> Self {
        self.rewards = rewards;
        self
    }

    #[must_use]
    pub fn progress(&self) -> &QuestProgress {
        &self.progress
    }

    #[must_use]
    pub fn session_settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// The single unlocked, incomplete sub-round, if any.
    #[must_use]
    pub fn current_frontier(&self) -> Option<SubRoundRef> {
        self.progress.frontier()
    }

    /// The sub-round of the live session, if any. A session stops being live
    /// once it is finished, abandoned, or dropped.
    #[must_use]
    pub fn active_session(&self) -> Option<SubRoundRef> {
        self.active.upgrade().map(|at| *at)
    }

    /// Record a finished sub-round and cascade unlocks and rewards.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Progress` for an unknown sub-round or too many
    /// stars. Locked targets are a `StoreUpdate::Rejected`, not an error.
    pub fn complete_sub_round(
        &mut self,
        at: SubRoundRef,
        stars: u8,
    ) -> Result<StoreUpdate, StoreError> {
        let transition =
            progression::dispatch(&self.progress, ProgressAction::CompleteSubRound { at, stars })?;
        Ok(self.commit(transition))
    }

    /// Return every node to its initial status. Question assignments are kept.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::SessionActive` while a session is being played.
    pub fn reset(&mut self) -> Result<StoreUpdate, StoreError> {
        if let Some(active) = self.active_session() {
            return Err(StoreError::SessionActive(active));
        }
        let transition = progression::dispatch(&self.progress, ProgressAction::Reset)?;
        Ok(self.commit(transition))
    }

    /// Open a play session for `at` and present its first question.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::SessionActive` while another session is open and
    /// `StoreError::Progress` for an unknown sub-round. A locked sub-round is
    /// `SessionStart::Locked` and leaves the store untouched.
    pub fn start_session<T: Timers>(
        &mut self,
        at: SubRoundRef,
        timers: T,
    ) -> Result<SessionStart<T>, StoreError> {
        if let Some(active) = self.active_session() {
            return Err(StoreError::SessionActive(active));
        }
        let sub_round = self.progress.sub_round(at)?;
        if sub_round.is_locked() {
            info!(%at, "sub-round is locked");
            return Ok(SessionStart::Locked(at));
        }

        let lease = Arc::new(at);
        let mut session = SessionController::new(
            at,
            sub_round.questions().to_vec(),
            self.settings.clone(),
            timers,
        )?
        .with_lease(Arc::clone(&lease));
        session.begin()?;
        self.active = Arc::downgrade(&lease);
        info!(%at, "session started");
        Ok(SessionStart::Started(session))
    }

    /// Close a completed session: log the attempt and, if it passed, record
    /// the sub-round completion with the stars it earned.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Abandoned` for an abandoned session,
    /// `StoreError::NoActiveSession` if `session` is not the live session of
    /// this store, and `SessionError::InProgress` if it has not completed.
    pub fn finish_session<T: Timers>(
        &mut self,
        session: &SessionController<T>,
    ) -> Result<StoreUpdate, StoreError> {
        let at = session.at();
        if session.phase() == SessionPhase::Abandoned {
            return Err(SessionError::Abandoned.into());
        }
        if !self.owns(session) {
            return Err(StoreError::NoActiveSession(at));
        }
        let Some(outcome) = session.outcome() else {
            return Err(SessionError::InProgress.into());
        };
        self.active = Weak::new();

        let total = u32::try_from(outcome.total_questions).unwrap_or(u32::MAX);
        let attempt = AttemptRecord::new(
            at,
            outcome.evaluation,
            outcome.hints_used,
            outcome.reveals_used,
            total,
            self.clock.now(),
        );
        self.queue(WriteRequest::Attempt(attempt));

        if !outcome.evaluation.passed {
            info!(%at, score = outcome.evaluation.score, "session not passed");
            return Ok(StoreUpdate::NotPassed);
        }
        info!(%at, score = outcome.evaluation.score, "session passed");
        self.complete_sub_round(at, outcome.evaluation.stars_earned)
    }

    /// Abandon a session without scoring it. Progress is not touched.
    ///
    /// Dropping the controller or calling [`SessionController::abandon`] has
    /// the same effect on the store.
    pub fn abandon_session<T: Timers>(&mut self, mut session: SessionController<T>) {
        if self.owns(&session) {
            self.active = Weak::new();
        }
        session.abandon();
        info!(at = %session.at(), "session abandoned");
    }

    /// Attempt history for one sub-round, oldest first. Queued writes land
    /// before the read.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Storage` if the history cannot be read.
    pub async fn list_attempts(&self, at: SubRoundRef) -> Result<Vec<AttemptRecord>, StoreError> {
        self.flush().await;
        Ok(self.storage.attempts.list_attempts(at).await?)
    }

    /// Wait until every queued write has been attempted.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.writer.send(WriteRequest::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }

    fn owns<T: Timers>(&self, session: &SessionController<T>) -> bool {
        session
            .lease()
            .is_some_and(|lease| std::ptr::eq(Arc::as_ptr(lease), self.active.as_ptr()))
    }

    fn commit(&mut self, transition: Transition) -> StoreUpdate {
        match transition {
            Transition::Rejected(rejection) => {
                info!(?rejection, "progress change rejected");
                StoreUpdate::Rejected(rejection)
            }
            Transition::Applied { progress, events } => {
                if events.is_empty() {
                    return StoreUpdate::Applied(events);
                }
                self.progress = progress;
                for event in &events {
                    self.announce(event);
                }
                self.queue(WriteRequest::Progress(Box::new(self.progress.clone())));
                StoreUpdate::Applied(events)
            }
        }
    }

    fn announce(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::SubRoundCompleted { at, stars } => {
                debug!(%at, stars, "sub-round completed");
            }
            ProgressEvent::Unlocked(node) => info!(%node, "unlocked"),
            ProgressEvent::RoundCompleted { at, rewards } => {
                self.rewards.show_rewards(NodeRef::Round(*at), rewards);
            }
            ProgressEvent::LevelCompleted { level, rewards } => {
                self.rewards.show_rewards(NodeRef::Level(*level), rewards);
            }
            ProgressEvent::QuestCompleted => info!("quest completed"),
            ProgressEvent::Reset => info!("progress reset"),
        }
    }

    fn queue(&self, request: WriteRequest) {
        if self.writer.send(request).is_err() {
            warn!("persistence writer is gone; change kept in memory only");
        }
    }
}
