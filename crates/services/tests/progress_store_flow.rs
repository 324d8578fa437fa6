use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use quest_core::model::{
    AttemptRecord, NodeRef, QuestProgress, QuestShape, Question, QuestionDraft, QuestionId,
    RewardTable, Rewards, SubRoundRef,
};
use quest_core::progression::{ProgressEvent, Rejection};
use quest_core::time::fixed_clock;
use services::{
    ManualTimers, ProgressStore, QuestionBank, RewardSink, Selection, SessionController,
    SessionError, SessionStart, StoreError, StoreUpdate,
};
use storage::repository::{
    AttemptLogRepository, ProgressRepository, Storage, StorageError,
};

fn question(id: u32) -> Question {
    QuestionDraft {
        id: QuestionId::new(id),
        prompt: format!("Is food #{id} healthy?"),
        options: vec!["Yes".into(), "No".into(), "Sometimes".into()],
        correct_index: 0,
        topic: "Nutrition".into(),
        explanation: None,
    }
    .validate()
    .unwrap()
}

fn shape() -> QuestShape {
    QuestShape::new(1, 2, 2, 10).unwrap()
}

fn bank() -> QuestionBank {
    QuestionBank::from_questions((1..=12).map(question).collect(), shape(), Selection::Sequential)
        .unwrap()
}

async fn load(storage: Storage) -> ProgressStore {
    ProgressStore::load(storage, &bank(), &shape(), &RewardTable::standard())
        .await
        .unwrap()
        .with_clock(fixed_clock())
}

fn started(start: SessionStart<ManualTimers>) -> SessionController<ManualTimers> {
    match start {
        SessionStart::Started(session) => session,
        SessionStart::Locked(at) => panic!("{at} should be playable"),
    }
}

/// Answer every question, the first `correct` of them correctly, firing
/// each advance timer as it is scheduled.
fn play(session: &mut SessionController<ManualTimers>, correct: usize) {
    for i in 0..session.questions().len() {
        let question = session.current_question().expect("question on screen");
        let choice = if i < correct {
            question.correct_index()
        } else {
            (question.correct_index() + 1) % question.options().len()
        };
        session.submit_answer(choice).unwrap();
        for id in session.timers_mut().take_due() {
            session.on_timer(id);
        }
    }
    assert!(session.is_complete());
}

#[derive(Default)]
struct RecordingSink {
    shown: Mutex<Vec<(NodeRef, Rewards)>>,
}

impl RewardSink for RecordingSink {
    fn show_rewards(&self, source: NodeRef, rewards: &Rewards) {
        self.shown.lock().unwrap().push((source, rewards.clone()));
    }
}

struct FailingRepository;

#[async_trait]
impl ProgressRepository for FailingRepository {
    async fn load_progress(&self) -> Result<Option<QuestProgress>, StorageError> {
        Err(StorageError::Connection("disk unavailable".into()))
    }

    async fn save_progress(&self, _progress: &QuestProgress) -> Result<(), StorageError> {
        Err(StorageError::Connection("disk unavailable".into()))
    }
}

#[async_trait]
impl AttemptLogRepository for FailingRepository {
    async fn append_attempt(&self, _attempt: &AttemptRecord) -> Result<i64, StorageError> {
        Err(StorageError::Connection("disk unavailable".into()))
    }

    async fn list_attempts(&self, _at: SubRoundRef) -> Result<Vec<AttemptRecord>, StorageError> {
        Err(StorageError::Connection("disk unavailable".into()))
    }
}

/// Keeps the snapshot as JSON text, the way a file or database backend would.
#[derive(Default)]
struct JsonRepository {
    payload: Mutex<Option<String>>,
}

#[async_trait]
impl ProgressRepository for JsonRepository {
    async fn load_progress(&self) -> Result<Option<QuestProgress>, StorageError> {
        let payload = self.payload.lock().unwrap().clone();
        payload
            .map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn save_progress(&self, progress: &QuestProgress) -> Result<(), StorageError> {
        let json = serde_json::to_string(progress)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        *self.payload.lock().unwrap() = Some(json);
        Ok(())
    }
}

fn failing_storage() -> Storage {
    Storage {
        progress: Arc::new(FailingRepository),
        attempts: Arc::new(FailingRepository),
    }
}

#[tokio::test]
async fn passing_session_completes_and_persists() {
    let storage = Storage::in_memory();
    let mut store = load(storage.clone()).await;
    let first = SubRoundRef::new(0, 0, 0);
    assert_eq!(store.current_frontier(), Some(first));

    let mut session = started(store.start_session(first, ManualTimers::new()).unwrap());
    play(&mut session, 10);
    let update = store.finish_session(&session).unwrap();

    let StoreUpdate::Applied(events) = update else {
        panic!("passing session should apply");
    };
    assert!(events.contains(&ProgressEvent::SubRoundCompleted { at: first, stars: 3 }));
    assert_eq!(store.current_frontier(), Some(SubRoundRef::new(0, 0, 1)));
    assert_eq!(store.active_session(), None);

    store.flush().await;
    let saved = storage.progress.load_progress().await.unwrap().expect("saved");
    assert_eq!(&saved, store.progress());

    let attempts = store.list_attempts(first).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert!(attempts[0].passed());
    assert_eq!(attempts[0].score(), 10);
    assert_eq!(attempts[0].completed_at(), fixed_clock().now());
}

#[tokio::test]
async fn failed_session_is_logged_without_progress() {
    let mut store = load(Storage::in_memory()).await;
    let first = SubRoundRef::new(0, 0, 0);
    let before = store.progress().clone();

    let mut session = started(store.start_session(first, ManualTimers::new()).unwrap());
    play(&mut session, 6);
    assert_eq!(store.finish_session(&session).unwrap(), StoreUpdate::NotPassed);
    assert_eq!(store.progress(), &before);

    let attempts = store.list_attempts(first).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert!(!attempts[0].passed());
    assert_eq!(attempts[0].stars_earned(), 1);
}

#[tokio::test]
async fn locked_sub_round_cannot_be_started() {
    let mut store = load(Storage::in_memory()).await;
    let before = store.progress().clone();
    let locked = SubRoundRef::new(0, 1, 0);

    let start = store.start_session(locked, ManualTimers::new()).unwrap();
    assert!(matches!(start, SessionStart::Locked(at) if at == locked));
    assert_eq!(store.active_session(), None);

    assert_eq!(
        store.complete_sub_round(locked, 3).unwrap(),
        StoreUpdate::Rejected(Rejection::Locked(locked))
    );
    assert_eq!(store.progress(), &before);
}

#[tokio::test]
async fn only_one_session_at_a_time() {
    let mut store = load(Storage::in_memory()).await;
    let first = SubRoundRef::new(0, 0, 0);
    let session = started(store.start_session(first, ManualTimers::new()).unwrap());

    let err = store.start_session(first, ManualTimers::new()).err();
    assert!(matches!(err, Some(StoreError::SessionActive(at)) if at == first));
    assert!(matches!(store.reset(), Err(StoreError::SessionActive(_))));

    let err = store.finish_session(&session).unwrap_err();
    assert!(matches!(err, StoreError::Session(SessionError::InProgress)));
    assert_eq!(store.active_session(), Some(first));
}

#[tokio::test]
async fn dropping_a_session_frees_the_store() {
    let mut store = load(Storage::in_memory()).await;
    let first = SubRoundRef::new(0, 0, 0);
    let before = store.progress().clone();

    let mut session = started(store.start_session(first, ManualTimers::new()).unwrap());
    session.submit_answer(0).unwrap();
    drop(session);

    assert_eq!(store.active_session(), None);
    assert_eq!(store.progress(), &before);
    let session = started(store.start_session(first, ManualTimers::new()).unwrap());
    assert_eq!(store.active_session(), Some(first));
    drop(session);
    assert!(store.reset().is_ok());
}

#[tokio::test]
async fn abandoned_controller_cannot_be_finished() {
    let mut store = load(Storage::in_memory()).await;
    let first = SubRoundRef::new(0, 0, 0);

    let mut session = started(store.start_session(first, ManualTimers::new()).unwrap());
    session.abandon();
    assert_eq!(store.active_session(), None);

    let err = store.finish_session(&session).unwrap_err();
    assert!(matches!(err, StoreError::Session(SessionError::Abandoned)));
    assert!(store.list_attempts(first).await.unwrap().is_empty());

    let replacement = started(store.start_session(first, ManualTimers::new()).unwrap());
    let err = store.finish_session(&session).unwrap_err();
    assert!(matches!(err, StoreError::Session(SessionError::Abandoned)));
    assert_eq!(store.active_session(), Some(replacement.at()));
}

#[tokio::test]
async fn stale_controller_is_not_the_live_session() {
    let mut store = load(Storage::in_memory()).await;
    let first = SubRoundRef::new(0, 0, 0);

    let mut stale = started(store.start_session(first, ManualTimers::new()).unwrap());
    play(&mut stale, 10);
    store.finish_session(&stale).unwrap();

    let next = SubRoundRef::new(0, 0, 1);
    let _live = started(store.start_session(next, ManualTimers::new()).unwrap());
    let err = store.finish_session(&stale).unwrap_err();
    assert!(matches!(err, StoreError::NoActiveSession(at) if at == first));
}

#[tokio::test]
async fn abandoning_leaves_progress_untouched() {
    let mut store = load(Storage::in_memory()).await;
    let before = store.progress().clone();
    let first = SubRoundRef::new(0, 0, 0);

    let mut session = started(store.start_session(first, ManualTimers::new()).unwrap());
    session.submit_answer(0).unwrap();
    store.abandon_session(session);

    assert_eq!(store.progress(), &before);
    assert_eq!(store.active_session(), None);
    assert!(store.list_attempts(first).await.unwrap().is_empty());
    assert!(matches!(
        store.start_session(first, ManualTimers::new()).unwrap(),
        SessionStart::Started(_)
    ));
}

#[tokio::test]
async fn round_completion_delivers_treasure_box() {
    let sink = Arc::new(RecordingSink::default());
    let mut store = load(Storage::in_memory()).await.with_reward_sink(sink.clone());

    store.complete_sub_round(SubRoundRef::new(0, 0, 0), 3).unwrap();
    store.complete_sub_round(SubRoundRef::new(0, 0, 1), 2).unwrap();

    let shown = sink.shown.lock().unwrap().clone();
    assert_eq!(shown.len(), 1);
    let (source, rewards) = &shown[0];
    assert_eq!(*source, NodeRef::Round(SubRoundRef::new(0, 0, 0).round_ref()));
    assert_eq!(rewards.stars, 5);
    assert!(rewards.badges.contains("easy-round-1"));
    assert_eq!(store.current_frontier(), Some(SubRoundRef::new(0, 1, 0)));
}

#[tokio::test]
async fn saved_progress_is_resumed() {
    let storage = Storage::in_memory();
    let mut store = load(storage.clone()).await;
    store.complete_sub_round(SubRoundRef::new(0, 0, 0), 2).unwrap();
    store.flush().await;
    let expected = store.progress().clone();
    drop(store);

    let store = load(storage).await;
    assert_eq!(store.progress(), &expected);
    assert_eq!(store.current_frontier(), Some(SubRoundRef::new(0, 0, 1)));
}

#[tokio::test]
async fn mismatched_snapshot_falls_back_to_fresh_tree() {
    let storage = Storage::in_memory();
    let other_shape = QuestShape::new(1, 1, 2, 10).unwrap();
    let other = QuestProgress::build(&other_shape, &RewardTable::standard(), &bank()).unwrap();
    storage.progress.save_progress(&other).await.unwrap();

    let store = load(storage).await;
    assert!(store.progress().conforms_to(&shape()));
    assert_eq!(store.current_frontier(), Some(SubRoundRef::new(0, 0, 0)));
}

#[tokio::test]
async fn snapshot_with_malformed_question_falls_back_to_fresh_tree() {
    let repo = Arc::new(JsonRepository::default());
    let saved = QuestProgress::build(&shape(), &RewardTable::standard(), &bank()).unwrap();
    repo.save_progress(&saved).await.unwrap();
    {
        let mut payload = repo.payload.lock().unwrap();
        let json = payload.take().unwrap();
        let corrupted = json.replacen(
            r#""options":["Yes","No","Sometimes"],"correct_index":0"#,
            r#""options":["only"],"correct_index":7"#,
            1,
        );
        assert_ne!(corrupted, json);
        *payload = Some(corrupted);
    }
    let storage = Storage {
        progress: repo.clone(),
        attempts: Arc::new(storage::repository::InMemoryRepository::default()),
    };

    let mut store = load(storage).await;
    let first = SubRoundRef::new(0, 0, 0);
    assert_eq!(store.current_frontier(), Some(first));
    let mut session = started(store.start_session(first, ManualTimers::new()).unwrap());
    assert!(session.questions().iter().all(|q| q.options().len() >= 2));
    play(&mut session, 10);
    assert!(matches!(
        store.finish_session(&session).unwrap(),
        StoreUpdate::Applied(_)
    ));
}

#[tokio::test]
async fn fresh_tree_is_saved_before_any_play() {
    let storage = Storage::in_memory();
    let store = load(storage.clone()).await;
    store.flush().await;

    let saved = storage.progress.load_progress().await.unwrap();
    assert_eq!(saved.as_ref(), Some(store.progress()));
}

#[tokio::test]
async fn persistence_failures_keep_in_memory_progress() {
    let mut store = load(failing_storage()).await;
    assert_eq!(store.current_frontier(), Some(SubRoundRef::new(0, 0, 0)));

    store.complete_sub_round(SubRoundRef::new(0, 0, 0), 3).unwrap();
    store.flush().await;

    assert_eq!(store.current_frontier(), Some(SubRoundRef::new(0, 0, 1)));
    assert_eq!(
        store
            .progress()
            .sub_round(SubRoundRef::new(0, 0, 0))
            .unwrap()
            .stars(),
        3
    );
    assert!(matches!(
        store.list_attempts(SubRoundRef::new(0, 0, 0)).await,
        Err(StoreError::Storage(StorageError::Connection(_)))
    ));
}

#[tokio::test]
async fn reset_restores_initial_statuses() {
    let storage = Storage::in_memory();
    let mut store = load(storage.clone()).await;
    let questions_before = store
        .progress()
        .sub_round(SubRoundRef::new(0, 0, 0))
        .unwrap()
        .questions()
        .to_vec();
    store.complete_sub_round(SubRoundRef::new(0, 0, 0), 3).unwrap();

    let update = store.reset().unwrap();
    assert_eq!(update, StoreUpdate::Applied(vec![ProgressEvent::Reset]));
    assert_eq!(store.current_frontier(), Some(SubRoundRef::new(0, 0, 0)));
    assert_eq!(store.progress().total_stars(), 0);
    assert_eq!(
        store
            .progress()
            .sub_round(SubRoundRef::new(0, 0, 0))
            .unwrap()
            .questions(),
        questions_before.as_slice()
    );

    store.flush().await;
    assert_eq!(
        storage.progress.load_progress().await.unwrap().as_ref(),
        Some(store.progress())
    );
}
