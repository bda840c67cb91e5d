//! End-to-end pipeline tests over in-memory backends.
//!
//! Each test drives the real dispatcher and worker against fake
//! persistence, so the full contract is exercised: guard, lock, predict,
//! afford, record, enqueue, execute, settle, notify.

use async_trait::async_trait;
use chrono::Utc;
use fabula_core::{
    ActualCost, ChapterSnapshot, CharacterSheet, CreditKind, CreditModifiers, GenerationKind,
    GuidePart, JobSpec, JobStatus, LocationSheet, ModelTier, PricingConfig, StorySnapshot,
    SummaryEntry, TierPricing,
};
use fabula_error::{DispatchErrorKind, FabulaError, FabulaResult};
use fabula_interface::{
    Completion, CreditLedger, GenerationEvent, GenerationJobRepository, GenerationLock, JobRecord,
    MediaStorage, ModelDriver, Notifier, PricingStore, StoryStore, TaskQueue,
};
use fabula_pipeline::{
    CostEstimator, InProcessQueue, JobDispatcher, JobWorker, TtlLock, dispatch_rejection,
    spawn_workers,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const USER: i32 = 7;
const STORY: i32 = 1;
const CHAPTER_ONE_ID: i32 = 10;
const CHAPTER_TWO_ID: i32 = 11;

fn pricing() -> PricingConfig {
    PricingConfig::new(
        TierPricing::new(0.000999, 0.150, 0.600),
        TierPricing::new(0.000999, 1.100, 4.400),
        40.0,
    )
}

fn modifiers() -> CreditModifiers {
    CreditModifiers::from_pairs([
        ("meta_input".to_string(), 50.0),
        ("meta_output".to_string(), 1.0),
        ("image".to_string(), 2.0),
    ])
}

fn story() -> StorySnapshot {
    StorySnapshot::new(
        STORY,
        USER,
        "The Glass Harbor",
        "A smuggler inherits a lighthouse and the debts that come with it.",
        vec!["fantasy".into(), "mystery".into()],
        "coastal gothics",
        "atmospheric, close third person",
        2,
        vec![
            ChapterSnapshot::new(CHAPTER_ONE_ID, 1, "Arrival", "Mara lands at the harbor."),
            ChapterSnapshot::new(CHAPTER_TWO_ID, 2, "The Keeper", "The old keeper vanishes."),
        ],
        vec![CharacterSheet::new("Mara", "A smuggler", "\"Not my debt.\"")],
        vec![LocationSheet::new("The Harbor", "Foggy piers")],
        vec!["Act one: arrival and inheritance".into()],
        vec![GuidePart::new(
            "Arrival",
            0,
            "Mara docks at night",
            vec!["Mara".into()],
            vec!["The Harbor".into()],
        )],
    )
}

/// Shared job log and credit pools. Implementing both traits on one
/// struct mirrors the production repositories sharing a database.
#[derive(Default)]
struct MemoryBackend {
    rows: Mutex<Vec<JobRecord>>,
    balances: Mutex<HashMap<(i32, CreditKind), i64>>,
}

impl MemoryBackend {
    fn with_balance(user_id: i32, kind: CreditKind, amount: i64) -> Arc<Self> {
        let backend = Arc::new(Self::default());
        backend.set_balance(user_id, kind, amount);
        backend
    }

    fn set_balance(&self, user_id: i32, kind: CreditKind, amount: i64) {
        self.balances
            .lock()
            .unwrap()
            .insert((user_id, kind), amount);
    }

    fn balance(&self, user_id: i32, kind: CreditKind) -> i64 {
        self.balances
            .lock()
            .unwrap()
            .get(&(user_id, kind))
            .copied()
            .unwrap_or(0)
    }

    fn row(&self, task_id: &str) -> JobRecord {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.task_id == task_id)
            .cloned()
            .expect("job row should exist")
    }

    fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

impl GenerationJobRepository for MemoryBackend {
    fn insert_pending(&self, spec: &JobSpec) -> FabulaResult<()> {
        let now = Utc::now();
        self.rows.lock().unwrap().push(JobRecord {
            task_id: spec.task_id().clone(),
            user_id: *spec.user_id(),
            story_id: *spec.story_id(),
            kind: *spec.kind(),
            status: JobStatus::Pending,
            predicted_cost: *spec.predicted_cost(),
            actual_cost: None,
            input_tokens: None,
            output_tokens: None,
            model: None,
            error: None,
            created_at: now,
            updated_at: now,
        });
        Ok(())
    }

    fn settle_success(
        &self,
        task_id: &str,
        user_id: i32,
        credit_kind: CreditKind,
        actual: &ActualCost,
    ) -> FabulaResult<()> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|r| r.task_id == task_id)
            .expect("settling a job that was never recorded");
        // A redelivered job finds its row already terminal; the debit must
        // not run twice.
        if row.status != JobStatus::Pending {
            return Ok(());
        }
        *self
            .balances
            .lock()
            .unwrap()
            .entry((user_id, credit_kind))
            .or_insert(0) -= actual.total_actual_credit_cost();
        row.status = JobStatus::Succeeded;
        row.actual_cost = Some(*actual.total_actual_credit_cost());
        row.input_tokens = Some(*actual.input_tokens());
        row.output_tokens = Some(*actual.output_tokens());
        row.model = Some(actual.model().clone());
        row.updated_at = Utc::now();
        Ok(())
    }

    fn mark_failed(&self, task_id: &str, message: &str) -> FabulaResult<()> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|r| r.task_id == task_id)
            .expect("failing a job that was never recorded");
        if row.status != JobStatus::Pending {
            return Ok(());
        }
        row.status = JobStatus::Failed;
        row.error = Some(message.to_string());
        row.updated_at = Utc::now();
        Ok(())
    }

    fn latest_for_user(&self, user_id: i32) -> FabulaResult<Option<JobRecord>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|r| r.user_id == user_id)
            .cloned())
    }

    fn by_task_id(&self, task_id: &str) -> FabulaResult<Option<JobRecord>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.task_id == task_id)
            .cloned())
    }

    fn jobs_for_user(&self, user_id: i32, limit: i64) -> FabulaResult<Vec<JobRecord>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

impl CreditLedger for MemoryBackend {
    fn available(&self, user_id: i32, kind: CreditKind) -> FabulaResult<i64> {
        Ok(self.balance(user_id, kind))
    }

    fn can_afford(&self, user_id: i32, kind: CreditKind, amount: i64) -> FabulaResult<bool> {
        Ok(self.balance(user_id, kind) >= amount)
    }

    fn credit(&self, user_id: i32, kind: CreditKind, amount: i64) -> FabulaResult<i64> {
        let mut balances = self.balances.lock().unwrap();
        let balance = balances.entry((user_id, kind)).or_insert(0);
        *balance += amount;
        Ok(*balance)
    }
}

#[derive(Default)]
struct StoreState {
    meta: Option<(Vec<CharacterSheet>, Vec<LocationSheet>)>,
    arcs: Option<Vec<String>>,
    guide: Option<Vec<GuidePart>>,
    summaries: Option<Vec<SummaryEntry>>,
    chapter_content: HashMap<i32, String>,
    cover_image: Option<(String, String)>,
    chapter_images: HashMap<i32, (String, String)>,
}

struct MemoryStories {
    snapshot: StorySnapshot,
    state: Mutex<StoreState>,
}

impl MemoryStories {
    fn new(snapshot: StorySnapshot) -> Self {
        Self {
            snapshot,
            state: Mutex::new(StoreState::default()),
        }
    }
}

impl StoryStore for MemoryStories {
    fn load_story(&self, story_id: i32, user_id: i32) -> FabulaResult<Option<StorySnapshot>> {
        if story_id == *self.snapshot.id() && user_id == *self.snapshot.user_id() {
            Ok(Some(self.snapshot.clone()))
        } else {
            Ok(None)
        }
    }

    fn replace_meta(
        &self,
        _story_id: i32,
        characters: &[CharacterSheet],
        locations: &[LocationSheet],
    ) -> FabulaResult<()> {
        self.state.lock().unwrap().meta = Some((characters.to_vec(), locations.to_vec()));
        Ok(())
    }

    fn replace_arcs(&self, _story_id: i32, arcs: &[String]) -> FabulaResult<()> {
        self.state.lock().unwrap().arcs = Some(arcs.to_vec());
        Ok(())
    }

    fn replace_guide(&self, _story_id: i32, parts: &[GuidePart]) -> FabulaResult<()> {
        self.state.lock().unwrap().guide = Some(parts.to_vec());
        Ok(())
    }

    fn apply_summaries(
        &self,
        _story_id: i32,
        entries: &[SummaryEntry],
    ) -> FabulaResult<Vec<ChapterSnapshot>> {
        self.state.lock().unwrap().summaries = Some(entries.to_vec());
        Ok(self.snapshot.chapters().clone())
    }

    fn set_chapter_content(&self, chapter_id: i32, content: &str) -> FabulaResult<()> {
        self.state
            .lock()
            .unwrap()
            .chapter_content
            .insert(chapter_id, content.to_string());
        Ok(())
    }

    fn set_cover_image(&self, _story_id: i32, key: &str, prompt: &str) -> FabulaResult<()> {
        self.state.lock().unwrap().cover_image = Some((key.to_string(), prompt.to_string()));
        Ok(())
    }

    fn set_chapter_image(&self, chapter_id: i32, key: &str, prompt: &str) -> FabulaResult<()> {
        self.state
            .lock()
            .unwrap()
            .chapter_images
            .insert(chapter_id, (key.to_string(), prompt.to_string()));
        Ok(())
    }
}

struct FixedPricing;

impl PricingStore for FixedPricing {
    fn pricing(&self) -> FabulaResult<PricingConfig> {
        Ok(pricing())
    }

    fn modifiers(&self) -> FabulaResult<CreditModifiers> {
        Ok(modifiers())
    }
}

struct ScriptedDriver {
    output: Mutex<String>,
    image_bytes: Vec<u8>,
}

impl ScriptedDriver {
    fn new(output: &str) -> Self {
        Self {
            output: Mutex::new(output.to_string()),
            image_bytes: vec![0xFF, 0xD8, 0xFF],
        }
    }
}

#[async_trait]
impl ModelDriver for ScriptedDriver {
    async fn complete(&self, _prompt: &str, _tier: ModelTier) -> FabulaResult<Completion> {
        Ok(Completion::new(self.output.lock().unwrap().clone()))
    }

    async fn generate_image(&self, _prompt: &str) -> FabulaResult<Vec<u8>> {
        Ok(self.image_bytes.clone())
    }

    fn model_id(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Standard => "gpt-4o-mini",
            ModelTier::Premium => "o1-mini",
        }
    }

    fn image_model_id(&self) -> &str {
        "pixel-forge-1"
    }
}

#[derive(Default)]
struct MemoryStorage {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl MediaStorage for MemoryStorage {
    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> FabulaResult<()> {
        self.objects.lock().unwrap().insert(key.to_string(), bytes);
        Ok(())
    }

    async fn url(&self, key: &str) -> FabulaResult<String> {
        Ok(format!("http://media.test/{key}"))
    }

    async fn delete_prefix(&self, prefix: &str) -> FabulaResult<()> {
        self.objects
            .lock()
            .unwrap()
            .retain(|k, _| !k.starts_with(prefix));
        Ok(())
    }
}

#[derive(Default)]
struct CollectingNotifier {
    events: Mutex<Vec<(i32, GenerationEvent)>>,
}

impl CollectingNotifier {
    fn events(&self) -> Vec<(i32, GenerationEvent)> {
        self.events.lock().unwrap().clone()
    }
}

impl Notifier for CollectingNotifier {
    fn emit(&self, user_id: i32, event: GenerationEvent) {
        self.events.lock().unwrap().push((user_id, event));
    }
}

/// Queue that records specs for the test to hand to the worker manually.
#[derive(Default)]
struct CollectingQueue {
    specs: Mutex<Vec<JobSpec>>,
}

impl CollectingQueue {
    fn pop(&self) -> JobSpec {
        self.specs
            .lock()
            .unwrap()
            .pop()
            .expect("a job should have been enqueued")
    }

    fn len(&self) -> usize {
        self.specs.lock().unwrap().len()
    }
}

#[async_trait]
impl TaskQueue for CollectingQueue {
    async fn enqueue(&self, spec: JobSpec) -> FabulaResult<String> {
        let task_id = spec.task_id().clone();
        self.specs.lock().unwrap().push(spec);
        Ok(task_id)
    }
}

struct Harness {
    backend: Arc<MemoryBackend>,
    stories: Arc<MemoryStories>,
    queue: Arc<CollectingQueue>,
    lock: Arc<TtlLock>,
    storage: Arc<MemoryStorage>,
    notifier: Arc<CollectingNotifier>,
    dispatcher: JobDispatcher,
    worker: JobWorker,
}

impl Harness {
    fn new(model_output: &str, text_credits: i64, image_credits: i64) -> Self {
        let backend = MemoryBackend::with_balance(USER, CreditKind::Text, text_credits);
        backend.set_balance(USER, CreditKind::Image, image_credits);
        let stories = Arc::new(MemoryStories::new(story()));
        let pricing_store = Arc::new(FixedPricing);
        let queue = Arc::new(CollectingQueue::default());
        let lock = Arc::new(TtlLock::default());
        let driver = Arc::new(ScriptedDriver::new(model_output));
        let storage = Arc::new(MemoryStorage::default());
        let notifier = Arc::new(CollectingNotifier::default());

        let dispatcher = JobDispatcher::new(
            backend.clone(),
            backend.clone(),
            stories.clone(),
            pricing_store.clone(),
            queue.clone(),
            lock.clone(),
            driver.clone(),
        );
        let worker = JobWorker::new(
            driver,
            storage.clone(),
            backend.clone(),
            stories.clone(),
            pricing_store,
            lock.clone(),
            notifier.clone(),
        );
        Self {
            backend,
            stories,
            queue,
            lock,
            storage,
            notifier,
            dispatcher,
            worker,
        }
    }
}

fn rejection(err: &FabulaError) -> &DispatchErrorKind {
    dispatch_rejection(err).expect("expected a dispatch rejection")
}

const METADATA_OUTPUT: &str = r#"{
    "characters": [{"name": "Bren", "description": "The vanished keeper", "example_dialogue": "Mind the light."}],
    "locations": [{"name": "The Lamp Room", "description": "Salt-streaked glass"}]
}"#;

#[tokio::test]
async fn test_metadata_flow_persists_and_settles() {
    let h = Harness::new(METADATA_OUTPUT, 1_000, 0);

    let receipt = h.dispatcher.dispatch_metadata(USER, STORY).await.unwrap();
    assert_eq!(receipt.status(), "queued");
    let row = h.backend.row(receipt.task_id());
    assert_eq!(row.status, JobStatus::Pending);
    assert_eq!(row.predicted_cost, *receipt.predicted_cost());

    let spec = h.queue.pop();
    assert!(!spec.holds_lock());
    let input_tokens = *spec.input_tokens();
    h.worker.execute(spec).await;

    let state = h.stories.state.lock().unwrap();
    let (characters, locations) = state.meta.as_ref().unwrap();
    assert_eq!(characters[0].name(), "Bren");
    assert_eq!(locations[0].name(), "The Lamp Room");
    drop(state);

    let expected = CostEstimator::new(pricing(), modifiers())
        .reconcile(
            GenerationKind::Metadata,
            input_tokens,
            METADATA_OUTPUT,
            "gpt-4o-mini",
        )
        .unwrap();
    let row = h.backend.row(receipt.task_id());
    assert_eq!(row.status, JobStatus::Succeeded);
    assert_eq!(row.actual_cost, Some(*expected.total_actual_credit_cost()));
    assert_eq!(row.model.as_deref(), Some("gpt-4o-mini"));
    assert_eq!(
        h.backend.balance(USER, CreditKind::Text),
        1_000 - expected.total_actual_credit_cost()
    );
    assert_eq!(
        h.notifier.events(),
        vec![(USER, GenerationEvent::MetaGenerated { story_id: STORY })]
    );
}

#[tokio::test]
async fn test_insufficient_credits_rejects_without_recording() {
    let h = Harness::new(METADATA_OUTPUT, 0, 0);
    let err = h.dispatcher.dispatch_arcs(USER, STORY).await.unwrap_err();
    assert!(matches!(
        rejection(&err),
        DispatchErrorKind::InsufficientCredits { available: 0, .. }
    ));
    assert_eq!(h.backend.row_count(), 0);
    assert_eq!(h.queue.len(), 0);
    // The rejected dispatch must not leave the lock behind.
    assert!(h.lock.acquire(USER));
}

#[tokio::test]
async fn test_lock_blocks_concurrent_narrative_dispatch() {
    let h = Harness::new(r#"["Act one", "Act two"]"#, 10_000, 0);

    h.dispatcher.dispatch_arcs(USER, STORY).await.unwrap();
    let spec = h.queue.pop();
    assert!(spec.holds_lock());

    let err = h
        .dispatcher
        .dispatch_summaries(USER, STORY)
        .await
        .unwrap_err();
    assert!(matches!(
        rejection(&err),
        DispatchErrorKind::GenerationInProgress
    ));

    // Completion releases the lock and dispatch works again.
    h.worker.execute(spec).await;
    assert_eq!(
        h.stories.state.lock().unwrap().arcs,
        Some(vec!["Act one".to_string(), "Act two".to_string()])
    );
    h.dispatcher.dispatch_arcs(USER, STORY).await.unwrap();
}

#[tokio::test]
async fn test_metadata_dispatch_leaves_lock_free() {
    let h = Harness::new(METADATA_OUTPUT, 10_000, 0);
    h.dispatcher.dispatch_metadata(USER, STORY).await.unwrap();
    // An unlocked kind pending does not block a locked kind.
    h.dispatcher.dispatch_arcs(USER, STORY).await.unwrap();
}

#[tokio::test]
async fn test_overdraft_guard_blocks_repeat_kind_on_empty_pool() {
    let h = Harness::new(METADATA_OUTPUT, 1_000, 0);
    let receipt = h.dispatcher.dispatch_metadata(USER, STORY).await.unwrap();
    h.worker.execute(h.queue.pop()).await;
    assert_eq!(
        h.backend.row(receipt.task_id()).status,
        JobStatus::Succeeded
    );

    h.backend.set_balance(USER, CreditKind::Text, 0);
    let err = h
        .dispatcher
        .dispatch_metadata(USER, STORY)
        .await
        .unwrap_err();
    assert!(matches!(rejection(&err), DispatchErrorKind::OverdraftBlocked));

    // A different kind is not guarded; it fails on affordability instead.
    let err = h.dispatcher.dispatch_arcs(USER, STORY).await.unwrap_err();
    assert!(matches!(
        rejection(&err),
        DispatchErrorKind::InsufficientCredits { .. }
    ));
}

#[tokio::test]
async fn test_redelivered_job_settles_once() {
    let h = Harness::new(METADATA_OUTPUT, 1_000, 0);
    let receipt = h.dispatcher.dispatch_metadata(USER, STORY).await.unwrap();
    let spec = h.queue.pop();
    let redelivery = spec.clone();

    h.worker.execute(spec).await;
    let row = h.backend.row(receipt.task_id());
    let settled_cost = row.actual_cost.expect("first execution settles");
    let balance = h.backend.balance(USER, CreditKind::Text);
    assert_eq!(balance, 1_000 - settled_cost);

    // The queue delivers at least once; a second execution of the same
    // spec must not debit again or rewrite the terminal row.
    h.worker.execute(redelivery).await;
    let row = h.backend.row(receipt.task_id());
    assert_eq!(row.status, JobStatus::Succeeded);
    assert_eq!(row.actual_cost, Some(settled_cost));
    assert_eq!(h.backend.balance(USER, CreditKind::Text), balance);
}

#[tokio::test]
async fn test_parse_failure_fails_job_without_debit() {
    let h = Harness::new("Sure! Here are your story arcs:", 10_000, 0);
    let receipt = h.dispatcher.dispatch_arcs(USER, STORY).await.unwrap();
    h.worker.execute(h.queue.pop()).await;

    let row = h.backend.row(receipt.task_id());
    assert_eq!(row.status, JobStatus::Failed);
    assert!(row.error.is_some());
    assert_eq!(row.actual_cost, None);
    assert_eq!(h.backend.balance(USER, CreditKind::Text), 10_000);
    assert!(h.stories.state.lock().unwrap().arcs.is_none());

    let events = h.notifier.events();
    assert!(matches!(
        &events[0].1,
        GenerationEvent::GenerationFailed { kind: GenerationKind::StoryArcs, .. }
    ));
    // Failure released the lock.
    assert!(h.lock.acquire(USER));
}

#[tokio::test]
async fn test_degenerate_metadata_fails_job() {
    let h = Harness::new(r#"{"characters": [], "locations": []}"#, 10_000, 0);
    let receipt = h.dispatcher.dispatch_metadata(USER, STORY).await.unwrap();
    h.worker.execute(h.queue.pop()).await;

    let row = h.backend.row(receipt.task_id());
    assert_eq!(row.status, JobStatus::Failed);
    assert_eq!(h.backend.balance(USER, CreditKind::Text), 10_000);
    assert!(h.stories.state.lock().unwrap().meta.is_none());
}

#[tokio::test]
async fn test_chapter_content_persists_prose() {
    let prose = "Mara climbed the lighthouse stairs two at a time.";
    let h = Harness::new(prose, 10_000, 0);
    let receipt = h.dispatcher.dispatch_chapter(USER, STORY, 2).await.unwrap();

    let spec = h.queue.pop();
    assert!(spec.holds_lock());
    h.worker.execute(spec).await;

    assert_eq!(
        h.stories
            .state
            .lock()
            .unwrap()
            .chapter_content
            .get(&CHAPTER_TWO_ID)
            .map(String::as_str),
        Some(prose)
    );
    assert_eq!(
        h.backend.row(receipt.task_id()).status,
        JobStatus::Succeeded
    );
    assert_eq!(
        h.notifier.events(),
        vec![(
            USER,
            GenerationEvent::ChapterGenerated {
                story_id: STORY,
                chapter_number: 2
            }
        )]
    );
    assert!(h.lock.acquire(USER));
}

#[tokio::test]
async fn test_unknown_chapter_rejected_at_dispatch() {
    let h = Harness::new("prose", 10_000, 0);
    let err = h
        .dispatcher
        .dispatch_chapter(USER, STORY, 9)
        .await
        .unwrap_err();
    assert!(matches!(rejection(&err), DispatchErrorKind::ChapterNotFound));
    assert!(h.lock.acquire(USER));
}

#[tokio::test]
async fn test_unknown_story_rejected_at_dispatch() {
    let h = Harness::new(METADATA_OUTPUT, 10_000, 0);
    let err = h.dispatcher.dispatch_metadata(USER, 99).await.unwrap_err();
    assert!(matches!(rejection(&err), DispatchErrorKind::StoryNotFound));
    // Another user's story reads as not found too.
    let err = h.dispatcher.dispatch_metadata(3, STORY).await.unwrap_err();
    assert!(matches!(rejection(&err), DispatchErrorKind::StoryNotFound));
}

#[tokio::test]
async fn test_cover_image_flow() {
    let h = Harness::new("", 0, 100);
    let receipt = h
        .dispatcher
        .dispatch_cover_image(USER, STORY, "a lighthouse at dusk")
        .await
        .unwrap();
    // 40 credits per image, modifier 2.0
    assert_eq!(*receipt.predicted_cost(), 80);

    let spec = h.queue.pop();
    assert_eq!(spec.image_key().as_deref(), Some("stories/1/cover.jpg"));
    assert!(!spec.holds_lock());
    h.worker.execute(spec).await;

    assert!(
        h.storage
            .objects
            .lock()
            .unwrap()
            .contains_key("stories/1/cover.jpg")
    );
    assert_eq!(
        h.stories.state.lock().unwrap().cover_image,
        Some((
            "stories/1/cover.jpg".to_string(),
            "a lighthouse at dusk".to_string()
        ))
    );
    let row = h.backend.row(receipt.task_id());
    assert_eq!(row.status, JobStatus::Succeeded);
    assert_eq!(row.actual_cost, Some(80));
    assert_eq!(row.model.as_deref(), Some("pixel-forge-1"));
    assert_eq!(h.backend.balance(USER, CreditKind::Image), 20);
    assert_eq!(
        h.notifier.events(),
        vec![(
            USER,
            GenerationEvent::ImageGenerated {
                story_id: STORY,
                kind: GenerationKind::CoverImage,
                url: "http://media.test/stories/1/cover.jpg".to_string()
            }
        )]
    );
}

#[tokio::test]
async fn test_chapter_image_requires_existing_chapter() {
    let h = Harness::new("", 0, 100);
    let err = h
        .dispatcher
        .dispatch_chapter_image(USER, STORY, 999, "the lamp room")
        .await
        .unwrap_err();
    assert!(matches!(rejection(&err), DispatchErrorKind::ChapterNotFound));

    let receipt = h
        .dispatcher
        .dispatch_chapter_image(USER, STORY, CHAPTER_ONE_ID, "the lamp room")
        .await
        .unwrap();
    let spec = h.queue.pop();
    assert_eq!(
        spec.image_key().as_deref(),
        Some("stories/1/chapters/10.jpg")
    );
    h.worker.execute(spec).await;
    assert_eq!(
        h.backend.row(receipt.task_id()).status,
        JobStatus::Succeeded
    );
    assert!(
        h.stories
            .state
            .lock()
            .unwrap()
            .chapter_images
            .contains_key(&CHAPTER_ONE_ID)
    );
}

#[tokio::test]
async fn test_dispatch_all_chapters_enqueues_per_chapter() {
    let h = Harness::new("prose", 100_000, 0);
    let receipts = h
        .dispatcher
        .dispatch_all_chapters(USER, STORY)
        .await
        .unwrap();
    assert_eq!(receipts.len(), 2);
    assert_eq!(h.queue.len(), 2);
    assert_eq!(h.backend.row_count(), 2);

    // Batch jobs run unlocked and the batch lock is already released.
    let spec = h.queue.pop();
    assert!(!spec.holds_lock());
    assert!(h.lock.acquire(USER));
}

#[tokio::test]
async fn test_dispatch_all_chapters_requires_batch_affordability() {
    let h = Harness::new("prose", 100_000, 0);
    let single = h
        .dispatcher
        .predict(USER, STORY, GenerationKind::ChapterContent, Some(1))
        .unwrap();
    // Enough for one chapter, not for both.
    h.backend.set_balance(
        USER,
        CreditKind::Text,
        *single.total_predicted_credit_cost(),
    );

    let err = h
        .dispatcher
        .dispatch_all_chapters(USER, STORY)
        .await
        .unwrap_err();
    assert!(matches!(
        rejection(&err),
        DispatchErrorKind::InsufficientCredits { .. }
    ));
    assert_eq!(h.queue.len(), 0);
    assert_eq!(h.backend.row_count(), 0);
    assert!(h.lock.acquire(USER));
}

#[tokio::test]
async fn test_predict_rejects_image_kinds() {
    let h = Harness::new("", 0, 100);
    // Image cost is flat; the token-based predictor refuses image kinds
    // instead of reporting a missing chapter.
    let err = h
        .dispatcher
        .predict(USER, STORY, GenerationKind::CoverImage, None)
        .unwrap_err();
    assert!(matches!(
        rejection(&err),
        DispatchErrorKind::UnsupportedKind(_)
    ));
}

#[tokio::test]
async fn test_predict_has_no_side_effects() {
    let h = Harness::new(METADATA_OUTPUT, 0, 0);
    let predicted = h
        .dispatcher
        .predict(USER, STORY, GenerationKind::Metadata, None)
        .unwrap();
    assert!(*predicted.total_predicted_credit_cost() >= 1);
    assert_eq!(h.predict_image_cost_for_test(), 80);
    assert_eq!(h.backend.row_count(), 0);
    assert_eq!(h.queue.len(), 0);
    assert!(h.lock.acquire(USER));
}

impl Harness {
    fn predict_image_cost_for_test(&self) -> i64 {
        self.dispatcher.predict_image_cost().unwrap()
    }
}

#[tokio::test]
async fn test_worker_pool_drains_queue() {
    let h = Harness::new(METADATA_OUTPUT, 1_000, 0);
    let (queue, rx) = InProcessQueue::new(8);

    let spec = {
        let receipt = h.dispatcher.dispatch_metadata(USER, STORY).await.unwrap();
        let spec = h.queue.pop();
        assert_eq!(spec.task_id(), receipt.task_id());
        spec
    };
    let task_id = spec.task_id().clone();
    queue.enqueue(spec).await.unwrap();
    drop(queue);

    let handles = spawn_workers(2, rx, Arc::new(Harness::new_worker(&h)));
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(h.backend.row(&task_id).status, JobStatus::Succeeded);
}

impl Harness {
    /// A second worker over the same backends, for pool tests.
    fn new_worker(h: &Harness) -> JobWorker {
        JobWorker::new(
            Arc::new(ScriptedDriver::new(METADATA_OUTPUT)),
            h.storage.clone(),
            h.backend.clone(),
            h.stories.clone(),
            Arc::new(FixedPricing),
            h.lock.clone(),
            h.notifier.clone(),
        )
    }
}
