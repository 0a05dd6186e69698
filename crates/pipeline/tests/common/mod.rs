#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use vidgen_core::error::CoreError;
use vidgen_core::ffmpeg::FfmpegError;
use vidgen_core::generation::{clamp_pagination, VIDEO_SERVICE_TYPE};
use vidgen_core::types::DbId;
use vidgen_db::models::ai_service_config::AiServiceConfig;
use vidgen_db::models::episode::Episode;
use vidgen_db::models::image_generation::ImageGeneration;
use vidgen_db::models::status::{ImageGenerationStatus, StatusId, VideoGenerationStatus};
use vidgen_db::models::storyboard::Storyboard;
use vidgen_db::models::video_generation::{
    CreateVideoGeneration, VideoGeneration, VideoGenerationListQuery, VideoGenerationResult,
};
use vidgen_pipeline::cache::{ArtifactCache, CacheError, DurationProbe};
use vidgen_pipeline::resolver::ProviderConfigSource;
use vidgen_pipeline::{
    CompletionHandler, JobStore, PipelineConfig, PipelineError, ProviderResolver,
    VideoGenerationService,
};
use vidgen_providers::{
    GenerateOutcome, GenerationOptions, ProviderError, ProviderRegistry, TaskStatus, VideoClient,
};

pub const POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const MAX_ATTEMPTS: u32 = 5;

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct State {
    next_id: DbId,
    jobs: BTreeMap<DbId, VideoGeneration>,
    storyboards: HashMap<DbId, Storyboard>,
    images: HashMap<DbId, ImageGeneration>,
    episodes: HashMap<DbId, Episode>,
    /// Every status each job has been written with, in order.
    history: HashMap<DbId, Vec<StatusId>>,
    fail_storyboard_updates: bool,
}

impl State {
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn transition(&mut self, id: DbId, from: &[VideoGenerationStatus], to: VideoGenerationStatus) -> Option<&mut VideoGeneration> {
        let allowed = self
            .jobs
            .get(&id)
            .is_some_and(|job| from.iter().any(|s| s.id() == job.status_id));
        if !allowed {
            return None;
        }
        self.history.entry(id).or_default().push(to.id());
        let job = self.jobs.get_mut(&id)?;
        job.status_id = to.id();
        job.updated_at = Utc::now();
        Some(job)
    }
}

/// [`JobStore`] holding everything in memory with the same conditional
/// write semantics as the Postgres store.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_episode(&self, id: DbId, drama_id: DbId) {
        let now = Utc::now();
        self.state.lock().unwrap().episodes.insert(
            id,
            Episode {
                id,
                drama_id,
                episode_number: 1,
                title: format!("Episode {id}"),
                created_at: now,
                updated_at: now,
            },
        );
    }

    pub fn add_storyboard(
        &self,
        id: DbId,
        episode_id: DbId,
        drama_id: DbId,
        duration: i32,
        image_prompt: Option<&str>,
    ) {
        let now = Utc::now();
        self.state.lock().unwrap().storyboards.insert(
            id,
            Storyboard {
                id,
                episode_id,
                drama_id,
                storyboard_number: id as i32,
                image_prompt: image_prompt.map(str::to_string),
                duration,
                video_url: None,
                created_at: now,
                updated_at: now,
            },
        );
    }

    pub fn add_image(
        &self,
        id: DbId,
        drama_id: DbId,
        storyboard_id: Option<DbId>,
        image_url: Option<&str>,
        status: ImageGenerationStatus,
    ) {
        let now = Utc::now();
        self.state.lock().unwrap().images.insert(
            id,
            ImageGeneration {
                id,
                drama_id,
                storyboard_id,
                prompt: format!("storyboard image {id}"),
                image_url: image_url.map(str::to_string),
                status_id: status.id(),
                created_at: now,
                updated_at: now,
            },
        );
    }

    /// Insert a job directly, as a previous process would have left it.
    pub fn seed_job(
        &self,
        drama_id: DbId,
        status: VideoGenerationStatus,
        task_id: Option<&str>,
    ) -> DbId {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        let mut job = job_row(id, drama_id);
        job.status_id = status.id();
        job.task_id = task_id.map(str::to_string);
        state.history.insert(id, vec![status.id()]);
        state.jobs.insert(id, job);
        id
    }

    /// Change a job's status as an external actor would.
    pub fn force_status(&self, id: DbId, status: VideoGenerationStatus, error: Option<&str>) {
        let mut state = self.state.lock().unwrap();
        state.history.entry(id).or_default().push(status.id());
        let job = state.jobs.get_mut(&id).unwrap();
        job.status_id = status.id();
        job.error_message = error.map(str::to_string);
    }

    pub fn fail_storyboard_updates(&self) {
        self.state.lock().unwrap().fail_storyboard_updates = true;
    }

    pub fn job(&self, id: DbId) -> VideoGeneration {
        self.state.lock().unwrap().jobs[&id].clone()
    }

    pub fn storyboard(&self, id: DbId) -> Storyboard {
        self.state.lock().unwrap().storyboards[&id].clone()
    }

    pub fn job_count(&self) -> usize {
        self.state.lock().unwrap().jobs.len()
    }

    pub fn status_history(&self, id: DbId) -> Vec<VideoGenerationStatus> {
        self.state.lock().unwrap().history[&id]
            .iter()
            .map(|s| VideoGenerationStatus::from_id(*s).unwrap())
            .collect()
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn insert_job(
        &self,
        input: &CreateVideoGeneration,
    ) -> Result<VideoGeneration, PipelineError> {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        let mut job = job_row(id, input.drama_id);
        job.storyboard_id = input.storyboard_id;
        job.image_gen_id = input.image_gen_id;
        job.provider = input.provider.clone();
        job.model = input.model.clone();
        job.reference_mode = input.reference_mode.clone();
        job.image_url = input.image_url.clone();
        job.first_frame_url = input.first_frame_url.clone();
        job.last_frame_url = input.last_frame_url.clone();
        job.reference_image_urls = input.reference_image_urls.clone();
        job.prompt = input.prompt.clone();
        job.duration = input.duration;
        job.fps = input.fps;
        job.aspect_ratio = input.aspect_ratio.clone();
        job.style = input.style.clone();
        job.motion_level = input.motion_level;
        job.camera_motion = input.camera_motion.clone();
        job.seed = input.seed;
        state
            .history
            .insert(id, vec![VideoGenerationStatus::Pending.id()]);
        state.jobs.insert(id, job.clone());
        Ok(job)
    }

    async fn find_job(&self, id: DbId) -> Result<Option<VideoGeneration>, PipelineError> {
        Ok(self.state.lock().unwrap().jobs.get(&id).cloned())
    }

    async fn job_status(&self, id: DbId) -> Result<Option<StatusId>, PipelineError> {
        Ok(self.state.lock().unwrap().jobs.get(&id).map(|j| j.status_id))
    }

    async fn mark_processing(&self, id: DbId) -> Result<bool, PipelineError> {
        let mut state = self.state.lock().unwrap();
        Ok(state
            .transition(
                id,
                &[VideoGenerationStatus::Pending],
                VideoGenerationStatus::Processing,
            )
            .is_some())
    }

    async fn set_task_id(&self, id: DbId, task_id: &str) -> Result<bool, PipelineError> {
        let mut state = self.state.lock().unwrap();
        match state.jobs.get_mut(&id) {
            Some(job) if job.status_id == VideoGenerationStatus::Processing.id() => {
                job.task_id = Some(task_id.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn complete(
        &self,
        id: DbId,
        result: &VideoGenerationResult,
    ) -> Result<bool, PipelineError> {
        let mut state = self.state.lock().unwrap();
        let Some(job) = state.transition(
            id,
            &[VideoGenerationStatus::Processing],
            VideoGenerationStatus::Completed,
        ) else {
            return Ok(false);
        };
        job.video_url = Some(result.video_url.clone());
        job.duration = result.duration.or(job.duration);
        job.width = result.width.or(job.width);
        job.height = result.height.or(job.height);
        job.error_message = None;
        job.completed_at = Some(Utc::now());
        Ok(true)
    }

    async fn fail(&self, id: DbId, message: &str) -> Result<bool, PipelineError> {
        let mut state = self.state.lock().unwrap();
        let Some(job) = state.transition(
            id,
            &[
                VideoGenerationStatus::Pending,
                VideoGenerationStatus::Processing,
            ],
            VideoGenerationStatus::Failed,
        ) else {
            return Ok(false);
        };
        job.error_message = Some(message.to_string());
        job.completed_at = Some(Utc::now());
        Ok(true)
    }

    async fn list_jobs(
        &self,
        query: &VideoGenerationListQuery,
    ) -> Result<(Vec<VideoGeneration>, i64), PipelineError> {
        let (limit, offset) = clamp_pagination(query.limit, query.offset);
        let state = self.state.lock().unwrap();
        let mut matching: Vec<VideoGeneration> = state
            .jobs
            .values()
            .filter(|j| query.drama_id.map_or(true, |d| j.drama_id == d))
            .filter(|j| query.storyboard_id.map_or(true, |s| j.storyboard_id == Some(s)))
            .filter(|j| query.status_id.map_or(true, |s| j.status_id == s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn delete_job(&self, id: DbId) -> Result<bool, PipelineError> {
        Ok(self.state.lock().unwrap().jobs.remove(&id).is_some())
    }

    async fn list_recoverable(&self) -> Result<Vec<VideoGeneration>, PipelineError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .jobs
            .values()
            .filter(|j| j.is_processing() && j.provider_task_id().is_some())
            .cloned()
            .collect())
    }

    async fn find_storyboard(&self, id: DbId) -> Result<Option<Storyboard>, PipelineError> {
        Ok(self.state.lock().unwrap().storyboards.get(&id).cloned())
    }

    async fn list_episode_storyboards(
        &self,
        episode_id: DbId,
    ) -> Result<Vec<Storyboard>, PipelineError> {
        let state = self.state.lock().unwrap();
        let mut boards: Vec<Storyboard> = state
            .storyboards
            .values()
            .filter(|s| s.episode_id == episode_id)
            .cloned()
            .collect();
        boards.sort_by_key(|s| (s.storyboard_number, s.id));
        Ok(boards)
    }

    async fn update_storyboard_video(
        &self,
        storyboard_id: DbId,
        video_url: &str,
        duration: Option<i32>,
    ) -> Result<bool, PipelineError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_storyboard_updates {
            return Err(PipelineError::Persistence("storyboard write rejected".into()));
        }
        let Some(storyboard) = state.storyboards.get_mut(&storyboard_id) else {
            return Ok(false);
        };
        storyboard.video_url = Some(video_url.to_string());
        if let Some(duration) = duration {
            storyboard.duration = duration;
        }
        Ok(true)
    }

    async fn find_image_generation(
        &self,
        id: DbId,
    ) -> Result<Option<ImageGeneration>, PipelineError> {
        Ok(self.state.lock().unwrap().images.get(&id).cloned())
    }

    async fn latest_completed_image(
        &self,
        storyboard_id: DbId,
    ) -> Result<Option<ImageGeneration>, PipelineError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .images
            .values()
            .filter(|i| {
                i.storyboard_id == Some(storyboard_id)
                    && i.status_id == ImageGenerationStatus::Completed.id()
            })
            .max_by_key(|i| (i.created_at, i.id))
            .cloned())
    }

    async fn find_episode(&self, id: DbId) -> Result<Option<Episode>, PipelineError> {
        Ok(self.state.lock().unwrap().episodes.get(&id).cloned())
    }
}

/// A blank `pending` job row.
pub fn job_row(id: DbId, drama_id: DbId) -> VideoGeneration {
    let now = Utc::now();
    VideoGeneration {
        id,
        drama_id,
        storyboard_id: None,
        image_gen_id: None,
        provider: "doubao".to_string(),
        model: None,
        reference_mode: "none".to_string(),
        image_url: None,
        first_frame_url: None,
        last_frame_url: None,
        reference_image_urls: None,
        prompt: "a quiet harbour at dawn".to_string(),
        duration: None,
        fps: None,
        aspect_ratio: None,
        style: None,
        motion_level: None,
        camera_motion: None,
        seed: None,
        status_id: VideoGenerationStatus::Pending.id(),
        task_id: None,
        video_url: None,
        width: None,
        height: None,
        error_message: None,
        completed_at: None,
        created_at: now,
        updated_at: now,
    }
}

// ---------------------------------------------------------------------------
// Scripted provider
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GenerateCall {
    pub image_url: Option<String>,
    pub prompt: String,
    pub options: GenerationOptions,
}

/// [`VideoClient`] replaying scripted responses.
///
/// `generate` returns queued outcomes, then `Empty`. `poll_status` returns
/// queued statuses, then the fallback (running unless overridden).
pub struct MockClient {
    generate: Mutex<VecDeque<Result<GenerateOutcome, ProviderError>>>,
    polls: Mutex<VecDeque<Result<TaskStatus, ProviderError>>>,
    fallback: TaskStatus,
    generate_calls: Mutex<Vec<GenerateCall>>,
    poll_calls: AtomicUsize,
}

impl MockClient {
    pub fn new() -> Self {
        Self {
            generate: Mutex::new(VecDeque::new()),
            polls: Mutex::new(VecDeque::new()),
            fallback: TaskStatus::running(),
            generate_calls: Mutex::new(Vec::new()),
            poll_calls: AtomicUsize::new(0),
        }
    }

    pub fn on_generate(self, outcome: Result<GenerateOutcome, ProviderError>) -> Self {
        self.generate.lock().unwrap().push_back(outcome);
        self
    }

    pub fn on_poll(self, status: Result<TaskStatus, ProviderError>) -> Self {
        self.polls.lock().unwrap().push_back(status);
        self
    }

    pub fn with_fallback(mut self, status: TaskStatus) -> Self {
        self.fallback = status;
        self
    }

    pub fn generate_calls(&self) -> Vec<GenerateCall> {
        self.generate_calls.lock().unwrap().clone()
    }

    pub fn poll_count(&self) -> usize {
        self.poll_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VideoClient for MockClient {
    fn provider(&self) -> &str {
        "mock"
    }

    async fn generate(
        &self,
        image_url: Option<&str>,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<GenerateOutcome, ProviderError> {
        self.generate_calls.lock().unwrap().push(GenerateCall {
            image_url: image_url.map(str::to_string),
            prompt: prompt.to_string(),
            options: options.clone(),
        });
        self.generate
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(GenerateOutcome::Empty))
    }

    async fn poll_status(&self, _task_id: &str) -> Result<TaskStatus, ProviderError> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        self.polls
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

pub fn task(id: &str) -> Result<GenerateOutcome, ProviderError> {
    Ok(GenerateOutcome::Task {
        task_id: id.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Cache / probe fakes
// ---------------------------------------------------------------------------

pub struct FakeCache {
    path: Option<PathBuf>,
    fetched: Mutex<Vec<(DbId, String, String)>>,
}

impl FakeCache {
    /// Every fetch succeeds with `path`.
    pub fn serving(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            fetched: Mutex::new(Vec::new()),
        }
    }

    /// Every fetch fails.
    pub fn failing() -> Self {
        Self {
            path: None,
            fetched: Mutex::new(Vec::new()),
        }
    }

    pub fn fetched(&self) -> Vec<(DbId, String, String)> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArtifactCache for FakeCache {
    async fn fetch(&self, job_id: DbId, url: &str, category: &str) -> Result<PathBuf, CacheError> {
        self.fetched
            .lock()
            .unwrap()
            .push((job_id, url.to_string(), category.to_string()));
        self.path.clone().ok_or(CacheError::Status(503))
    }
}

pub struct FakeProbe {
    secs: Option<f64>,
}

impl FakeProbe {
    pub fn reporting(secs: f64) -> Self {
        Self { secs: Some(secs) }
    }

    pub fn failing() -> Self {
        Self { secs: None }
    }
}

#[async_trait]
impl DurationProbe for FakeProbe {
    async fn probe_secs(&self, _path: &Path) -> Result<f64, FfmpegError> {
        self.secs
            .ok_or_else(|| FfmpegError::ParseError("no duration in container".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Provider configuration
// ---------------------------------------------------------------------------

pub struct StaticConfigSource {
    configs: Vec<AiServiceConfig>,
}

#[async_trait]
impl ProviderConfigSource for StaticConfigSource {
    async fn config_for_model(
        &self,
        model: &str,
    ) -> Result<Option<AiServiceConfig>, PipelineError> {
        Ok(self
            .configs
            .iter()
            .find(|c| c.models.iter().any(|m| m == model))
            .cloned())
    }

    async fn default_config(&self) -> Result<Option<AiServiceConfig>, PipelineError> {
        Ok(self.configs.iter().find(|c| c.is_default).cloned())
    }
}

pub fn mock_config() -> AiServiceConfig {
    let now = Utc::now();
    AiServiceConfig {
        id: 1,
        service_type: VIDEO_SERVICE_TYPE.to_string(),
        provider: "mock".to_string(),
        name: "mock video".to_string(),
        base_url: "http://mock.invalid".to_string(),
        api_key: "test-key".to_string(),
        models: vec!["mock-model".to_string()],
        is_default: true,
        is_active: true,
        priority: 0,
        created_at: now,
        updated_at: now,
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub client: Arc<MockClient>,
    pub service: Arc<VideoGenerationService>,
}

pub struct HarnessBuilder {
    client: MockClient,
    cache: Option<Arc<dyn ArtifactCache>>,
    probe: Option<Arc<dyn DurationProbe>>,
    configs: Vec<AiServiceConfig>,
    max_attempts: u32,
}

impl HarnessBuilder {
    pub fn cache(mut self, cache: Arc<dyn ArtifactCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn probe(mut self, probe: Arc<dyn DurationProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// No provider account configured at all.
    pub fn unconfigured(mut self) -> Self {
        self.configs.clear();
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn build(self) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let client = Arc::new(self.client);

        let mut registry = ProviderRegistry::new();
        let shared = Arc::clone(&client);
        registry.register(&["mock"], move |_, _| {
            let client: Arc<dyn VideoClient> = shared.clone();
            client
        });
        let resolver = ProviderResolver::new(
            Arc::new(StaticConfigSource {
                configs: self.configs,
            }),
            Arc::new(registry),
        );

        let job_store: Arc<dyn JobStore> = store.clone();
        let mut completion = CompletionHandler::new(Arc::clone(&job_store));
        if let Some(cache) = self.cache {
            completion = completion.with_cache(cache);
        }
        if let Some(probe) = self.probe {
            completion = completion.with_probe(probe);
        }

        let config = PipelineConfig {
            poll_interval: POLL_INTERVAL,
            poll_max_attempts: self.max_attempts,
            ..PipelineConfig::default()
        };

        let service = VideoGenerationService::new(job_store, resolver, completion, &config);
        Harness {
            store,
            client,
            service,
        }
    }
}

impl Harness {
    pub fn builder(client: MockClient) -> HarnessBuilder {
        HarnessBuilder {
            client,
            cache: None,
            probe: None,
            configs: vec![mock_config()],
            max_attempts: MAX_ATTEMPTS,
        }
    }

    pub fn new(client: MockClient) -> Self {
        Self::builder(client).build()
    }

    /// Wait for every job task started so far.
    pub async fn settle(&self) {
        self.service.pollers().join_all().await;
    }
}

pub fn is_validation(err: &PipelineError) -> bool {
    matches!(err, PipelineError::Core(CoreError::Validation(_)))
}
