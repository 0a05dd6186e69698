//! Job creation, dispatch and queries.
//!
//! [`VideoGenerationService::generate_video`] validates a request, persists
//! the job and returns it right away; provider dispatch and any polling run
//! afterwards as the job's task in the [`PollerRegistry`].

use std::sync::Arc;

use vidgen_core::error::CoreError;
use vidgen_core::generation::{
    validate_drama_id, validate_generation_params, validate_prompt, DEFAULT_PROVIDER,
    EMPTY_DISPATCH_MESSAGE, MISSING_VIDEO_URL_MESSAGE,
};
use vidgen_core::reference::{
    encode_reference_urls, resolve_reference, ReferenceInput, ReferenceMode,
};
use vidgen_core::types::DbId;
use vidgen_db::models::video_generation::{
    CreateVideoGeneration, VideoGeneration, VideoGenerationListQuery,
};
use vidgen_providers::{GenerateOutcome, VideoClient};

use crate::completion::CompletionHandler;
use crate::config::PipelineConfig;
use crate::dispatch::dispatch_input;
use crate::error::PipelineError;
use crate::poller::{PollSettings, PollTarget, Poller, PollerRegistry};
use crate::request::GenerateVideoRequest;
use crate::resolver::ProviderResolver;
use crate::store::JobStore;

/// Entry point for video generation jobs.
///
/// Created once at startup; clone the `Arc` into whatever drives it.
pub struct VideoGenerationService {
    pub(crate) store: Arc<dyn JobStore>,
    pub(crate) resolver: ProviderResolver,
    pub(crate) completion: Arc<CompletionHandler>,
    pub(crate) poller: Poller,
    pub(crate) pollers: PollerRegistry,
    default_provider: String,
}

impl VideoGenerationService {
    pub fn new(
        store: Arc<dyn JobStore>,
        resolver: ProviderResolver,
        completion: CompletionHandler,
        config: &PipelineConfig,
    ) -> Arc<Self> {
        let completion = Arc::new(completion);
        let poller = Poller::new(
            Arc::clone(&store),
            Arc::clone(&completion),
            PollSettings {
                interval: config.poll_interval,
                max_attempts: config.poll_max_attempts,
            },
        );

        Arc::new(Self {
            store,
            resolver,
            completion,
            poller,
            pollers: PollerRegistry::new(),
            default_provider: config.default_provider.clone(),
        })
    }

    /// Registry of in-flight job tasks.
    pub fn pollers(&self) -> &PollerRegistry {
        &self.pollers
    }

    /// Stop every job task. Jobs stay `processing` and resume through
    /// recovery on the next start.
    pub async fn shutdown(&self) {
        self.pollers.shutdown().await;
    }

    // ---- creation ----

    /// Validate and persist a new job, then dispatch it in the background.
    ///
    /// The returned job is `pending`; generation has not started yet.
    /// Validation, initial provider configuration and persistence failures
    /// are returned here and no job is created.
    pub async fn generate_video(
        self: &Arc<Self>,
        request: GenerateVideoRequest,
    ) -> Result<VideoGeneration, PipelineError> {
        validate_drama_id(request.drama_id)?;
        validate_prompt(&request.prompt)?;
        validate_generation_params(request.duration, request.fps)?;

        if let Some(storyboard_id) = request.storyboard_id {
            let storyboard = self
                .store
                .find_storyboard(storyboard_id)
                .await?
                .ok_or_else(|| {
                    CoreError::Validation(format!("storyboard {storyboard_id} not found"))
                })?;
            if storyboard.drama_id != request.drama_id {
                return Err(CoreError::Validation(format!(
                    "storyboard {storyboard_id} does not belong to drama {}",
                    request.drama_id
                ))
                .into());
            }
        }

        if let Some(image_gen_id) = request.image_gen_id {
            if self.store.find_image_generation(image_gen_id).await?.is_none() {
                return Err(CoreError::Validation(format!(
                    "image generation {image_gen_id} not found"
                ))
                .into());
            }
        }

        let mode = non_empty(request.reference_mode.as_deref())
            .map(str::parse::<ReferenceMode>)
            .transpose()?;
        let reference = resolve_reference(ReferenceInput {
            mode,
            image_url: request.image_url.as_deref(),
            first_frame_url: request.first_frame_url.as_deref(),
            last_frame_url: request.last_frame_url.as_deref(),
            reference_image_urls: &request.reference_image_urls,
        })?;

        let model = non_empty(request.model.as_deref()).map(str::to_string);
        let client = self.resolver.resolve(model.as_deref()).await?;

        let provider = non_empty(request.provider.as_deref())
            .unwrap_or(self.default_provider.as_str())
            .to_string();

        let reference_image_urls = if reference.reference_image_urls.is_empty() {
            None
        } else {
            Some(encode_reference_urls(&reference.reference_image_urls)?)
        };

        let input = CreateVideoGeneration {
            drama_id: request.drama_id,
            storyboard_id: request.storyboard_id,
            image_gen_id: request.image_gen_id,
            provider,
            model,
            reference_mode: reference.mode.as_str().to_string(),
            image_url: reference.image_url,
            first_frame_url: reference.first_frame_url,
            last_frame_url: reference.last_frame_url,
            reference_image_urls,
            prompt: request.prompt,
            duration: request.duration,
            fps: request.fps,
            aspect_ratio: request.aspect_ratio,
            style: request.style,
            motion_level: request.motion_level,
            camera_motion: request.camera_motion,
            seed: request.seed,
        };

        let job = self.store.insert_job(&input).await?;
        tracing::info!(
            job_id = job.id,
            drama_id = job.drama_id,
            provider = %job.provider,
            reference_mode = %job.reference_mode,
            "Video generation job created",
        );

        let this = Arc::clone(self);
        let task_job = job.clone();
        self.pollers
            .spawn(job.id, async move { this.process(task_job, client).await })
            .await;

        Ok(job)
    }

    /// Animate a completed image generation.
    ///
    /// Uses the image's prompt, drama and storyboard, and the storyboard's
    /// current duration.
    pub async fn generate_from_image(
        self: &Arc<Self>,
        image_gen_id: DbId,
    ) -> Result<VideoGeneration, PipelineError> {
        let image = self
            .store
            .find_image_generation(image_gen_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "image_generation",
                id: image_gen_id,
            })?;

        let image_url = image
            .completed_image_url()
            .ok_or_else(|| {
                CoreError::Validation(format!("image generation {image_gen_id} is not ready"))
            })?
            .to_string();

        let duration = match image.storyboard_id {
            Some(storyboard_id) => self
                .store
                .find_storyboard(storyboard_id)
                .await?
                .map(|s| s.duration)
                .filter(|d| *d > 0),
            None => None,
        };

        self.generate_video(GenerateVideoRequest {
            drama_id: image.drama_id,
            storyboard_id: image.storyboard_id,
            image_gen_id: Some(image_gen_id),
            image_url: Some(image_url),
            prompt: image.prompt,
            provider: Some(DEFAULT_PROVIDER.to_string()),
            duration,
            ..GenerateVideoRequest::default()
        })
        .await
    }

    /// Animate the latest completed image of every storyboard in an episode.
    ///
    /// Storyboards without an image prompt or a completed image are skipped,
    /// as are storyboards whose submission fails. Returns the created jobs.
    pub async fn batch_generate_for_episode(
        self: &Arc<Self>,
        episode_id: DbId,
    ) -> Result<Vec<VideoGeneration>, PipelineError> {
        let episode = self
            .store
            .find_episode(episode_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "episode",
                id: episode_id,
            })?;

        let storyboards = self.store.list_episode_storyboards(episode.id).await?;
        let mut created = Vec::new();

        for storyboard in storyboards {
            if non_empty(storyboard.image_prompt.as_deref()).is_none() {
                continue;
            }

            let image = match self.store.latest_completed_image(storyboard.id).await {
                Ok(Some(image)) => image,
                Ok(None) => {
                    tracing::warn!(storyboard_id = storyboard.id, "No completed image for storyboard");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(
                        storyboard_id = storyboard.id,
                        error = %e,
                        "Failed to look up storyboard image",
                    );
                    continue;
                }
            };

            match self.generate_from_image(image.id).await {
                Ok(job) => created.push(job),
                Err(e) => {
                    tracing::error!(
                        storyboard_id = storyboard.id,
                        image_gen_id = image.id,
                        error = %e,
                        "Failed to submit storyboard video",
                    );
                }
            }
        }

        tracing::info!(
            episode_id,
            submitted = created.len(),
            "Episode video generation submitted",
        );
        Ok(created)
    }

    // ---- queries ----

    pub async fn get(&self, id: DbId) -> Result<VideoGeneration, PipelineError> {
        self.store.find_job(id).await?.ok_or_else(|| {
            CoreError::NotFound {
                entity: "video_generation",
                id,
            }
            .into()
        })
    }

    /// Filtered page of jobs, newest first, with the total match count.
    pub async fn list(
        &self,
        query: &VideoGenerationListQuery,
    ) -> Result<(Vec<VideoGeneration>, i64), PipelineError> {
        self.store.list_jobs(query).await
    }

    /// Remove a job record. A live poller for it stops on its next wake.
    pub async fn delete(&self, id: DbId) -> Result<bool, PipelineError> {
        let deleted = self.store.delete_job(id).await?;
        if deleted {
            tracing::info!(job_id = id, "Video generation deleted");
        }
        Ok(deleted)
    }

    // ---- background work ----

    /// Dispatch a freshly created job and follow it to a terminal state.
    async fn process(self: Arc<Self>, job: VideoGeneration, client: Arc<dyn VideoClient>) {
        let job_id = job.id;

        match self.store.mark_processing(job_id).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!(job_id, "Job left pending before dispatch, skipping");
                return;
            }
            Err(e) => {
                tracing::error!(job_id, error = %e, "Failed to mark job processing");
                return;
            }
        }

        let input = match dispatch_input(&job) {
            Ok(input) => input,
            Err(e) => {
                tracing::warn!(job_id, error = %e, "Cannot build provider request");
                let _ = self.completion.fail(job_id, &e.to_string()).await;
                return;
            }
        };

        tracing::info!(
            job_id,
            provider = client.provider(),
            reference_mode = %job.reference_mode,
            "Dispatching video generation",
        );

        match client
            .generate(input.image_url.as_deref(), &job.prompt, &input.options)
            .await
        {
            Ok(GenerateOutcome::Task { task_id }) => {
                match self.store.set_task_id(job_id, &task_id).await {
                    Ok(true) => {}
                    Ok(false) => {
                        tracing::info!(
                            job_id,
                            task_id = %task_id,
                            "Job left processing before task id was recorded",
                        );
                        return;
                    }
                    Err(e) => {
                        // Polling continues, but this job cannot be recovered
                        // after a restart.
                        tracing::error!(
                            job_id,
                            task_id = %task_id,
                            error = %e,
                            "Failed to record task id",
                        );
                    }
                }

                let target = PollTarget {
                    job_id,
                    storyboard_id: job.storyboard_id,
                    task_id,
                    client,
                };
                let outcome = self
                    .poller
                    .run(&target, &self.pollers.cancel_token())
                    .await;
                tracing::debug!(job_id, ?outcome, "Job task finished");
            }
            Ok(GenerateOutcome::Ready(output)) if output.video_url.trim().is_empty() => {
                tracing::warn!(job_id, "Provider returned a result without a video URL");
                let _ = self.completion.fail(job_id, MISSING_VIDEO_URL_MESSAGE).await;
            }
            Ok(GenerateOutcome::Ready(output)) => {
                let _ = self
                    .completion
                    .complete(job_id, job.storyboard_id, output)
                    .await;
            }
            Ok(GenerateOutcome::Empty) => {
                let _ = self.completion.fail(job_id, EMPTY_DISPATCH_MESSAGE).await;
            }
            Err(e) => {
                tracing::error!(job_id, error = %e, "Video generation request failed");
                let _ = self.completion.fail(job_id, &e.to_string()).await;
            }
        }
    }

    /// Start polling a `processing` job from its persisted task id.
    ///
    /// Returns `false` when the job has no task id or already has a live
    /// task.
    pub async fn resume_polling(
        self: &Arc<Self>,
        job: &VideoGeneration,
        client: Arc<dyn VideoClient>,
    ) -> bool {
        let Some(task_id) = job.provider_task_id() else {
            return false;
        };

        let target = PollTarget {
            job_id: job.id,
            storyboard_id: job.storyboard_id,
            task_id: task_id.to_string(),
            client,
        };
        let this = Arc::clone(self);
        self.pollers
            .spawn(job.id, async move {
                let outcome = this
                    .poller
                    .run(&target, &this.pollers.cancel_token())
                    .await;
                tracing::debug!(job_id = target.job_id, ?outcome, "Job task finished");
            })
            .await
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
