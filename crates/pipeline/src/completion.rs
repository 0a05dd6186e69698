//! Terminal transitions for video generation jobs.
//!
//! [`CompletionHandler::complete`] finalizes a successful job:
//!
//! 1. Fetch the artifact into the local cache (best-effort).
//! 2. Re-probe the cached file's duration, rounded up to whole seconds, and
//!    prefer it over the provider value (best-effort).
//! 3. Persist `completed` with the provider's original URL. Failure here is
//!    a hard error and leaves the job in its prior state.
//! 4. Copy URL and duration onto the source storyboard (best-effort).
//!
//! The storyboard copy is a read-optimized view of the job result. A failed
//! copy leaves it stale until the next completion for that storyboard.

use std::path::PathBuf;
use std::sync::Arc;

use vidgen_core::generation::{round_up_duration, CACHE_CATEGORY_VIDEOS};
use vidgen_core::types::DbId;
use vidgen_db::models::video_generation::VideoGenerationResult;
use vidgen_providers::VideoOutput;

use crate::cache::{ArtifactCache, DurationProbe};
use crate::error::PipelineError;
use crate::store::JobStore;

/// Writes the terminal state of a job and its side effects.
pub struct CompletionHandler {
    store: Arc<dyn JobStore>,
    cache: Option<Arc<dyn ArtifactCache>>,
    probe: Option<Arc<dyn DurationProbe>>,
}

impl CompletionHandler {
    /// A handler without cache or probe: provider values are stored as-is.
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self {
            store,
            cache: None,
            probe: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn ArtifactCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_probe(mut self, probe: Arc<dyn DurationProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Finalize a successful job.
    ///
    /// Returns `Ok(false)` when the job had already left `processing`; the
    /// result is then discarded and the storyboard is not touched.
    pub async fn complete(
        &self,
        job_id: DbId,
        storyboard_id: Option<DbId>,
        output: VideoOutput,
    ) -> Result<bool, PipelineError> {
        let cached = self.cache_artifact(job_id, &output.video_url).await;

        let mut duration = output.duration;
        if let Some(path) = cached.as_deref() {
            if let Some(probed) = self.probe_duration(job_id, path).await {
                duration = Some(probed);
            }
        }

        let result = VideoGenerationResult {
            video_url: output.video_url,
            duration,
            width: output.width,
            height: output.height,
        };

        match self.store.complete(job_id, &result).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!(job_id, "Job no longer processing, completion discarded");
                return Ok(false);
            }
            Err(e) => {
                tracing::error!(job_id, error = %e, "Failed to persist video completion");
                return Err(e);
            }
        }

        if let Some(storyboard_id) = storyboard_id {
            self.propagate_to_storyboard(job_id, storyboard_id, &result)
                .await;
        }

        tracing::info!(
            job_id,
            video_url = %result.video_url,
            duration = ?result.duration,
            "Video generation completed",
        );
        Ok(true)
    }

    /// Fail a pending or processing job with `message`.
    ///
    /// Returns `Ok(false)` when the job was already terminal.
    pub async fn fail(&self, job_id: DbId, message: &str) -> Result<bool, PipelineError> {
        match self.store.fail(job_id, message).await {
            Ok(true) => {
                tracing::info!(job_id, error = message, "Video generation failed");
                Ok(true)
            }
            Ok(false) => {
                tracing::info!(job_id, "Job already terminal, failure not recorded");
                Ok(false)
            }
            Err(e) => {
                tracing::error!(job_id, error = %e, "Failed to persist video failure");
                Err(e)
            }
        }
    }

    async fn cache_artifact(&self, job_id: DbId, url: &str) -> Option<PathBuf> {
        let cache = self.cache.as_ref()?;
        match cache.fetch(job_id, url, CACHE_CATEGORY_VIDEOS).await {
            Ok(path) => {
                tracing::info!(job_id, path = %path.display(), "Video cached locally");
                Some(path)
            }
            Err(e) => {
                tracing::warn!(job_id, video_url = url, error = %e, "Failed to cache video");
                None
            }
        }
    }

    async fn probe_duration(&self, job_id: DbId, path: &std::path::Path) -> Option<i32> {
        let probe = self.probe.as_ref()?;
        match probe.probe_secs(path).await {
            Ok(secs) => {
                let rounded = round_up_duration(secs);
                tracing::debug!(job_id, secs, rounded = ?rounded, "Probed video duration");
                rounded
            }
            Err(e) => {
                tracing::warn!(
                    job_id,
                    error = %e,
                    "Failed to probe video duration, keeping provider value",
                );
                None
            }
        }
    }

    async fn propagate_to_storyboard(
        &self,
        job_id: DbId,
        storyboard_id: DbId,
        result: &VideoGenerationResult,
    ) {
        match self
            .store
            .update_storyboard_video(storyboard_id, &result.video_url, result.duration)
            .await
        {
            Ok(true) => {
                tracing::debug!(job_id, storyboard_id, "Storyboard video updated");
            }
            Ok(false) => {
                tracing::warn!(job_id, storyboard_id, "Storyboard missing, video not copied");
            }
            Err(e) => {
                tracing::warn!(
                    job_id,
                    storyboard_id,
                    error = %e,
                    "Failed to copy video onto storyboard",
                );
            }
        }
    }
}
