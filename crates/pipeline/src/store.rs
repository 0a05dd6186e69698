//! The record store seen by the orchestration layer.
//!
//! [`JobStore`] is the only way the pipeline reads or writes jobs and the
//! entities they reference. [`PgJobStore`] delegates to the repositories in
//! `vidgen-db`; tests substitute an in-memory implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use vidgen_core::types::DbId;
use vidgen_db::models::episode::Episode;
use vidgen_db::models::image_generation::ImageGeneration;
use vidgen_db::models::status::StatusId;
use vidgen_db::models::storyboard::Storyboard;
use vidgen_db::models::video_generation::{
    CreateVideoGeneration, VideoGeneration, VideoGenerationListQuery, VideoGenerationResult,
};
use vidgen_db::repositories::{
    EpisodeRepo, ImageGenerationRepo, StoryboardRepo, VideoGenerationRepo,
};

use crate::error::PipelineError;

/// Persistence operations needed by the pipeline.
///
/// Status-changing writes are conditional on the job's current status and
/// return `false` when the row was not in the expected state, leaving it
/// untouched.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new job in `pending` status.
    async fn insert_job(&self, input: &CreateVideoGeneration)
        -> Result<VideoGeneration, PipelineError>;

    async fn find_job(&self, id: DbId) -> Result<Option<VideoGeneration>, PipelineError>;

    /// Current status id of a job, `None` if it no longer exists.
    async fn job_status(&self, id: DbId) -> Result<Option<StatusId>, PipelineError>;

    /// `pending` → `processing`.
    async fn mark_processing(&self, id: DbId) -> Result<bool, PipelineError>;

    /// Record the provider task id; only while `processing`.
    async fn set_task_id(&self, id: DbId, task_id: &str) -> Result<bool, PipelineError>;

    /// `processing` → `completed` with the result fields.
    async fn complete(&self, id: DbId, result: &VideoGenerationResult)
        -> Result<bool, PipelineError>;

    /// `pending | processing` → `failed` with an error message.
    async fn fail(&self, id: DbId, message: &str) -> Result<bool, PipelineError>;

    /// Page of jobs newest-first plus the total match count.
    async fn list_jobs(
        &self,
        query: &VideoGenerationListQuery,
    ) -> Result<(Vec<VideoGeneration>, i64), PipelineError>;

    async fn delete_job(&self, id: DbId) -> Result<bool, PipelineError>;

    /// `processing` jobs holding a non-empty provider task id.
    async fn list_recoverable(&self) -> Result<Vec<VideoGeneration>, PipelineError>;

    async fn find_storyboard(&self, id: DbId) -> Result<Option<Storyboard>, PipelineError>;

    async fn list_episode_storyboards(
        &self,
        episode_id: DbId,
    ) -> Result<Vec<Storyboard>, PipelineError>;

    /// Overwrite a storyboard's copy of the finished video.
    async fn update_storyboard_video(
        &self,
        storyboard_id: DbId,
        video_url: &str,
        duration: Option<i32>,
    ) -> Result<bool, PipelineError>;

    async fn find_image_generation(
        &self,
        id: DbId,
    ) -> Result<Option<ImageGeneration>, PipelineError>;

    /// Most recent completed image generation for a storyboard.
    async fn latest_completed_image(
        &self,
        storyboard_id: DbId,
    ) -> Result<Option<ImageGeneration>, PipelineError>;

    async fn find_episode(&self, id: DbId) -> Result<Option<Episode>, PipelineError>;
}

/// [`JobStore`] backed by PostgreSQL.
#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn insert_job(
        &self,
        input: &CreateVideoGeneration,
    ) -> Result<VideoGeneration, PipelineError> {
        Ok(VideoGenerationRepo::create(&self.pool, input).await?)
    }

    async fn find_job(&self, id: DbId) -> Result<Option<VideoGeneration>, PipelineError> {
        Ok(VideoGenerationRepo::find_by_id(&self.pool, id).await?)
    }

    async fn job_status(&self, id: DbId) -> Result<Option<StatusId>, PipelineError> {
        Ok(VideoGenerationRepo::status_of(&self.pool, id).await?)
    }

    async fn mark_processing(&self, id: DbId) -> Result<bool, PipelineError> {
        Ok(VideoGenerationRepo::mark_processing(&self.pool, id).await?)
    }

    async fn set_task_id(&self, id: DbId, task_id: &str) -> Result<bool, PipelineError> {
        Ok(VideoGenerationRepo::set_task_id(&self.pool, id, task_id).await?)
    }

    async fn complete(
        &self,
        id: DbId,
        result: &VideoGenerationResult,
    ) -> Result<bool, PipelineError> {
        Ok(VideoGenerationRepo::complete(&self.pool, id, result).await?)
    }

    async fn fail(&self, id: DbId, message: &str) -> Result<bool, PipelineError> {
        Ok(VideoGenerationRepo::fail(&self.pool, id, message).await?)
    }

    async fn list_jobs(
        &self,
        query: &VideoGenerationListQuery,
    ) -> Result<(Vec<VideoGeneration>, i64), PipelineError> {
        Ok(VideoGenerationRepo::list(&self.pool, query).await?)
    }

    async fn delete_job(&self, id: DbId) -> Result<bool, PipelineError> {
        Ok(VideoGenerationRepo::delete(&self.pool, id).await?)
    }

    async fn list_recoverable(&self) -> Result<Vec<VideoGeneration>, PipelineError> {
        Ok(VideoGenerationRepo::list_recoverable(&self.pool).await?)
    }

    async fn find_storyboard(&self, id: DbId) -> Result<Option<Storyboard>, PipelineError> {
        Ok(StoryboardRepo::find_by_id(&self.pool, id).await?)
    }

    async fn list_episode_storyboards(
        &self,
        episode_id: DbId,
    ) -> Result<Vec<Storyboard>, PipelineError> {
        Ok(StoryboardRepo::list_by_episode(&self.pool, episode_id).await?)
    }

    async fn update_storyboard_video(
        &self,
        storyboard_id: DbId,
        video_url: &str,
        duration: Option<i32>,
    ) -> Result<bool, PipelineError> {
        Ok(StoryboardRepo::update_video(&self.pool, storyboard_id, video_url, duration).await?)
    }

    async fn find_image_generation(
        &self,
        id: DbId,
    ) -> Result<Option<ImageGeneration>, PipelineError> {
        Ok(ImageGenerationRepo::find_by_id(&self.pool, id).await?)
    }

    async fn latest_completed_image(
        &self,
        storyboard_id: DbId,
    ) -> Result<Option<ImageGeneration>, PipelineError> {
        Ok(ImageGenerationRepo::latest_completed_for_storyboard(&self.pool, storyboard_id).await?)
    }

    async fn find_episode(&self, id: DbId) -> Result<Option<Episode>, PipelineError> {
        Ok(EpisodeRepo::find_by_id(&self.pool, id).await?)
    }
}
