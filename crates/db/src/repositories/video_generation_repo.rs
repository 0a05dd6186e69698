//! Repository for the `video_generations` table.
//!
//! Every status-changing write is conditional on the current status so the
//! status column acts as the job's soft lock: a write that finds the row in
//! an unexpected state changes nothing and reports `false`.

use sqlx::PgPool;
use vidgen_core::generation::clamp_pagination;
use vidgen_core::types::DbId;

use crate::models::status::{StatusId, VideoGenerationStatus};
use crate::models::video_generation::{
    CreateVideoGeneration, VideoGeneration, VideoGenerationListQuery, VideoGenerationResult,
};

/// Column list for `video_generations` queries.
const COLUMNS: &str = "\
    id, drama_id, storyboard_id, image_gen_id, provider, model, \
    reference_mode, image_url, first_frame_url, last_frame_url, reference_image_urls, \
    prompt, duration, fps, aspect_ratio, style, motion_level, camera_motion, seed, \
    status_id, task_id, video_url, width, height, error_message, \
    completed_at, created_at, updated_at";

/// Provides CRUD and lifecycle operations for video generation jobs.
pub struct VideoGenerationRepo;

impl VideoGenerationRepo {
    /// Insert a new job in `Pending` status.
    pub async fn create(
        pool: &PgPool,
        input: &CreateVideoGeneration,
    ) -> Result<VideoGeneration, sqlx::Error> {
        let query = format!(
            "INSERT INTO video_generations \
                 (drama_id, storyboard_id, image_gen_id, provider, model, reference_mode, \
                  image_url, first_frame_url, last_frame_url, reference_image_urls, \
                  prompt, duration, fps, aspect_ratio, style, motion_level, camera_motion, seed, \
                  status_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, VideoGeneration>(&query)
            .bind(input.drama_id)
            .bind(input.storyboard_id)
            .bind(input.image_gen_id)
            .bind(&input.provider)
            .bind(&input.model)
            .bind(&input.reference_mode)
            .bind(&input.image_url)
            .bind(&input.first_frame_url)
            .bind(&input.last_frame_url)
            .bind(&input.reference_image_urls)
            .bind(&input.prompt)
            .bind(input.duration)
            .bind(input.fps)
            .bind(&input.aspect_ratio)
            .bind(&input.style)
            .bind(input.motion_level)
            .bind(&input.camera_motion)
            .bind(input.seed)
            .bind(VideoGenerationStatus::Pending.id())
            .fetch_one(pool)
            .await
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<VideoGeneration>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM video_generations WHERE id = $1");
        sqlx::query_as::<_, VideoGeneration>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Move a job from `Pending` to `Processing`.
    pub async fn mark_processing(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE video_generations SET status_id = $2, updated_at = NOW() \
             WHERE id = $1 AND status_id = $3",
        )
        .bind(id)
        .bind(VideoGenerationStatus::Processing.id())
        .bind(VideoGenerationStatus::Pending.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record the provider task handle on a `Processing` job.
    pub async fn set_task_id(pool: &PgPool, id: DbId, task_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE video_generations SET task_id = $2, updated_at = NOW() \
             WHERE id = $1 AND status_id = $3",
        )
        .bind(id)
        .bind(task_id)
        .bind(VideoGenerationStatus::Processing.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a `Processing` job completed with its result.
    pub async fn complete(
        pool: &PgPool,
        id: DbId,
        result: &VideoGenerationResult,
    ) -> Result<bool, sqlx::Error> {
        let outcome = sqlx::query(
            "UPDATE video_generations \
             SET status_id = $2, video_url = $3, \
                 duration = COALESCE($4, duration), \
                 width = COALESCE($5, width), \
                 height = COALESCE($6, height), \
                 error_message = NULL, completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status_id = $7",
        )
        .bind(id)
        .bind(VideoGenerationStatus::Completed.id())
        .bind(&result.video_url)
        .bind(result.duration)
        .bind(result.width)
        .bind(result.height)
        .bind(VideoGenerationStatus::Processing.id())
        .execute(pool)
        .await?;
        Ok(outcome.rows_affected() > 0)
    }

    /// Mark a non-terminal job failed with an error message.
    ///
    /// No automatic retry is performed.
    pub async fn fail(pool: &PgPool, id: DbId, error: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE video_generations \
             SET status_id = $2, error_message = $3, completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status_id IN ($4, $5)",
        )
        .bind(id)
        .bind(VideoGenerationStatus::Failed.id())
        .bind(error)
        .bind(VideoGenerationStatus::Pending.id())
        .bind(VideoGenerationStatus::Processing.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Jobs left `Processing` with a known provider task id.
    pub async fn list_recoverable(pool: &PgPool) -> Result<Vec<VideoGeneration>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM video_generations \
             WHERE status_id = $1 AND task_id IS NOT NULL AND task_id <> '' \
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, VideoGeneration>(&query)
            .bind(VideoGenerationStatus::Processing.id())
            .fetch_all(pool)
            .await
    }

    /// List jobs newest-first with optional filters, returning the page and
    /// the total number of matching rows.
    pub async fn list(
        pool: &PgPool,
        params: &VideoGenerationListQuery,
    ) -> Result<(Vec<VideoGeneration>, i64), sqlx::Error> {
        let (limit, offset) = clamp_pagination(params.limit, params.offset);

        // Build the WHERE clause and track the next bind parameter index.
        let mut conditions: Vec<String> = Vec::new();
        let mut bind_idx: u32 = 1;

        if params.drama_id.is_some() {
            conditions.push(format!("drama_id = ${bind_idx}"));
            bind_idx += 1;
        }
        if params.storyboard_id.is_some() {
            conditions.push(format!("storyboard_id = ${bind_idx}"));
            bind_idx += 1;
        }
        if params.status_id.is_some() {
            conditions.push(format!("status_id = ${bind_idx}"));
            bind_idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_query = format!("SELECT COUNT(*) FROM video_generations {where_clause}");
        let mut count = sqlx::query_scalar::<_, i64>(&count_query);
        if let Some(drama_id) = params.drama_id {
            count = count.bind(drama_id);
        }
        if let Some(storyboard_id) = params.storyboard_id {
            count = count.bind(storyboard_id);
        }
        if let Some(status_id) = params.status_id {
            count = count.bind(status_id);
        }
        let total = count.fetch_one(pool).await?;

        let query = format!(
            "SELECT {COLUMNS} FROM video_generations \
             {where_clause} \
             ORDER BY created_at DESC, id DESC \
             LIMIT ${bind_idx} OFFSET ${}",
            bind_idx + 1,
        );

        let mut q = sqlx::query_as::<_, VideoGeneration>(&query);
        if let Some(drama_id) = params.drama_id {
            q = q.bind(drama_id);
        }
        if let Some(storyboard_id) = params.storyboard_id {
            q = q.bind(storyboard_id);
        }
        if let Some(status_id) = params.status_id {
            q = q.bind(status_id);
        }
        q = q.bind(limit).bind(offset);

        let rows = q.fetch_all(pool).await?;
        Ok((rows, total))
    }

    /// Delete a job. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM video_generations WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Current status id of a job, without loading the full row.
    pub async fn status_of(pool: &PgPool, id: DbId) -> Result<Option<StatusId>, sqlx::Error> {
        sqlx::query_scalar::<_, StatusId>("SELECT status_id FROM video_generations WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
