//! Repository for the `storyboards` table.

use sqlx::PgPool;
use vidgen_core::types::DbId;

use crate::models::storyboard::Storyboard;

/// Column list for `storyboards` queries (joined with `episodes` as `e`).
const COLUMNS: &str = "\
    s.id, s.episode_id, e.drama_id, s.storyboard_number, s.image_prompt, \
    s.duration, s.video_url, s.created_at, s.updated_at";

/// Storyboard lookups and the denormalized video copy.
pub struct StoryboardRepo;

impl StoryboardRepo {
    /// Find a storyboard by its ID, including the owning drama.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Storyboard>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM storyboards s \
             JOIN episodes e ON e.id = s.episode_id \
             WHERE s.id = $1"
        );
        sqlx::query_as::<_, Storyboard>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List an episode's storyboards in storyboard order.
    pub async fn list_by_episode(
        pool: &PgPool,
        episode_id: DbId,
    ) -> Result<Vec<Storyboard>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM storyboards s \
             JOIN episodes e ON e.id = s.episode_id \
             WHERE s.episode_id = $1 \
             ORDER BY s.storyboard_number ASC, s.id ASC"
        );
        sqlx::query_as::<_, Storyboard>(&query)
            .bind(episode_id)
            .fetch_all(pool)
            .await
    }

    /// Overwrite the storyboard's copy of the finished video.
    ///
    /// `duration` is left untouched when `None`.
    pub async fn update_video(
        pool: &PgPool,
        id: DbId,
        video_url: &str,
        duration: Option<i32>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE storyboards \
             SET video_url = $2, duration = COALESCE($3, duration), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(video_url)
        .bind(duration)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
