//! Repository for the `image_generations` table.

use sqlx::PgPool;
use vidgen_core::types::DbId;

use crate::models::image_generation::ImageGeneration;
use crate::models::status::ImageGenerationStatus;

/// Column list for `image_generations` queries.
const COLUMNS: &str = "\
    id, drama_id, storyboard_id, prompt, image_url, status_id, created_at, updated_at";

/// Read access to upstream image generations.
pub struct ImageGenerationRepo;

impl ImageGenerationRepo {
    /// Find an image generation by its ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<ImageGeneration>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM image_generations WHERE id = $1");
        sqlx::query_as::<_, ImageGeneration>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Most recent completed image generation for a storyboard.
    pub async fn latest_completed_for_storyboard(
        pool: &PgPool,
        storyboard_id: DbId,
    ) -> Result<Option<ImageGeneration>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM image_generations \
             WHERE storyboard_id = $1 AND status_id = $2 \
             ORDER BY created_at DESC, id DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, ImageGeneration>(&query)
            .bind(storyboard_id)
            .bind(ImageGenerationStatus::Completed.id())
            .fetch_optional(pool)
            .await
    }
}
