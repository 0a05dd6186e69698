//! Repository for the `episodes` table.

use sqlx::PgPool;
use vidgen_core::types::DbId;

use crate::models::episode::Episode;

/// Column list for `episodes` queries.
const COLUMNS: &str = "id, drama_id, episode_number, title, created_at, updated_at";

/// Read access to episodes.
pub struct EpisodeRepo;

impl EpisodeRepo {
    /// Find an episode by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Episode>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM episodes WHERE id = $1");
        sqlx::query_as::<_, Episode>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
