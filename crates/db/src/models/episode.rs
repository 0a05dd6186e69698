//! Episode entity model.

use serde::Serialize;
use sqlx::FromRow;
use vidgen_core::types::{DbId, Timestamp};

/// A row from the `episodes` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Episode {
    pub id: DbId,
    pub drama_id: DbId,
    pub episode_number: i32,
    pub title: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
