//! Image generation entity model (upstream work item for image-to-video).

use serde::Serialize;
use sqlx::FromRow;
use vidgen_core::types::{DbId, Timestamp};

use super::status::{ImageGenerationStatus, StatusId};

/// A row from the `image_generations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ImageGeneration {
    pub id: DbId,
    pub drama_id: DbId,
    pub storyboard_id: Option<DbId>,
    pub prompt: String,
    pub image_url: Option<String>,
    pub status_id: StatusId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ImageGeneration {
    /// The completed image URL, if the generation finished successfully.
    pub fn completed_image_url(&self) -> Option<&str> {
        if self.status_id != ImageGenerationStatus::Completed.id() {
            return None;
        }
        self.image_url.as_deref().filter(|u| !u.is_empty())
    }
}
