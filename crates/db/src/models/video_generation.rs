//! Video generation job model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use vidgen_core::error::CoreError;
use vidgen_core::reference::{decode_reference_urls, ReferenceMode};
use vidgen_core::types::{DbId, Timestamp};

use super::status::{StatusId, VideoGenerationStatus};

/// A row from the `video_generations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct VideoGeneration {
    pub id: DbId,
    /// Owning drama (the job's parent context).
    pub drama_id: DbId,
    pub storyboard_id: Option<DbId>,
    pub image_gen_id: Option<DbId>,
    pub provider: String,
    pub model: Option<String>,
    pub reference_mode: String,
    pub image_url: Option<String>,
    pub first_frame_url: Option<String>,
    pub last_frame_url: Option<String>,
    /// JSON array of URLs; decode with [`VideoGeneration::reference_images`].
    pub reference_image_urls: Option<String>,
    pub prompt: String,
    pub duration: Option<i32>,
    pub fps: Option<i32>,
    pub aspect_ratio: Option<String>,
    pub style: Option<String>,
    pub motion_level: Option<i32>,
    pub camera_motion: Option<String>,
    pub seed: Option<i64>,
    pub status_id: StatusId,
    /// Provider task handle; set only for asynchronous dispatch.
    pub task_id: Option<String>,
    pub video_url: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub error_message: Option<String>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl VideoGeneration {
    /// Decoded status, or `None` if the row holds an unknown status id.
    pub fn status(&self) -> Option<VideoGenerationStatus> {
        VideoGenerationStatus::from_id(self.status_id)
    }

    pub fn is_processing(&self) -> bool {
        self.status() == Some(VideoGenerationStatus::Processing)
    }

    /// Parsed reference mode.
    pub fn reference_mode(&self) -> Result<ReferenceMode, CoreError> {
        self.reference_mode
            .parse()
            .map_err(|_| {
                CoreError::Configuration(format!(
                    "job {} has unknown reference mode '{}'",
                    self.id, self.reference_mode
                ))
            })
    }

    /// Decoded multi-image reference list (empty when absent).
    pub fn reference_images(&self) -> Result<Vec<String>, CoreError> {
        match self.reference_image_urls.as_deref() {
            Some(blob) if !blob.is_empty() => decode_reference_urls(blob),
            _ => Ok(Vec::new()),
        }
    }

    /// Non-empty task id, if the job was dispatched asynchronously.
    pub fn provider_task_id(&self) -> Option<&str> {
        self.task_id.as_deref().filter(|t| !t.is_empty())
    }
}

/// Insert payload for a new job. Reference fields are already resolved
/// and consistent with `reference_mode`.
#[derive(Debug, Clone, Default)]
pub struct CreateVideoGeneration {
    pub drama_id: DbId,
    pub storyboard_id: Option<DbId>,
    pub image_gen_id: Option<DbId>,
    pub provider: String,
    pub model: Option<String>,
    pub reference_mode: String,
    pub image_url: Option<String>,
    pub first_frame_url: Option<String>,
    pub last_frame_url: Option<String>,
    pub reference_image_urls: Option<String>,
    pub prompt: String,
    pub duration: Option<i32>,
    pub fps: Option<i32>,
    pub aspect_ratio: Option<String>,
    pub style: Option<String>,
    pub motion_level: Option<i32>,
    pub camera_motion: Option<String>,
    pub seed: Option<i64>,
}

/// Terminal success payload written on completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoGenerationResult {
    /// The provider's remote URL, never a local cache path.
    pub video_url: String,
    pub duration: Option<i32>,
    pub width: Option<i32>,
    pub height: Option<i32>,
}

/// Query parameters for listing jobs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoGenerationListQuery {
    pub drama_id: Option<DbId>,
    pub storyboard_id: Option<DbId>,
    pub status_id: Option<StatusId>,
    /// Maximum number of results. Defaults to 20, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}
