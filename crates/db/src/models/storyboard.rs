//! Storyboard entity model.
//!
//! `video_url` and `duration` are a read-optimized copy of the latest
//! completed video generation for the storyboard. The canonical values
//! live on the `video_generations` row; this copy is eventually consistent
//! and may lag behind if a propagation write failed.

use serde::Serialize;
use sqlx::FromRow;
use vidgen_core::types::{DbId, Timestamp};

/// A row from the `storyboards` table, joined with its episode's drama.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Storyboard {
    pub id: DbId,
    pub episode_id: DbId,
    /// Drama that owns the storyboard's episode.
    pub drama_id: DbId,
    pub storyboard_number: i32,
    pub image_prompt: Option<String>,
    /// Target (and, after completion, actual) clip length in seconds.
    pub duration: i32,
    pub video_url: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
