use serde::Deserialize;
use vidgen_core::types::DbId;

/// A request to generate one video.
///
/// `drama_id` and `prompt` are required. Reference fields are interpreted
/// according to `reference_mode`; when it is absent the mode is inferred
/// from whichever fields are populated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateVideoRequest {
    pub drama_id: DbId,
    pub storyboard_id: Option<DbId>,
    pub image_gen_id: Option<DbId>,
    /// One of `single`, `first_last`, `multiple`, `none`.
    pub reference_mode: Option<String>,
    pub image_url: Option<String>,
    pub first_frame_url: Option<String>,
    pub last_frame_url: Option<String>,
    #[serde(default)]
    pub reference_image_urls: Vec<String>,
    pub prompt: String,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub duration: Option<i32>,
    pub fps: Option<i32>,
    pub aspect_ratio: Option<String>,
    pub style: Option<String>,
    pub motion_level: Option<i32>,
    pub camera_motion: Option<String>,
    pub seed: Option<i64>,
}
