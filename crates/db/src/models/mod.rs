//! Row models and DTOs, one module per table.

pub mod ai_service_config;
pub mod episode;
pub mod image_generation;
pub mod status;
pub mod storyboard;
pub mod video_generation;
