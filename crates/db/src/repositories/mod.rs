//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod ai_service_config_repo;
pub mod episode_repo;
pub mod image_generation_repo;
pub mod storyboard_repo;
pub mod video_generation_repo;

pub use ai_service_config_repo::AiServiceConfigRepo;
pub use episode_repo::EpisodeRepo;
pub use image_generation_repo::ImageGenerationRepo;
pub use storyboard_repo::StoryboardRepo;
pub use video_generation_repo::VideoGenerationRepo;
