//! Translate a persisted job into provider call arguments.

use vidgen_core::error::CoreError;
use vidgen_core::reference::ReferenceMode;
use vidgen_db::models::video_generation::VideoGeneration;
use vidgen_providers::GenerationOptions;

/// Arguments for [`vidgen_providers::VideoClient::generate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchInput {
    /// Single source image, only in `single` mode.
    pub image_url: Option<String>,
    pub options: GenerationOptions,
}

/// Build the provider call for a job.
///
/// Only the reference fields of the job's mode are forwarded. A stored
/// mode or reference blob that cannot be read fails with
/// [`CoreError::Configuration`].
pub fn dispatch_input(job: &VideoGeneration) -> Result<DispatchInput, CoreError> {
    let mut options = GenerationOptions {
        model: job.model.clone().filter(|m| !m.is_empty()),
        duration: job.duration,
        fps: job.fps,
        aspect_ratio: job.aspect_ratio.clone(),
        style: job.style.clone(),
        motion_level: job.motion_level,
        camera_motion: job.camera_motion.clone(),
        seed: job.seed,
        ..GenerationOptions::default()
    };

    let mut image_url = None;
    match job.reference_mode()? {
        ReferenceMode::Single => image_url = job.image_url.clone(),
        ReferenceMode::FirstLast => {
            options.first_frame = job.first_frame_url.clone();
            options.last_frame = job.last_frame_url.clone();
        }
        ReferenceMode::Multiple => options.reference_images = job.reference_images()?,
        ReferenceMode::None => {}
    }

    Ok(DispatchInput { image_url, options })
}
