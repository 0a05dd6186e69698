//! Video generation request constants and validation.
//!
//! Pure functions shared by the pipeline and the persistence layer.

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Request limits
// ---------------------------------------------------------------------------

/// Minimum prompt length in characters.
pub const PROMPT_MIN_CHARS: usize = 5;
/// Maximum prompt length in characters.
pub const PROMPT_MAX_CHARS: usize = 2000;

// ---------------------------------------------------------------------------
// Provider defaults
// ---------------------------------------------------------------------------

/// Provider used when a request does not name one.
pub const DEFAULT_PROVIDER: &str = "doubao";

/// Service category under which video provider configs are stored.
pub const VIDEO_SERVICE_TYPE: &str = "video";

// ---------------------------------------------------------------------------
// Polling defaults
// ---------------------------------------------------------------------------

/// Seconds between provider status queries.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
/// Status queries before a job is failed with a timeout.
pub const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 300;

/// Error message recorded when polling exhausts its attempts.
pub const POLL_TIMEOUT_MESSAGE: &str = "polling timeout";
/// Error message recorded when a provider completes without an artifact.
pub const MISSING_VIDEO_URL_MESSAGE: &str = "task completed but no video URL";
/// Error message recorded when dispatch returns neither handle nor result.
pub const EMPTY_DISPATCH_MESSAGE: &str = "no task ID or video URL returned";

// ---------------------------------------------------------------------------
// Artifact cache
// ---------------------------------------------------------------------------

/// Cache category for finished video artifacts.
pub const CACHE_CATEGORY_VIDEOS: &str = "videos";

/// Probed durations within this many seconds above a whole second are
/// treated as that whole second (container timestamp jitter).
const DURATION_JITTER_SECS: f64 = 0.001;

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// Default page size for job listing.
pub const DEFAULT_LIST_LIMIT: i64 = 20;
/// Maximum page size for job listing.
pub const MAX_LIST_LIMIT: i64 = 100;

/// Clamp caller-supplied pagination into `(limit, offset)`.
pub fn clamp_pagination(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let limit = limit
        .filter(|l| *l > 0)
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .min(MAX_LIST_LIMIT);
    let offset = offset.unwrap_or(0).max(0);
    (limit, offset)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate the prompt length (counted in characters, not bytes).
pub fn validate_prompt(prompt: &str) -> Result<(), CoreError> {
    let len = prompt.chars().count();
    if len < PROMPT_MIN_CHARS {
        return Err(CoreError::Validation(format!(
            "prompt must be at least {PROMPT_MIN_CHARS} characters, got {len}"
        )));
    }
    if len > PROMPT_MAX_CHARS {
        return Err(CoreError::Validation(format!(
            "prompt must be at most {PROMPT_MAX_CHARS} characters, got {len}"
        )));
    }
    Ok(())
}

/// Validate that the owning drama id is a real key.
pub fn validate_drama_id(drama_id: DbId) -> Result<(), CoreError> {
    if drama_id <= 0 {
        return Err(CoreError::Validation(format!(
            "drama_id must be positive, got {drama_id}"
        )));
    }
    Ok(())
}

/// Validate optional numeric generation parameters.
pub fn validate_generation_params(
    duration: Option<i32>,
    fps: Option<i32>,
) -> Result<(), CoreError> {
    if let Some(d) = duration {
        if d <= 0 {
            return Err(CoreError::Validation(format!(
                "duration must be positive, got {d}"
            )));
        }
    }
    if let Some(f) = fps {
        if f <= 0 {
            return Err(CoreError::Validation(format!("fps must be positive, got {f}")));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Duration
// ---------------------------------------------------------------------------

/// Round a probed duration up to whole seconds.
///
/// Returns `None` for non-finite or non-positive input.
pub fn round_up_duration(secs: f64) -> Option<i32> {
    if !secs.is_finite() || secs <= 0.0 {
        return None;
    }
    let rounded = (secs - DURATION_JITTER_SECS).ceil().max(1.0);
    Some(rounded as i32)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
