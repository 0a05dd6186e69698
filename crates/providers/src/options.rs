//! Generation options passed to every provider.

/// Recognized generation options. Each provider reads the subset it
/// supports and ignores the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationOptions {
    pub model: Option<String>,
    pub duration: Option<i32>,
    pub fps: Option<i32>,
    pub aspect_ratio: Option<String>,
    pub style: Option<String>,
    pub motion_level: Option<i32>,
    pub camera_motion: Option<String>,
    pub seed: Option<i64>,
    pub first_frame: Option<String>,
    pub last_frame: Option<String>,
    pub reference_images: Vec<String>,
}

impl GenerationOptions {
    pub fn with_duration(mut self, secs: i32) -> Self {
        self.duration = Some(secs);
        self
    }

    pub fn with_aspect_ratio(mut self, ratio: impl Into<String>) -> Self {
        self.aspect_ratio = Some(ratio.into());
        self
    }

    pub fn with_first_frame(mut self, url: impl Into<String>) -> Self {
        self.first_frame = Some(url.into());
        self
    }

    pub fn with_last_frame(mut self, url: impl Into<String>) -> Self {
        self.last_frame = Some(url.into());
        self
    }

    pub fn with_reference_images(mut self, urls: Vec<String>) -> Self {
        self.reference_images = urls;
        self
    }

    /// The model to request, falling back to the client's configured one.
    pub fn model_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.model
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(fallback)
    }
}
