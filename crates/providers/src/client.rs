//! The provider capability shared by every video synthesis integration.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::options::GenerationOptions;

/// A finished video as reported by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoOutput {
    pub video_url: String,
    pub duration: Option<i32>,
    pub width: Option<i32>,
    pub height: Option<i32>,
}

impl VideoOutput {
    pub fn new(video_url: impl Into<String>) -> Self {
        Self {
            video_url: video_url.into(),
            duration: None,
            width: None,
            height: None,
        }
    }

    pub fn with_duration(mut self, duration: Option<i32>) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_size(mut self, width: Option<i32>, height: Option<i32>) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

/// Result of submitting a generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateOutcome {
    /// Asynchronous provider: resolve later via [`VideoClient::poll_status`].
    Task { task_id: String },
    /// Synchronous provider: the video is already available.
    Ready(VideoOutput),
    /// The provider answered successfully but with neither a handle nor a
    /// video.
    Empty,
}

/// Snapshot of an asynchronous task.
///
/// `completed` with a `video_url` is success; `completed` without one, or
/// any `error`, is a terminal failure; otherwise the task is still running.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskStatus {
    pub completed: bool,
    pub video_url: Option<String>,
    pub duration: Option<i32>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub error: Option<String>,
}

impl TaskStatus {
    /// Task still queued or running.
    pub fn running() -> Self {
        Self::default()
    }

    /// Task finished with a video.
    pub fn succeeded(output: VideoOutput) -> Self {
        Self {
            completed: true,
            video_url: Some(output.video_url),
            duration: output.duration,
            width: output.width,
            height: output.height,
            error: None,
        }
    }

    /// Task failed on the provider side.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    /// The finished video, if the task completed with a non-empty URL.
    pub fn output(&self) -> Option<VideoOutput> {
        if !self.completed {
            return None;
        }
        let url = self.video_url.as_deref().filter(|u| !u.is_empty())?;
        Some(
            VideoOutput::new(url)
                .with_duration(self.duration)
                .with_size(self.width, self.height),
        )
    }

    /// Non-empty provider error message.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref().filter(|e| !e.is_empty())
    }
}

/// A remote video synthesis capability.
///
/// Options a provider does not support are ignored.
#[async_trait]
pub trait VideoClient: Send + Sync {
    /// Provider identifier, used in logs.
    fn provider(&self) -> &str;

    /// Submit a generation request.
    ///
    /// `image_url` is the single source image, if any; first/last frames
    /// and multi-image references travel in `options`.
    async fn generate(
        &self,
        image_url: Option<&str>,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<GenerateOutcome, ProviderError>;

    /// Query the status of a task returned by [`VideoClient::generate`].
    async fn poll_status(&self, task_id: &str) -> Result<TaskStatus, ProviderError>;
}

impl std::fmt::Debug for dyn VideoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoClient")
            .field("provider", &self.provider())
            .finish()
    }
}
