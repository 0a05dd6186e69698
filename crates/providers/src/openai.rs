//! OpenAI Sora video client.
//!
//! Jobs are created with `POST /videos` and polled with `GET /videos/{id}`.
//! A completed job's asset is served from `/videos/{id}/content`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::client::{GenerateOutcome, TaskStatus, VideoClient};
use crate::error::ProviderError;
use crate::http::{join_url, parse_response};
use crate::options::GenerationOptions;
use crate::registry::ProviderConfig;

const VIDEOS_PATH: &str = "/videos";

/// Sora only accepts a fixed set of clip lengths.
const ALLOWED_SECONDS: [i32; 3] = [4, 8, 12];

/// HTTP client for the OpenAI Sora video API.
pub struct OpenAiSoraClient {
    client: reqwest::Client,
    config: ProviderConfig,
}

#[derive(Debug, Deserialize)]
struct VideoJob {
    #[serde(default)]
    id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    seconds: Option<String>,
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    error: Option<JobError>,
}

#[derive(Debug, Deserialize)]
struct JobError {
    #[serde(default)]
    message: Option<String>,
}

impl OpenAiSoraClient {
    pub fn new(client: reqwest::Client, config: ProviderConfig) -> Self {
        Self { client, config }
    }

    fn content_url(&self, video_id: &str) -> String {
        join_url(
            &self.config.base_url,
            &format!("{VIDEOS_PATH}/{video_id}/content"),
        )
    }
}

/// Portrait ratios map to 720x1280, everything else to landscape.
fn size_for_ratio(ratio: Option<&str>) -> &'static str {
    match ratio {
        Some("9:16") | Some("3:4") => "720x1280",
        _ => "1280x720",
    }
}

/// Smallest allowed clip length covering the requested duration.
fn seconds_for(duration: Option<i32>) -> i32 {
    let requested = duration.unwrap_or(ALLOWED_SECONDS[0]);
    ALLOWED_SECONDS
        .iter()
        .copied()
        .find(|allowed| *allowed >= requested)
        .unwrap_or(ALLOWED_SECONDS[ALLOWED_SECONDS.len() - 1])
}

pub(crate) fn build_create_body(model: &str, prompt: &str, options: &GenerationOptions) -> Value {
    json!({
        "model": model,
        "prompt": prompt,
        "seconds": seconds_for(options.duration).to_string(),
        "size": size_for_ratio(options.aspect_ratio.as_deref()),
    })
}

fn parse_size(size: Option<&str>) -> (Option<i32>, Option<i32>) {
    match size.and_then(|s| s.split_once('x')) {
        Some((w, h)) => (w.parse().ok(), h.parse().ok()),
        None => (None, None),
    }
}

fn interpret_job(job: VideoJob, content_url: String) -> TaskStatus {
    match job.status.as_str() {
        "completed" => {
            let (width, height) = parse_size(job.size.as_deref());
            TaskStatus {
                completed: true,
                video_url: Some(content_url),
                duration: job.seconds.and_then(|s| s.parse().ok()),
                width,
                height,
                error: None,
            }
        }
        "failed" => TaskStatus::failed(
            job.error
                .and_then(|e| e.message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "video generation failed".to_string()),
        ),
        _ => TaskStatus::running(),
    }
}

#[async_trait]
impl VideoClient for OpenAiSoraClient {
    fn provider(&self) -> &str {
        "openai"
    }

    async fn generate(
        &self,
        image_url: Option<&str>,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<GenerateOutcome, ProviderError> {
        if image_url.is_some() {
            tracing::debug!("Sora text-to-video ignores the source image");
        }
        let body = build_create_body(options.model_or(&self.config.model), prompt, options);

        let response = self
            .client
            .post(join_url(&self.config.base_url, VIDEOS_PATH))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let job: VideoJob = parse_response(response).await?;
        if job.id.is_empty() {
            return Ok(GenerateOutcome::Empty);
        }
        Ok(GenerateOutcome::Task { task_id: job.id })
    }

    async fn poll_status(&self, task_id: &str) -> Result<TaskStatus, ProviderError> {
        let response = self
            .client
            .get(join_url(
                &self.config.base_url,
                &format!("{VIDEOS_PATH}/{task_id}"),
            ))
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;

        let job: VideoJob = parse_response(response).await?;
        Ok(interpret_job(job, self.content_url(task_id)))
    }
}
