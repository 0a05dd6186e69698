//! Volcengine Ark content-generation client (Doubao Seedance models).
//!
//! Submission is `POST /contents/generations/tasks`; status is
//! `GET /contents/generations/tasks/{id}`. Generation parameters travel as
//! `--flag value` suffixes on the text prompt, images as typed content parts.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::client::{GenerateOutcome, TaskStatus, VideoClient};
use crate::error::ProviderError;
use crate::http::{join_url, parse_response, whole_seconds};
use crate::options::GenerationOptions;
use crate::registry::ProviderConfig;

const TASKS_PATH: &str = "/contents/generations/tasks";

/// HTTP client for the Volcengine Ark video task API.
pub struct VolcesArkClient {
    client: reqwest::Client,
    config: ProviderConfig,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    id: String,
}

#[derive(Debug, Deserialize)]
struct TaskResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    content: Option<TaskContent>,
    #[serde(default)]
    error: Option<TaskError>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    resolution: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TaskContent {
    #[serde(default)]
    video_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TaskError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl VolcesArkClient {
    pub fn new(client: reqwest::Client, config: ProviderConfig) -> Self {
        Self { client, config }
    }
}

/// Append Ark's inline `--flag value` parameters to the prompt.
fn prompt_with_flags(prompt: &str, options: &GenerationOptions) -> String {
    let mut text = prompt.trim().to_string();
    if let Some(duration) = options.duration {
        text.push_str(&format!(" --dur {duration}"));
    }
    if let Some(ratio) = options.aspect_ratio.as_deref().filter(|r| !r.is_empty()) {
        text.push_str(&format!(" --ratio {ratio}"));
    }
    if let Some(fps) = options.fps {
        text.push_str(&format!(" --fps {fps}"));
    }
    if let Some(seed) = options.seed {
        text.push_str(&format!(" --seed {seed}"));
    }
    text
}

fn image_part(url: &str, role: Option<&str>) -> Value {
    let mut part = json!({
        "type": "image_url",
        "image_url": { "url": url },
    });
    if let Some(role) = role {
        part["role"] = json!(role);
    }
    part
}

/// Build the task submission body.
pub(crate) fn build_submit_body(
    model: &str,
    image_url: Option<&str>,
    prompt: &str,
    options: &GenerationOptions,
) -> Value {
    let mut content = vec![json!({
        "type": "text",
        "text": prompt_with_flags(prompt, options),
    })];

    let first = options.first_frame.as_deref().filter(|u| !u.is_empty());
    let last = options.last_frame.as_deref().filter(|u| !u.is_empty());

    if first.is_some() || last.is_some() {
        if let Some(url) = first {
            content.push(image_part(url, Some("first_frame")));
        }
        if let Some(url) = last {
            content.push(image_part(url, Some("last_frame")));
        }
    } else if !options.reference_images.is_empty() {
        for url in options.reference_images.iter().filter(|u| !u.is_empty()) {
            content.push(image_part(url, Some("reference_image")));
        }
    } else if let Some(url) = image_url.filter(|u| !u.is_empty()) {
        content.push(image_part(url, None));
    }

    json!({
        "model": model,
        "content": content,
    })
}

/// Map a submission response to an outcome.
fn interpret_submit(response: SubmitResponse) -> GenerateOutcome {
    if response.id.is_empty() {
        GenerateOutcome::Empty
    } else {
        GenerateOutcome::Task {
            task_id: response.id,
        }
    }
}

/// Parse `"1280x720"` style resolutions; `"720p"` yields nothing.
fn parse_dimensions(resolution: Option<&str>) -> (Option<i32>, Option<i32>) {
    let Some((w, h)) = resolution.and_then(|r| r.split_once('x')) else {
        return (None, None);
    };
    (w.trim().parse().ok(), h.trim().parse().ok())
}

/// Map a task response to a status snapshot.
fn interpret_task(response: TaskResponse) -> TaskStatus {
    match response.status.as_str() {
        "succeeded" => {
            let url = response
                .content
                .and_then(|c| c.video_url)
                .unwrap_or_default();
            let (width, height) = parse_dimensions(response.resolution.as_deref());
            TaskStatus {
                completed: true,
                video_url: Some(url),
                duration: whole_seconds(response.duration),
                width,
                height,
                error: None,
            }
        }
        "failed" | "cancelled" => {
            let message = response
                .error
                .and_then(|e| e.message.or(e.code))
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("task {}", response.status));
            TaskStatus::failed(message)
        }
        _ => TaskStatus::running(),
    }
}

#[async_trait]
impl VideoClient for VolcesArkClient {
    fn provider(&self) -> &str {
        "volces"
    }

    async fn generate(
        &self,
        image_url: Option<&str>,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<GenerateOutcome, ProviderError> {
        let model = options.model_or(&self.config.model);
        let body = build_submit_body(model, image_url, prompt, options);

        tracing::debug!(model, "Submitting Ark video task");

        let response = self
            .client
            .post(join_url(&self.config.base_url, TASKS_PATH))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let parsed: SubmitResponse = parse_response(response).await?;
        Ok(interpret_submit(parsed))
    }

    async fn poll_status(&self, task_id: &str) -> Result<TaskStatus, ProviderError> {
        let response = self
            .client
            .get(join_url(
                &self.config.base_url,
                &format!("{TASKS_PATH}/{task_id}"),
            ))
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;

        let parsed: TaskResponse = parse_response(response).await?;
        Ok(interpret_task(parsed))
    }
}
