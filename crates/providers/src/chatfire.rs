//! Chatfire aggregator client.
//!
//! `POST /video/generations` either returns a task handle or, for fast
//! models, the finished video directly. Tasks resolve through
//! `GET /video/task/{id}`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::client::{GenerateOutcome, TaskStatus, VideoClient, VideoOutput};
use crate::error::ProviderError;
use crate::http::{join_url, parse_response, whole_seconds};
use crate::options::GenerationOptions;
use crate::registry::ProviderConfig;

const GENERATE_PATH: &str = "/video/generations";
const TASK_PATH: &str = "/video/task";

/// HTTP client for the Chatfire video gateway.
///
/// The gateway may answer a submission with the finished video directly.
pub struct ChatfireClient {
    client: reqwest::Client,
    config: ProviderConfig,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    task_id: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    video_url: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TaskResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    video_url: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    width: Option<i32>,
    #[serde(default)]
    height: Option<i32>,
    #[serde(default)]
    error: Option<String>,
}

impl ChatfireClient {
    pub fn new(client: reqwest::Client, config: ProviderConfig) -> Self {
        Self { client, config }
    }
}

fn insert_some<T: Into<Value>>(body: &mut Map<String, Value>, key: &str, value: Option<T>) {
    if let Some(value) = value {
        body.insert(key.to_string(), value.into());
    }
}

/// Build the flat submission body. Unset options are omitted.
pub(crate) fn build_submit_body(
    model: &str,
    image_url: Option<&str>,
    prompt: &str,
    options: &GenerationOptions,
) -> Value {
    let mut body = Map::new();
    body.insert("model".into(), json!(model));
    body.insert("prompt".into(), json!(prompt));
    insert_some(&mut body, "image_url", image_url.filter(|u| !u.is_empty()));
    insert_some(&mut body, "first_frame_url", options.first_frame.as_deref());
    insert_some(&mut body, "last_frame_url", options.last_frame.as_deref());
    if !options.reference_images.is_empty() {
        body.insert(
            "reference_image_urls".into(),
            json!(options.reference_images),
        );
    }
    insert_some(&mut body, "duration", options.duration);
    insert_some(&mut body, "fps", options.fps);
    insert_some(&mut body, "aspect_ratio", options.aspect_ratio.as_deref());
    insert_some(&mut body, "style", options.style.as_deref());
    insert_some(&mut body, "motion_level", options.motion_level);
    insert_some(&mut body, "camera_motion", options.camera_motion.as_deref());
    insert_some(&mut body, "seed", options.seed);
    Value::Object(body)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn interpret_submit(response: GenerateResponse) -> Result<GenerateOutcome, ProviderError> {
    if let Some(error) = non_empty(response.error) {
        return Err(ProviderError::Rejected(error));
    }
    if let Some(task_id) = non_empty(response.task_id).or_else(|| non_empty(response.id)) {
        return Ok(GenerateOutcome::Task { task_id });
    }
    if let Some(url) = non_empty(response.video_url) {
        return Ok(GenerateOutcome::Ready(
            VideoOutput::new(url).with_duration(whole_seconds(response.duration)),
        ));
    }
    Ok(GenerateOutcome::Empty)
}

fn interpret_task(response: TaskResponse) -> TaskStatus {
    match response.status.to_ascii_lowercase().as_str() {
        "completed" | "succeeded" | "success" => TaskStatus {
            completed: true,
            video_url: response.video_url,
            duration: whole_seconds(response.duration),
            width: response.width,
            height: response.height,
            error: None,
        },
        "failed" | "error" => TaskStatus::failed(
            non_empty(response.error).unwrap_or_else(|| "generation failed".to_string()),
        ),
        _ => TaskStatus::running(),
    }
}

#[async_trait]
impl VideoClient for ChatfireClient {
    fn provider(&self) -> &str {
        "chatfire"
    }

    async fn generate(
        &self,
        image_url: Option<&str>,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<GenerateOutcome, ProviderError> {
        let body = build_submit_body(
            options.model_or(&self.config.model),
            image_url,
            prompt,
            options,
        );

        let response = self
            .client
            .post(join_url(&self.config.base_url, GENERATE_PATH))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        interpret_submit(parse_response(response).await?)
    }

    async fn poll_status(&self, task_id: &str) -> Result<TaskStatus, ProviderError> {
        let response = self
            .client
            .get(join_url(
                &self.config.base_url,
                &format!("{TASK_PATH}/{task_id}"),
            ))
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;

        let parsed: TaskResponse = parse_response(response).await?;
        Ok(interpret_task(parsed))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn submit(value: Value) -> Result<GenerateOutcome, ProviderError> {
        interpret_submit(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn body_omits_unset_options() {
        let options = GenerationOptions::default().with_duration(5);
        let body = build_submit_body("m1", Some("http://x/a.png"), "a cat", &options);
        assert_eq!(
            body,
            json!({
                "model": "m1",
                "prompt": "a cat",
                "image_url": "http://x/a.png",
                "duration": 5,
            })
        );
    }

    #[test]
    fn task_id_wins_over_id() {
        assert_eq!(
            submit(json!({ "task_id": "t-1", "id": "other" })).unwrap(),
            GenerateOutcome::Task { task_id: "t-1".into() }
        );
        assert_eq!(
            submit(json!({ "id": "t-2" })).unwrap(),
            GenerateOutcome::Task { task_id: "t-2".into() }
        );
    }

    #[test]
    fn synchronous_video_is_ready() {
        assert_eq!(
            submit(json!({ "video_url": "http://cdn/v.mp4", "duration": 4.6 })).unwrap(),
            GenerateOutcome::Ready(VideoOutput::new("http://cdn/v.mp4").with_duration(Some(5)))
        );
    }

    #[test]
    fn empty_and_error_responses() {
        assert_eq!(submit(json!({})).unwrap(), GenerateOutcome::Empty);
        assert_matches!(
            submit(json!({ "error": "quota exceeded" })),
            Err(ProviderError::Rejected(msg)) if msg == "quota exceeded"
        );
    }

    #[test]
    fn task_states() {
        let done: TaskResponse = serde_json::from_value(json!({
            "status": "completed",
            "video_url": "http://cdn/v.mp4",
        }))
        .unwrap();
        assert_eq!(
            interpret_task(done).output(),
            Some(VideoOutput::new("http://cdn/v.mp4"))
        );

        let failed: TaskResponse =
            serde_json::from_value(json!({ "status": "failed", "error": "nsfw" })).unwrap();
        assert_eq!(interpret_task(failed).error_message(), Some("nsfw"));

        let pending: TaskResponse = serde_json::from_value(json!({ "status": "pending" })).unwrap();
        assert_eq!(interpret_task(pending), TaskStatus::running());
    }
}
