//! MiniMax Hailuo video client.
//!
//! Three-step flow: `POST /video_generation` returns a task id,
//! `GET /query/video_generation?task_id=` eventually yields a `file_id`,
//! and `GET /files/retrieve?file_id=` resolves it to a download URL.
//! Every response carries a `base_resp` whose non-zero `status_code` is a
//! rejection regardless of HTTP status.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::client::{GenerateOutcome, TaskStatus, VideoClient, VideoOutput};
use crate::error::ProviderError;
use crate::http::{join_url, parse_response};
use crate::options::GenerationOptions;
use crate::registry::ProviderConfig;

const GENERATE_PATH: &str = "/video_generation";
const QUERY_PATH: &str = "/query/video_generation";
const RETRIEVE_PATH: &str = "/files/retrieve";

/// HTTP client for the MiniMax video generation API.
///
/// A finished task yields a file id that is resolved to a download URL.
pub struct MinimaxClient {
    client: reqwest::Client,
    config: ProviderConfig,
}

#[derive(Debug, Default, Deserialize)]
struct BaseResp {
    #[serde(default)]
    status_code: i64,
    #[serde(default)]
    status_msg: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    task_id: String,
    #[serde(default)]
    base_resp: BaseResp,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    file_id: Option<String>,
    #[serde(default)]
    video_width: Option<i32>,
    #[serde(default)]
    video_height: Option<i32>,
    #[serde(default)]
    base_resp: BaseResp,
}

#[derive(Debug, Deserialize)]
struct RetrieveResponse {
    #[serde(default)]
    file: Option<FileObject>,
    #[serde(default)]
    base_resp: BaseResp,
}

#[derive(Debug, Deserialize)]
struct FileObject {
    #[serde(default)]
    download_url: String,
}

/// Outcome of a query before the file lookup.
#[derive(Debug, PartialEq, Eq)]
enum QueryState {
    Running,
    Ready {
        file_id: String,
        width: Option<i32>,
        height: Option<i32>,
    },
    Failed(String),
}

impl MinimaxClient {
    pub fn new(client: reqwest::Client, config: ProviderConfig) -> Self {
        Self { client, config }
    }

    async fn retrieve_file(&self, file_id: &str) -> Result<String, ProviderError> {
        let response = self
            .client
            .get(join_url(&self.config.base_url, RETRIEVE_PATH))
            .query(&[("file_id", file_id)])
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;

        let parsed: RetrieveResponse = parse_response(response).await?;
        check_base(&parsed.base_resp)?;
        Ok(parsed.file.map(|f| f.download_url).unwrap_or_default())
    }
}

fn check_base(base: &BaseResp) -> Result<(), ProviderError> {
    if base.status_code != 0 {
        return Err(ProviderError::Rejected(format!(
            "{} ({})",
            base.status_msg, base.status_code
        )));
    }
    Ok(())
}

pub(crate) fn build_submit_body(
    model: &str,
    image_url: Option<&str>,
    prompt: &str,
    options: &GenerationOptions,
) -> Value {
    let mut body = Map::new();
    body.insert("model".into(), json!(model));
    body.insert("prompt".into(), json!(prompt));

    let first = options
        .first_frame
        .as_deref()
        .or(image_url)
        .filter(|u| !u.is_empty());
    if let Some(url) = first {
        body.insert("first_frame_image".into(), json!(url));
    }
    if let Some(url) = options.last_frame.as_deref().filter(|u| !u.is_empty()) {
        body.insert("last_frame_image".into(), json!(url));
    }
    if !options.reference_images.is_empty() {
        let subjects: Vec<Value> = options
            .reference_images
            .iter()
            .map(|url| json!({ "type": "character", "image": [url] }))
            .collect();
        body.insert("subject_reference".into(), Value::Array(subjects));
    }
    if let Some(duration) = options.duration {
        body.insert("duration".into(), json!(duration));
    }
    Value::Object(body)
}

fn interpret_submit(response: GenerateResponse) -> Result<GenerateOutcome, ProviderError> {
    check_base(&response.base_resp)?;
    if response.task_id.is_empty() {
        return Ok(GenerateOutcome::Empty);
    }
    Ok(GenerateOutcome::Task {
        task_id: response.task_id,
    })
}

fn interpret_query(response: QueryResponse) -> Result<QueryState, ProviderError> {
    check_base(&response.base_resp)?;
    Ok(match response.status.as_str() {
        "Success" => QueryState::Ready {
            file_id: response.file_id.unwrap_or_default(),
            width: response.video_width,
            height: response.video_height,
        },
        "Fail" => QueryState::Failed("video generation failed".to_string()),
        _ => QueryState::Running,
    })
}

#[async_trait]
impl VideoClient for MinimaxClient {
    fn provider(&self) -> &str {
        "minimax"
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
            .get(join_url(&self.config.base_url, QUERY_PATH))
            .query(&[("task_id", task_id)])
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;

        match interpret_query(parse_response(response).await?)? {
            QueryState::Running => Ok(TaskStatus::running()),
            QueryState::Failed(message) => Ok(TaskStatus::failed(message)),
            QueryState::Ready {
                file_id,
                width,
                height,
            } => {
                if file_id.is_empty() {
                    // Surfaces as "completed without URL" upstream.
                    return Ok(TaskStatus {
                        completed: true,
                        ..TaskStatus::default()
                    });
                }
                let url = self.retrieve_file(&file_id).await?;
                Ok(TaskStatus::succeeded(
                    VideoOutput::new(url).with_size(width, height),
                ))
            }
        }
    }
}
