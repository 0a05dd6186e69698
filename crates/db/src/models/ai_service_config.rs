//! Provider configuration model.
//!
//! One row per configured remote AI service. Video providers are stored
//! under the `video` service type.

use serde::Serialize;
use sqlx::FromRow;
use vidgen_core::types::{DbId, Timestamp};

/// A row from the `ai_service_configs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AiServiceConfig {
    pub id: DbId,
    pub service_type: String,
    /// Provider identifier used to pick the client implementation.
    pub provider: String,
    pub name: String,
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    /// Remote model names served by this config; the first is the default.
    pub models: Vec<String>,
    pub is_default: bool,
    pub is_active: bool,
    pub priority: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl AiServiceConfig {
    /// Model to request when the job does not name one.
    pub fn default_model(&self) -> Option<&str> {
        self.models.first().map(String::as_str)
    }
}
