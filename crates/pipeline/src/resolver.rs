//! Provider client resolution.
//!
//! A job's model name selects the provider account that serves it; without
//! a match the category default applies. The account's provider identifier
//! then picks the client constructor from the [`ProviderRegistry`].

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use vidgen_core::error::CoreError;
use vidgen_core::generation::VIDEO_SERVICE_TYPE;
use vidgen_db::models::ai_service_config::AiServiceConfig;
use vidgen_db::repositories::AiServiceConfigRepo;
use vidgen_providers::{ProviderConfig, ProviderRegistry, VideoClient};

use crate::error::PipelineError;

/// Source of provider account configurations for the video category.
#[async_trait]
pub trait ProviderConfigSource: Send + Sync {
    /// Highest-priority active config serving `model`.
    async fn config_for_model(&self, model: &str)
        -> Result<Option<AiServiceConfig>, PipelineError>;

    /// The category's default active config.
    async fn default_config(&self) -> Result<Option<AiServiceConfig>, PipelineError>;
}

/// [`ProviderConfigSource`] reading the `ai_service_configs` table.
#[derive(Clone)]
pub struct PgProviderConfigSource {
    pool: PgPool,
}

impl PgProviderConfigSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProviderConfigSource for PgProviderConfigSource {
    async fn config_for_model(
        &self,
        model: &str,
    ) -> Result<Option<AiServiceConfig>, PipelineError> {
        Ok(AiServiceConfigRepo::find_for_model(&self.pool, VIDEO_SERVICE_TYPE, model).await?)
    }

    async fn default_config(&self) -> Result<Option<AiServiceConfig>, PipelineError> {
        Ok(AiServiceConfigRepo::find_default(&self.pool, VIDEO_SERVICE_TYPE).await?)
    }
}

/// Resolves a model name to a ready-to-use [`VideoClient`].
#[derive(Clone)]
pub struct ProviderResolver {
    source: Arc<dyn ProviderConfigSource>,
    registry: Arc<ProviderRegistry>,
}

impl ProviderResolver {
    pub fn new(source: Arc<dyn ProviderConfigSource>, registry: Arc<ProviderRegistry>) -> Self {
        Self { source, registry }
    }

    /// Pick the account for `model` and construct its client.
    ///
    /// Fails with [`CoreError::Configuration`] when no account applies or
    /// its provider identifier is not registered.
    pub async fn resolve(&self, model: Option<&str>) -> Result<Arc<dyn VideoClient>, PipelineError> {
        let model = model.map(str::trim).filter(|m| !m.is_empty());
        let config = self.select_config(model).await?;

        let resolved_model = model
            .or_else(|| config.default_model())
            .unwrap_or_default()
            .to_string();

        tracing::debug!(
            config = %config.name,
            provider = %config.provider,
            model = %resolved_model,
            "Resolved video provider",
        );

        self.registry
            .build(ProviderConfig {
                provider: config.provider.clone(),
                base_url: config.base_url.clone(),
                api_key: config.api_key.clone(),
                model: resolved_model,
            })
            .map_err(|e| CoreError::Configuration(e.to_string()).into())
    }

    async fn select_config(&self, model: Option<&str>) -> Result<AiServiceConfig, PipelineError> {
        if let Some(model) = model {
            match self.source.config_for_model(model).await? {
                Some(config) => return Ok(config),
                None => {
                    tracing::warn!(model, "No video config serves model, using default");
                }
            }
        }

        self.source.default_config().await?.ok_or_else(|| {
            CoreError::Configuration(format!("no {VIDEO_SERVICE_TYPE} AI config found")).into()
        })
    }
}
