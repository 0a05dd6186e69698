//! Repository for the `ai_service_configs` table.

use sqlx::PgPool;

use crate::models::ai_service_config::AiServiceConfig;

/// Column list for `ai_service_configs` queries.
const COLUMNS: &str = "\
    id, service_type, provider, name, base_url, api_key, models, \
    is_default, is_active, priority, created_at, updated_at";

/// Provider configuration lookups.
pub struct AiServiceConfigRepo;

impl AiServiceConfigRepo {
    /// Highest-priority active config of `service_type` that serves `model`.
    pub async fn find_for_model(
        pool: &PgPool,
        service_type: &str,
        model: &str,
    ) -> Result<Option<AiServiceConfig>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM ai_service_configs \
             WHERE service_type = $1 AND is_active AND $2 = ANY(models) \
             ORDER BY priority DESC, id ASC \
             LIMIT 1"
        );
        sqlx::query_as::<_, AiServiceConfig>(&query)
            .bind(service_type)
            .bind(model)
            .fetch_optional(pool)
            .await
    }

    /// The default active config of `service_type`.
    ///
    /// Falls back to the highest-priority active config when none is
    /// flagged as default.
    pub async fn find_default(
        pool: &PgPool,
        service_type: &str,
    ) -> Result<Option<AiServiceConfig>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM ai_service_configs \
             WHERE service_type = $1 AND is_active \
             ORDER BY is_default DESC, priority DESC, id ASC \
             LIMIT 1"
        );
        sqlx::query_as::<_, AiServiceConfig>(&query)
            .bind(service_type)
            .fetch_optional(pool)
            .await
    }
}
