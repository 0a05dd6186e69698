use vidgen_core::error::CoreError;
use vidgen_providers::ProviderError;

/// Errors surfaced by the orchestration layer.
///
/// Validation, configuration and persistence failures reach the caller of
/// job creation directly. Provider failures are normally recorded on the
/// job instead and only surface here from [`crate::resolver`].
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A store rejected a write for a reason other than a database error.
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl PipelineError {
    /// Whether this is a request validation failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Core(CoreError::Validation(_)))
    }

    /// Whether this is a missing or unusable provider configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Core(CoreError::Configuration(_)))
    }
}
