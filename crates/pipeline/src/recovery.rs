//! Startup re-attachment of pollers to interrupted jobs.

use std::sync::Arc;

use crate::error::PipelineError;
use crate::service::VideoGenerationService;

impl VideoGenerationService {
    /// Resume polling for every `processing` job that holds a provider task
    /// id. Run once at startup before accepting new work.
    ///
    /// Returns the number of pollers started. Jobs that already have a live
    /// task are skipped, so repeated scans never double-poll. A job whose
    /// provider can no longer be resolved is failed.
    pub async fn recover_processing_jobs(self: &Arc<Self>) -> Result<usize, PipelineError> {
        let jobs = self.store.list_recoverable().await?;
        tracing::info!(count = jobs.len(), "Recovering in-flight video generation jobs");

        let mut started = 0;
        for job in jobs {
            let client = match self.resolver.resolve(job.model.as_deref()).await {
                Ok(client) => client,
                Err(e) => {
                    tracing::error!(
                        job_id = job.id,
                        error = %e,
                        "Failed to resolve video client for recovery",
                    );
                    let _ = self
                        .completion
                        .fail(job.id, &format!("failed to get video client: {e}"))
                        .await;
                    continue;
                }
            };

            if self.resume_polling(&job, client).await {
                started += 1;
            }
        }

        tracing::info!(started, "Video generation recovery complete");
        Ok(started)
    }
}
