//! Per-job provider status polling.
//!
//! A [`Poller`] repeatedly queries the provider for one task until it
//! reaches a terminal state, the job leaves `processing`, or the attempt
//! budget runs out. Each in-flight job runs as a single task tracked by
//! the [`PollerRegistry`], which guarantees at most one live task per job
//! id and stops all of them on shutdown.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use vidgen_core::generation::{MISSING_VIDEO_URL_MESSAGE, POLL_TIMEOUT_MESSAGE};
use vidgen_core::types::DbId;
use vidgen_db::models::status::VideoGenerationStatus;
use vidgen_providers::VideoClient;

use crate::completion::CompletionHandler;
use crate::store::JobStore;

/// Polling cadence and budget. `interval * max_attempts` is the hard
/// ceiling on how long a job may stay `processing`.
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_attempts: u32,
}

/// A task to follow.
#[derive(Clone)]
pub struct PollTarget {
    pub job_id: DbId,
    pub storyboard_id: Option<DbId>,
    pub task_id: String,
    pub client: Arc<dyn VideoClient>,
}

/// How a polling loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Completed,
    Failed,
    /// The job left `processing` through another actor, or was deleted.
    Halted,
    TimedOut,
    /// Shutdown requested; the job stays `processing` for recovery.
    Cancelled,
    /// A terminal write failed; the job stays in its prior state.
    WriteFailed,
}

/// Drives one task to a terminal state.
pub struct Poller {
    store: Arc<dyn JobStore>,
    completion: Arc<CompletionHandler>,
    settings: PollSettings,
}

impl Poller {
    pub fn new(
        store: Arc<dyn JobStore>,
        completion: Arc<CompletionHandler>,
        settings: PollSettings,
    ) -> Self {
        Self {
            store,
            completion,
            settings,
        }
    }

    /// Poll until terminal, halted, timed out or cancelled.
    pub async fn run(&self, target: &PollTarget, cancel: &CancellationToken) -> PollOutcome {
        let job_id = target.job_id;
        tracing::info!(
            job_id,
            task_id = %target.task_id,
            provider = target.client.provider(),
            "Polling video task",
        );

        for attempt in 1..=self.settings.max_attempts {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(job_id, "Poller stopping for shutdown");
                    return PollOutcome::Cancelled;
                }
                _ = tokio::time::sleep(self.settings.interval) => {}
            }

            match self.store.job_status(job_id).await {
                Ok(Some(status)) if status == VideoGenerationStatus::Processing.id() => {}
                Ok(status) => {
                    tracing::info!(
                        job_id,
                        status = ?status.and_then(VideoGenerationStatus::from_id),
                        "Job no longer processing, stopping poll",
                    );
                    return PollOutcome::Halted;
                }
                Err(e) => {
                    tracing::warn!(job_id, attempt, error = %e, "Failed to read job status");
                    continue;
                }
            }

            let status = match target.client.poll_status(&target.task_id).await {
                Ok(status) => status,
                Err(e) => {
                    tracing::warn!(
                        job_id,
                        task_id = %target.task_id,
                        attempt,
                        error = %e,
                        "Failed to query task status",
                    );
                    continue;
                }
            };

            if status.completed {
                return match status.output() {
                    Some(output) => {
                        match self
                            .completion
                            .complete(job_id, target.storyboard_id, output)
                            .await
                        {
                            Ok(true) => PollOutcome::Completed,
                            Ok(false) => PollOutcome::Halted,
                            Err(_) => PollOutcome::WriteFailed,
                        }
                    }
                    None => self.fail(job_id, MISSING_VIDEO_URL_MESSAGE).await,
                };
            }

            if let Some(message) = status.error_message() {
                return self.fail(job_id, message).await;
            }

            tracing::debug!(job_id, attempt, "Video generation in progress");
        }

        tracing::warn!(
            job_id,
            attempts = self.settings.max_attempts,
            "Polling budget exhausted",
        );
        match self.fail(job_id, POLL_TIMEOUT_MESSAGE).await {
            PollOutcome::Failed => PollOutcome::TimedOut,
            other => other,
        }
    }

    async fn fail(&self, job_id: DbId, message: &str) -> PollOutcome {
        match self.completion.fail(job_id, message).await {
            Ok(true) => PollOutcome::Failed,
            Ok(false) => PollOutcome::Halted,
            Err(_) => PollOutcome::WriteFailed,
        }
    }
}

struct ActiveTask {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Tasks {
    next_generation: u64,
    active: HashMap<DbId, ActiveTask>,
}

/// Tracks the single live task of each in-flight job.
pub struct PollerRegistry {
    tasks: Arc<Mutex<Tasks>>,
    /// Master cancellation token, cancelled during shutdown.
    cancel: CancellationToken,
}

impl PollerRegistry {
    pub fn new() -> Self {
        Self::with_cancel(CancellationToken::new())
    }

    pub fn with_cancel(cancel: CancellationToken) -> Self {
        Self {
            tasks: Arc::new(Mutex::new(Tasks::default())),
            cancel,
        }
    }

    /// Token observed by every registered task.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Spawn `work` as the task for `job_id`.
    ///
    /// Returns `false` without spawning when the job already has a live
    /// task. Finished tasks deregister themselves.
    pub async fn spawn<F>(&self, job_id: DbId, work: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().await;
        if let Some(existing) = tasks.active.get(&job_id) {
            if !existing.handle.is_finished() {
                tracing::debug!(job_id, "Job already has a live task");
                return false;
            }
        }

        tasks.next_generation += 1;
        let generation = tasks.next_generation;
        let registry = Arc::clone(&self.tasks);
        let handle = tokio::spawn(async move {
            work.await;
            let mut tasks = registry.lock().await;
            if tasks
                .active
                .get(&job_id)
                .is_some_and(|t| t.generation == generation)
            {
                tasks.active.remove(&job_id);
            }
        });

        tasks.active.insert(job_id, ActiveTask { generation, handle });
        true
    }

    /// Whether `job_id` has a live task.
    pub async fn is_active(&self, job_id: DbId) -> bool {
        self.tasks
            .lock()
            .await
            .active
            .get(&job_id)
            .is_some_and(|t| !t.handle.is_finished())
    }

    /// Number of live tasks.
    pub async fn active_count(&self) -> usize {
        self.tasks
            .lock()
            .await
            .active
            .values()
            .filter(|t| !t.handle.is_finished())
            .count()
    }

    /// Wait for every task registered so far to finish.
    pub async fn join_all(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut tasks = self.tasks.lock().await;
            tasks.active.drain().map(|(_, t)| t.handle).collect()
        };
        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Job task panicked");
            }
        }
    }

    /// Cancel all tasks and wait for them to stop. Jobs keep their status.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.join_all().await;
        tracing::info!("All job tasks stopped");
    }
}

impl Default for PollerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
