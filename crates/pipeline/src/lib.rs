//! Video generation job orchestration.
//!
//! A job is created by [`service::VideoGenerationService`], dispatched to a
//! provider resolved through [`resolver::ProviderResolver`], followed by a
//! [`poller::Poller`] when the provider answers with a task handle, and
//! finalized by [`completion::CompletionHandler`]. Each in-flight job runs
//! as one task tracked in the [`poller::PollerRegistry`]; after a restart
//! [`service::VideoGenerationService::recover_processing_jobs`] re-attaches
//! pollers from the persisted task ids.

pub mod cache;
pub mod completion;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod poller;
mod recovery;
pub mod request;
pub mod resolver;
pub mod service;
pub mod store;

pub use completion::CompletionHandler;
pub use config::PipelineConfig;
pub use error::PipelineError;
pub use request::GenerateVideoRequest;
pub use resolver::ProviderResolver;
pub use service::VideoGenerationService;
pub use store::{JobStore, PgJobStore};
