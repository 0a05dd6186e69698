//! Video synthesis provider clients.
//!
//! Every remote provider implements the [`client::VideoClient`] capability:
//! submit a generation and, for asynchronous providers, poll the returned
//! task handle. Concrete variants differ only in wire encoding. The
//! [`registry::ProviderRegistry`] maps provider identifiers to client
//! constructors so adding a provider means registering it, not editing a
//! dispatch function.

pub mod chatfire;
pub mod client;
pub mod error;
pub mod http;
pub mod minimax;
pub mod openai;
pub mod options;
pub mod registry;
pub mod volces;

pub use client::{GenerateOutcome, TaskStatus, VideoClient, VideoOutput};
pub use error::ProviderError;
pub use options::GenerationOptions;
pub use registry::{ProviderConfig, ProviderRegistry};
