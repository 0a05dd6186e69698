//! Shared domain types, errors, and pure helpers for the video generation
//! job core.
//!
//! Has no internal workspace dependencies so every other crate can build
//! on it.

pub mod error;
pub mod ffmpeg;
pub mod generation;
pub mod reference;
pub mod types;
