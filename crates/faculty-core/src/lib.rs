//! Shared types for the faculty client library.
//!
//! This crate provides the error model, the bounded-backoff retry helper,
//! and the API configuration used by the capability wrappers and the
//! semantic search subsystem.

/// API configuration loading.
pub mod config;
/// Error types and result definitions.
pub mod error;
/// Bounded exponential backoff for transient failures.
pub mod retry;

pub use config::ApiConfig;
pub use error::{Error, Result};
pub use retry::{BackoffPolicy, retry};
