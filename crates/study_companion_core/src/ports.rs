//! crates/study_companion_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of the concrete model provider.

use crate::pipeline::StageSpec;
use async_trait::async_trait;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from the external executor
/// (network failures, provider errors, malformed credentials).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// The credential is missing or blank; no call was dispatched.
    #[error("Missing or invalid credential: {0}")]
    Credential(String),
    /// A stage call failed; earlier stages may have run but no effect was
    /// applied by the caller.
    #[error("Stage '{stage}' failed: {message}")]
    StageFailed { stage: String, message: String },
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The external sequential task runner.
///
/// Implementations execute the stages strictly in order, giving later
/// stages access to earlier stages' outputs as context, and return the
/// final stage's raw text. A stage failure aborts the pipeline; there is
/// no retry, timeout, or cancellation at this boundary.
#[async_trait]
pub trait PipelineExecutor: Send + Sync {
    async fn run_pipeline(&self, credential: &str, stages: &[StageSpec]) -> PortResult<String>;
}
