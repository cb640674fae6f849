//! Step processor — the backend service that executes a node's side effects
//! and decides where the flow goes next.
//!
//! The engine only depends on the [`StepProcessor`] trait; the HTTP client
//! is one implementation, tests use scripted in-memory ones.

pub mod http;
pub mod types;

pub use http::HttpStepProcessor;
pub use types::{
    ConfirmRequest, ConfirmationData, ConfirmationPrompt, ExecuteRequest, ExecutionResult, ExitData,
    NextGroupNode, ProcessorResponse, StepResult, StepStatus, SubmitRequest,
};

use async_trait::async_trait;

use crate::error::FlowError;

#[async_trait]
pub trait StepProcessor: Send + Sync {
    /// Execute one request. Transport and backend failures are `Err`; every
    /// well-formed reply, including a failed terminal result, is `Ok`.
    async fn process(&self, request: &ExecuteRequest) -> Result<ProcessorResponse, FlowError>;
}
