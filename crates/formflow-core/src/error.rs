//! Core error type for the formflow engine.
//!
//! `FlowError` is returned by definition loading, the step processor seam and
//! the execution driver. Validation failures carry the field-scoped messages
//! so a host can render them next to the offending inputs.

use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("Invalid flow definition: {0}")]
    Definition(String),

    #[error("Validation failed for {} field(s)", .0.len())]
    Validation(BTreeMap<String, String>),

    #[error("Operation not allowed while {state}: {action}")]
    InvalidState { state: &'static str, action: &'static str },

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Row limit reached: {0}")]
    RowLimit(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Step processor error: {0}")]
    Processor(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for FlowError {
    fn from(err: serde_json::Error) -> Self {
        FlowError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for FlowError {
    fn from(err: reqwest::Error) -> Self {
        FlowError::Transport(err.to_string())
    }
}
