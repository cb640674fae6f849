//! formflow core — transport-agnostic engine for data-driven form flows.
//!
//! A flow definition (groups, fields, node mappings) is walked one step at a
//! time: the driver collects and validates input, hands it to a step
//! processor, and follows the processor's answer to the next step, a
//! confirmation prompt, an exit, or a final result. It has no UI or HTTP
//! framework dependency, making it suitable for use in:
//!
//! - terminal hosts (via `formflow-cli`)
//! - desktop or web front ends driving it over IPC
//! - headless tests with a scripted processor

pub mod config;
pub mod error;
pub mod flow;
pub mod models;
pub mod processor;

// Convenience re-exports
pub use config::ProcessorConfig;
pub use error::FlowError;
pub use flow::{ExecutionDriver, FlowState, Transition};
pub use models::FlowDefinition;
pub use processor::{HttpStepProcessor, StepProcessor};
