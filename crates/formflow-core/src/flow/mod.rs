//! Flow engine — data-driven multi-step form execution.
//!
//! A flow is a set of groups (form pages) whose order past the first page is
//! decided by an external step processor. The driver collects input for the
//! current step, submits it, and follows the processor's answer.
//!
//! # Architecture
//!
//! ```text
//! FlowDefinition ──► StepPath (combined_step) ──► FormState (seeded)
//!                                                    │
//!                          validator ◄──── ExecutionDriver ────► StepProcessor
//!                                                    │                │
//!                         template / mapping ◄── context data ◄───────┘
//!                                                    │
//!                                              render (StepView)
//! ```

pub mod driver;
pub mod form_state;
pub mod mapping;
pub mod render;
pub mod step_path;
pub mod template;
pub mod validator;

pub use driver::{ExecutionDriver, FlowState, PendingSubmission, Transition};
pub use form_state::{FormState, Row};
pub use render::{render_step, FieldView, GroupBody, GroupView, InputMode, StepView, WidgetKind};
pub use step_path::{combined_step, Step, StepPath};
pub use template::resolve;
pub use validator::{validate_step, ValidationErrors};
