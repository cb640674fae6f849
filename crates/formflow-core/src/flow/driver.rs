//! Execution driver — the state machine that walks a flow.
//!
//! ```text
//!                 execute (valid)            nextGroupNode
//!  CollectingInput ─────────────► Submitting ─────────────► CollectingInput(i+1)
//!        ▲  back/forward              │ │ │
//!        │                            │ │ └─ exitData ──────► Exited
//!        │ reset (from anywhere)      │ └─── terminal ──────► Completed
//!        │                            ▼
//!        │                  AwaitingConfirmation ── answer ──► Submitting
//! ```
//!
//! Submission is split into [`ExecutionDriver::begin_submission`] and
//! [`ExecutionDriver::finish_submission`] so a host can run the processor
//! call however it likes. Every reset bumps a generation counter; an outcome
//! that arrives for an older generation is discarded instead of applied.

use serde_json::{Map, Value};

use super::form_state::{normalize_checkbox, FormState};
use super::mapping::apply_field_mappings;
use super::step_path::{combined_step, Step, StepPath};
use super::validator::{validate_step, ValidationErrors};
use crate::error::FlowError;
use crate::models::{FieldType, FlowDefinition, Group};
use crate::processor::{
    ConfirmRequest, ConfirmationPrompt, ExecuteRequest, ExecutionResult, ExitData, NextGroupNode,
    ProcessorResponse, StepProcessor, SubmitRequest,
};

#[derive(Debug, Clone, PartialEq)]
pub enum FlowState {
    CollectingInput { step_index: usize },
    Submitting { step_index: usize },
    AwaitingConfirmation { step_index: usize, prompt: ConfirmationPrompt },
    Exited(ExitData),
    Completed(ExecutionResult),
}

impl FlowState {
    pub fn name(&self) -> &'static str {
        match self {
            FlowState::CollectingInput { .. } => "collecting input",
            FlowState::Submitting { .. } => "submitting",
            FlowState::AwaitingConfirmation { .. } => "awaiting confirmation",
            FlowState::Exited(_) => "exited",
            FlowState::Completed(_) => "completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowState::Exited(_) | FlowState::Completed(_))
    }
}

/// What a finished submission did to the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Advanced { step_index: usize },
    ConfirmationRequired,
    Exited,
    Completed { success: bool },
    /// The outcome belonged to a submission made before the last reset.
    Discarded,
}

/// A request that has left the driver and is waiting on the processor.
#[derive(Debug, Clone)]
pub struct PendingSubmission {
    instance_id: String,
    generation: u64,
    step_index: usize,
    pub request: ExecuteRequest,
}

impl PendingSubmission {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// One run of one flow, owned by a single host (e.g. one modal).
pub struct ExecutionDriver {
    instance_id: String,
    definition: FlowDefinition,
    button_id: String,
    user_id: String,
    step_path: StepPath,
    form: FormState,
    context: Option<Map<String, Value>>,
    errors: ValidationErrors,
    state: FlowState,
    generation: u64,
}

impl ExecutionDriver {
    pub fn new(
        definition: FlowDefinition,
        button_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Result<Self, FlowError> {
        definition.validate()?;
        let step_path = StepPath::initial(&definition);
        if step_path.is_empty() {
            return Err(FlowError::Definition("flow has no groups".to_string()));
        }
        let form = FormState::seed(&definition, None);
        let instance_id = uuid::Uuid::new_v4().to_string();
        let button_id = button_id.into();

        tracing::info!(
            "[Driver:{}] Created for button {} ({}, {} group(s))",
            short_id(&instance_id),
            button_id,
            definition.name.as_deref().unwrap_or("unnamed flow"),
            definition.groups.len()
        );

        Ok(Self {
            instance_id,
            definition,
            button_id,
            user_id: user_id.into(),
            step_path,
            form,
            context: None,
            errors: ValidationErrors::new(),
            state: FlowState::CollectingInput { step_index: 0 },
            generation: 0,
        })
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn definition(&self) -> &FlowDefinition {
        &self.definition
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn step_path(&self) -> &StepPath {
        &self.step_path
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Accumulated context data; `None` until a response has carried some.
    pub fn context_data(&self) -> Option<Value> {
        self.context.clone().map(Value::Object)
    }

    /// Index of the step on screen, if the flow is not terminal.
    pub fn current_step_index(&self) -> Option<usize> {
        match self.state {
            FlowState::CollectingInput { step_index }
            | FlowState::Submitting { step_index }
            | FlowState::AwaitingConfirmation { step_index, .. } => Some(step_index),
            FlowState::Exited(_) | FlowState::Completed(_) => None,
        }
    }

    pub fn current_step(&self) -> Option<&Step> {
        self.current_step_index().and_then(|i| self.step_path.get(i))
    }

    /// Groups of the current step, in display order.
    pub fn current_groups(&self) -> Vec<&Group> {
        self.current_step()
            .map(|step| {
                step.group_ids()
                    .iter()
                    .filter_map(|id| self.definition.group(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// A request is in flight; hosts disable Execute/Continue while true.
    pub fn is_busy(&self) -> bool {
        matches!(self.state, FlowState::Submitting { .. })
    }

    pub fn can_back(&self) -> bool {
        matches!(self.state, FlowState::CollectingInput { step_index } if step_index > 0)
    }

    pub fn can_forward(&self) -> bool {
        matches!(self.state, FlowState::CollectingInput { step_index } if step_index + 1 < self.step_path.len())
    }

    pub fn can_add_row(&self, group_id: &str) -> bool {
        self.definition
            .group(group_id)
            .is_some_and(|g| self.form.can_add_row(g))
    }

    pub fn can_remove_row(&self, group_id: &str) -> bool {
        self.definition
            .group(group_id)
            .is_some_and(|g| self.form.can_remove_row(g))
    }

    // ── Input ─────────────────────────────────────────────────────────────

    fn collecting_index(&self, action: &'static str) -> Result<usize, FlowError> {
        match self.state {
            FlowState::CollectingInput { step_index } => Ok(step_index),
            ref other => Err(FlowError::InvalidState {
                state: other.name(),
                action,
            }),
        }
    }

    pub fn set_value(&mut self, key: &str, value: impl Into<String>) -> Result<(), FlowError> {
        self.collecting_index("set a value")?;
        let mut value = value.into();
        let is_checkbox = self
            .definition
            .fields
            .iter()
            .any(|f| f.key == key && f.field_type == FieldType::Checkbox);
        if is_checkbox {
            value = normalize_checkbox(&value).to_string();
        }
        self.form.set_value(key, value)?;
        self.errors.remove(key);
        Ok(())
    }

    pub fn set_row_value(
        &mut self,
        array: &str,
        row: usize,
        key: &str,
        value: impl Into<String>,
    ) -> Result<(), FlowError> {
        self.collecting_index("set a row value")?;
        let mut value = value.into();
        let is_checkbox = self
            .definition
            .groups
            .iter()
            .filter(|g| g.array_key() == Some(array))
            .flat_map(|g| self.definition.fields_for(&g.id))
            .any(|f| f.key == key && f.field_type == FieldType::Checkbox);
        if is_checkbox {
            value = normalize_checkbox(&value).to_string();
        }
        self.form.set_row_value(array, row, key, value)?;
        self.errors.remove(&format!("{}[{}].{}", array, row, key));
        Ok(())
    }

    pub fn add_row(&mut self, group_id: &str) -> Result<usize, FlowError> {
        self.collecting_index("add a row")?;
        let group = self.group(group_id)?.clone();
        let ctx = self.context_data();
        self.form.add_row(&self.definition, &group, ctx.as_ref())
    }

    pub fn remove_row(&mut self, group_id: &str, index: usize) -> Result<(), FlowError> {
        self.collecting_index("remove a row")?;
        let group = self.group(group_id)?.clone();
        self.form.remove_row(&group, index)?;
        // Row indices shift, so stale row errors no longer point anywhere useful
        if let Some(array) = group.array_key() {
            let prefix = format!("{}[", array);
            self.errors.retain(|k, _| !k.starts_with(&prefix));
        }
        Ok(())
    }

    fn group(&self, group_id: &str) -> Result<&Group, FlowError> {
        self.definition
            .group(group_id)
            .ok_or_else(|| FlowError::UnknownField(format!("group '{}'", group_id)))
    }

    /// Validate the current step, storing the errors for display.
    pub fn validate_current(&mut self) -> Result<(), FlowError> {
        let index = self.collecting_index("validate")?;
        let step = self
            .step_path
            .get(index)
            .ok_or_else(|| FlowError::Definition(format!("step {} is not on the path", index)))?;
        self.errors = validate_step(&self.definition, step, &self.form);
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(FlowError::Validation(self.errors.clone()))
        }
    }

    // ── Navigation ────────────────────────────────────────────────────────

    /// Show the previous step. Nothing is removed from the path and no
    /// entered value is touched.
    pub fn back(&mut self) -> Result<usize, FlowError> {
        let index = self.collecting_index("go back")?;
        if index == 0 {
            return Err(FlowError::InvalidState {
                state: "on the first step",
                action: "go back",
            });
        }
        self.errors.clear();
        self.state = FlowState::CollectingInput { step_index: index - 1 };
        Ok(index - 1)
    }

    /// Return to a step already reached before going back.
    pub fn forward(&mut self) -> Result<usize, FlowError> {
        let index = self.collecting_index("go forward")?;
        if index + 1 >= self.step_path.len() {
            return Err(FlowError::InvalidState {
                state: "on the last discovered step",
                action: "go forward",
            });
        }
        self.errors.clear();
        self.state = FlowState::CollectingInput { step_index: index + 1 };
        Ok(index + 1)
    }

    /// Back to the first step with every value, the context and the path
    /// re-seeded. Any submission still in flight is orphaned.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.step_path = StepPath::initial(&self.definition);
        self.form = FormState::seed(&self.definition, None);
        self.context = None;
        self.errors.clear();
        self.state = FlowState::CollectingInput { step_index: 0 };
        tracing::info!(
            "[Driver:{}] Reset (generation {})",
            short_id(&self.instance_id),
            self.generation
        );
    }

    // ── Submission ────────────────────────────────────────────────────────

    /// Validate the current step and produce the request to send.
    pub fn begin_submission(&mut self) -> Result<PendingSubmission, FlowError> {
        let step_index = self.collecting_index("submit")?;
        self.validate_current()?;

        let current_group_node_id = self
            .step_path
            .get(step_index)
            .and_then(|step| self.definition.mapping_for(step.lead_group_id()))
            .and_then(|m| m.node_id.clone());

        let request = ExecuteRequest::Submit(SubmitRequest {
            button_id: self.button_id.clone(),
            execute_parameters: self.form.to_execute_parameters(),
            user_id: self.user_id.clone(),
            current_group_node_id,
            existing_context_data: self.context_data(),
        });

        tracing::info!(
            "[Driver:{}] Submitting step {}/{}",
            short_id(&self.instance_id),
            step_index + 1,
            self.step_path.len()
        );
        Ok(self.pending(step_index, request))
    }

    /// Answer the open confirmation prompt, echoing its pending context.
    pub fn begin_confirmation(&mut self, answer: bool) -> Result<PendingSubmission, FlowError> {
        let (step_index, pending_context_data) = match &self.state {
            FlowState::AwaitingConfirmation { step_index, prompt } => {
                (*step_index, prompt.pending_context_data.clone())
            }
            other => {
                return Err(FlowError::InvalidState {
                    state: other.name(),
                    action: "answer a confirmation",
                })
            }
        };

        let request = ExecuteRequest::Confirm(ConfirmRequest {
            button_id: self.button_id.clone(),
            execute_parameters: self.form.to_execute_parameters(),
            user_id: self.user_id.clone(),
            user_confirmation_response: answer,
            pending_context_data,
        });

        tracing::info!(
            "[Driver:{}] Confirmation answered: {}",
            short_id(&self.instance_id),
            if answer { "yes" } else { "no" }
        );
        Ok(self.pending(step_index, request))
    }

    fn pending(&mut self, step_index: usize, request: ExecuteRequest) -> PendingSubmission {
        self.state = FlowState::Submitting { step_index };
        PendingSubmission {
            instance_id: self.instance_id.clone(),
            generation: self.generation,
            step_index,
            request,
        }
    }

    /// Apply the processor's outcome for `pending`. Transport and processor
    /// errors end the flow as a failed result.
    pub fn finish_submission(
        &mut self,
        pending: PendingSubmission,
        outcome: Result<ProcessorResponse, FlowError>,
    ) -> Transition {
        let current = matches!(self.state, FlowState::Submitting { step_index } if step_index == pending.step_index);
        if pending.instance_id != self.instance_id || pending.generation != self.generation || !current {
            tracing::warn!(
                "[Driver:{}] Discarding stale response (generation {}, current {})",
                short_id(&self.instance_id),
                pending.generation,
                self.generation
            );
            return Transition::Discarded;
        }

        match outcome {
            Ok(response) => self.apply_response(pending.step_index, response),
            Err(e) => {
                tracing::error!("[Driver:{}] Submission failed: {}", short_id(&self.instance_id), e);
                self.state = FlowState::Completed(ExecutionResult::failure(e.to_string()));
                Transition::Completed { success: false }
            }
        }
    }

    fn apply_response(&mut self, step_index: usize, response: ProcessorResponse) -> Transition {
        if let Some(incoming) = response.context_data() {
            self.merge_context(incoming);
        }
        tracing::debug!(
            "[Driver:{}] Response: {}",
            short_id(&self.instance_id),
            response.kind()
        );

        match response {
            ProcessorResponse::Confirmation {
                data,
                pending_context_data,
                context_data,
            } => {
                if context_data.is_some() {
                    self.reapply_mappings(step_index);
                }
                self.state = FlowState::AwaitingConfirmation {
                    step_index,
                    prompt: ConfirmationPrompt {
                        data,
                        pending_context_data,
                    },
                };
                Transition::ConfirmationRequired
            }
            ProcessorResponse::Exit { exit, .. } => {
                self.state = FlowState::Exited(exit);
                Transition::Exited
            }
            ProcessorResponse::Advance { next, .. } => self.advance(step_index, &next),
            ProcessorResponse::Terminal(result) => {
                let success = result.success;
                self.state = FlowState::Completed(result);
                Transition::Completed { success }
            }
        }
    }

    fn advance(&mut self, from_index: usize, next: &NextGroupNode) -> Transition {
        let group_id = next
            .group_id
            .as_deref()
            .and_then(|id| self.definition.group(id))
            .or_else(|| {
                next.node_id
                    .as_deref()
                    .and_then(|id| self.definition.group_for_node(id))
            })
            .map(|g| g.id.clone());

        let Some(step) = group_id.and_then(|id| combined_step(&self.definition, &id)) else {
            let wanted = next.group_id.clone().or_else(|| next.node_id.clone()).unwrap_or_default();
            tracing::error!(
                "[Driver:{}] Processor named unknown group '{}'",
                short_id(&self.instance_id),
                wanted
            );
            self.state = FlowState::Completed(ExecutionResult::failure(format!(
                "Next group '{}' is not part of this flow",
                wanted
            )));
            return Transition::Completed { success: false };
        };

        let step_index = self.step_path.advance_from(from_index, step.clone());
        self.enter_step(&step);
        self.errors.clear();
        self.state = FlowState::CollectingInput { step_index };

        tracing::info!(
            "[Driver:{}] Advanced to step {} ({})",
            short_id(&self.instance_id),
            step_index + 1,
            step.group_ids().join(" + ")
        );
        Transition::Advanced { step_index }
    }

    /// Seed still-empty inputs of a newly entered step, then let the field
    /// mappings overwrite from the context.
    fn enter_step(&mut self, step: &Step) {
        let ctx = self.context_data();
        for group_id in step.group_ids() {
            if let Some(group) = self.definition.group(group_id) {
                self.form.fill_empty(&self.definition, group, ctx.as_ref());
            }
        }
        if let Some(ref ctx) = ctx {
            apply_field_mappings(&self.definition, step, ctx, &mut self.form);
        }
    }

    /// Context changed without leaving the step; refresh its mapped fields.
    fn reapply_mappings(&mut self, step_index: usize) {
        let (Some(step), Some(ctx)) = (self.step_path.get(step_index).cloned(), self.context_data()) else {
            return;
        };
        apply_field_mappings(&self.definition, &step, &ctx, &mut self.form);
    }

    /// Shallow merge: every top-level key of `incoming` replaces ours.
    fn merge_context(&mut self, incoming: &Value) {
        match incoming {
            Value::Object(map) => {
                let context = self.context.get_or_insert_with(Map::new);
                for (key, value) in map {
                    context.insert(key.clone(), value.clone());
                }
            }
            Value::Null => {}
            other => tracing::warn!(
                "[Driver:{}] Ignoring non-object contextData: {}",
                short_id(&self.instance_id),
                other
            ),
        }
    }

    // ── Async conveniences ────────────────────────────────────────────────

    /// Submit the current step through `processor` and apply the reply.
    pub async fn execute(&mut self, processor: &dyn StepProcessor) -> Result<Transition, FlowError> {
        let pending = self.begin_submission()?;
        let outcome = processor.process(&pending.request).await;
        Ok(self.finish_submission(pending, outcome))
    }

    /// Answer the open confirmation through `processor` and apply the reply.
    pub async fn answer_confirmation(
        &mut self,
        processor: &dyn StepProcessor,
        answer: bool,
    ) -> Result<Transition, FlowError> {
        let pending = self.begin_confirmation(answer)?;
        let outcome = processor.process(&pending.request).await;
        Ok(self.finish_submission(pending, outcome))
    }
}

fn short_id(id: &str) -> &str {
    &id[..id.len().min(8)]
}
