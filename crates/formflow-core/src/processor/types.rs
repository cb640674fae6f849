//! Wire types exchanged with the step processor.
//!
//! Responses are read permissively: the processor's JSON is first taken into
//! a shape where every key is optional, then folded into exactly one
//! [`ProcessorResponse`] variant. A body matching none of the recognized
//! shapes becomes a terminal result with whatever fields it carried.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// A normal step submission.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub button_id: String,
    pub execute_parameters: Map<String, Value>,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_group_node_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_context_data: Option<Value>,
}

/// The user's answer to a confirmation prompt.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    pub button_id: String,
    pub execute_parameters: Map<String, Value>,
    pub user_id: String,
    pub user_confirmation_response: bool,
    pub pending_context_data: Value,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ExecuteRequest {
    Submit(SubmitRequest),
    Confirm(ConfirmRequest),
}

impl ExecuteRequest {
    pub fn button_id(&self) -> &str {
        match self {
            ExecuteRequest::Submit(r) => &r.button_id,
            ExecuteRequest::Confirm(r) => &r.button_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Response payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationData {
    #[serde(default)]
    pub prompt_message: String,
    #[serde(default = "default_yes")]
    pub yes_button_label: String,
    #[serde(default = "default_no")]
    pub no_button_label: String,
    #[serde(default)]
    pub show_location_map: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

fn default_yes() -> String {
    "Yes".to_string()
}

fn default_no() -> String {
    "No".to_string()
}

impl Default for ConfirmationData {
    fn default() -> Self {
        Self {
            prompt_message: String::new(),
            yes_button_label: default_yes(),
            no_button_label: default_no(),
            show_location_map: false,
            latitude: None,
            longitude: None,
        }
    }
}

/// A confirmation waiting on the user, with the context to echo back.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationPrompt {
    #[serde(flatten)]
    pub data: ConfirmationData,
    pub pending_context_data: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExitData {
    #[serde(default)]
    pub exit_message: String,
    #[serde(default)]
    pub show_restart_button: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NextGroupNode {
    #[serde(default, deserialize_with = "de_opt_text")]
    pub group_id: Option<String>,
    #[serde(default, alias = "id", deserialize_with = "de_opt_text")]
    pub node_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum StepStatus {
    Completed,
    Failed,
    Skipped,
    #[default]
    Unknown,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Unknown => "unknown",
        }
    }
}

impl From<String> for StepStatus {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "completed" | "success" => Self::Completed,
            "failed" | "error" => Self::Failed,
            "skipped" => Self::Skipped,
            _ => Self::Unknown,
        }
    }
}

impl From<StepStatus> for String {
    fn from(s: StepStatus) -> Self {
        s.as_str().to_string()
    }
}

/// Outcome of one backend node, as reported by the processor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    #[serde(default, deserialize_with = "de_opt_text", skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text", skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    #[serde(default)]
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, deserialize_with = "de_opt_text", skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text", skip_serializing_if = "Option::is_none")]
    pub request_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<Value>,
    #[serde(default, deserialize_with = "de_opt_text", skip_serializing_if = "Option::is_none")]
    pub http_method: Option<String>,
}

impl StepResult {
    /// Display name: the node name, else the step name.
    pub fn label(&self) -> &str {
        self.node.as_deref().or(self.step.as_deref()).unwrap_or("step")
    }
}

/// The terminal outcome of a flow run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub results: Vec<StepResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ExecutionResult {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Response union
// ---------------------------------------------------------------------------

/// Exactly one outcome of a processor call.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawResponse")]
pub enum ProcessorResponse {
    Confirmation {
        data: ConfirmationData,
        pending_context_data: Value,
        context_data: Option<Value>,
    },
    Exit {
        exit: ExitData,
        context_data: Option<Value>,
    },
    Advance {
        next: NextGroupNode,
        context_data: Option<Value>,
    },
    Terminal(ExecutionResult),
}

impl ProcessorResponse {
    /// Context to merge before the response is acted on.
    pub fn context_data(&self) -> Option<&Value> {
        match self {
            ProcessorResponse::Confirmation { context_data, .. }
            | ProcessorResponse::Exit { context_data, .. }
            | ProcessorResponse::Advance { context_data, .. } => context_data.as_ref(),
            ProcessorResponse::Terminal(result) => result.context_data.as_ref(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProcessorResponse::Confirmation { .. } => "confirmation",
            ProcessorResponse::Exit { .. } => "exit",
            ProcessorResponse::Advance { .. } => "advance",
            ProcessorResponse::Terminal(_) => "terminal",
        }
    }

    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawResponse {
    requires_confirmation: Option<Value>,
    confirmation_data: Option<ConfirmationData>,
    pending_context_data: Option<Value>,
    exit_data: Option<ExitData>,
    next_group_node: Option<NextGroupNode>,
    context_data: Option<Value>,
    success: Option<Value>,
    #[serde(deserialize_with = "de_lenient_results")]
    results: Vec<StepResult>,
    #[serde(deserialize_with = "de_opt_text")]
    error: Option<String>,
    #[serde(deserialize_with = "de_opt_text")]
    message: Option<String>,
}

impl From<RawResponse> for ProcessorResponse {
    fn from(raw: RawResponse) -> Self {
        let context_data = raw.context_data.filter(|c| !c.is_null());

        if raw.requires_confirmation.as_ref().is_some_and(truthy) {
            return ProcessorResponse::Confirmation {
                data: raw.confirmation_data.unwrap_or_default(),
                pending_context_data: raw
                    .pending_context_data
                    .unwrap_or_else(|| Value::Object(Map::new())),
                context_data,
            };
        }
        if let Some(exit) = raw.exit_data {
            return ProcessorResponse::Exit { exit, context_data };
        }
        if let Some(next) = raw.next_group_node {
            return ProcessorResponse::Advance { next, context_data };
        }

        ProcessorResponse::Terminal(ExecutionResult {
            success: raw.success.as_ref().is_some_and(truthy),
            results: raw.results,
            error: raw.error,
            context_data,
            message: raw.message,
        })
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.eq_ignore_ascii_case("true"),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    }
}

/// Accept any JSON scalar or structure as optional text; `null` is absent.
fn de_opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Object(obj) if obj.get("message").is_some_and(Value::is_string) => {
            obj.get("message").and_then(Value::as_str).map(str::to_string)
        }
        other => Some(other.to_string()),
    })
}

/// Keep the entries of `results` that parse; drop the rest.
fn de_lenient_results<'de, D>(deserializer: D) -> Result<Vec<StepResult>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}
