use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// When a field mapping is applied, relative to the last edge outcome
/// recorded in the context data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApplyCondition {
    #[default]
    Always,
    OnSuccess,
    OnFailure,
}

/// Pre-populates a field from a path inside the context data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    pub variable_path: String,
    #[serde(default)]
    pub apply_condition: ApplyCondition,
}

/// Binds a group to its backend graph node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeMapping {
    #[serde(deserialize_with = "super::de_id")]
    pub group_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    /// Field key -> mapping
    #[serde(default)]
    pub field_mappings: HashMap<String, FieldMapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_template: Option<String>,
    #[serde(default)]
    pub display_with_previous: bool,
}

impl NodeMapping {
    pub fn new(group_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            node_id: None,
            field_mappings: HashMap::new(),
            header_template: None,
            display_with_previous: false,
        }
    }

    pub fn with_node(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    pub fn display_with_previous(mut self) -> Self {
        self.display_with_previous = true;
        self
    }

    pub fn with_header(mut self, template: impl Into<String>) -> Self {
        self.header_template = Some(template.into());
        self
    }

    pub fn map_field(
        mut self,
        key: impl Into<String>,
        variable_path: impl Into<String>,
        apply_condition: ApplyCondition,
    ) -> Self {
        self.field_mappings.insert(
            key.into(),
            FieldMapping {
                variable_path: variable_path.into(),
                apply_condition,
            },
        );
        self
    }
}
