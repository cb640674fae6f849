//! Flow definition — the groups, fields and node mappings of one flow.
//!
//! Definitions are authored elsewhere and handed to the engine as JSON or
//! YAML:
//!
//! ```yaml
//! name: "Intake"
//! groups:
//!   - { id: "a", name: "Applicant", sortOrder: 1 }
//!   - { id: "b", name: "Address", sortOrder: 2 }
//! fields:
//!   - { id: "1", groupId: "a", name: "Email", key: "email", type: email, required: true }
//! nodeMappings:
//!   - { groupId: "b", nodeId: "n2", displayWithPrevious: true }
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{Field, Group, NodeMapping};
use crate::error::FlowError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub groups: Vec<Group>,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub node_mappings: Vec<NodeMapping>,
}

impl FlowDefinition {
    pub fn new(groups: Vec<Group>, fields: Vec<Field>, node_mappings: Vec<NodeMapping>) -> Self {
        let mut def = Self {
            name: None,
            groups,
            fields,
            node_mappings,
        };
        def.normalize();
        def
    }

    pub fn from_json(json: &str) -> Result<Self, FlowError> {
        let mut def: Self = serde_json::from_str(json)
            .map_err(|e| FlowError::Definition(format!("Failed to parse flow JSON: {}", e)))?;
        def.normalize();
        Ok(def)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, FlowError> {
        let mut def: Self = serde_yaml::from_str(yaml)
            .map_err(|e| FlowError::Definition(format!("Failed to parse flow YAML: {}", e)))?;
        def.normalize();
        Ok(def)
    }

    /// Load a definition, picking the parser from the file extension
    /// (`.yaml`/`.yml` for YAML, anything else as JSON).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FlowError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            FlowError::Definition(format!("Failed to read flow file '{}': {}", path.display(), e))
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&content),
            _ => Self::from_json(&content),
        }
    }

    /// Groups are presented in `sortOrder`; ties keep authoring order.
    fn normalize(&mut self) {
        self.groups.sort_by_key(|g| g.sort_order);
    }

    /// Check the referential invariants the engine relies on.
    pub fn validate(&self) -> Result<(), FlowError> {
        let mut group_ids = HashSet::new();
        for group in &self.groups {
            if !group_ids.insert(group.id.as_str()) {
                return Err(FlowError::Definition(format!("Duplicate group id '{}'", group.id)));
            }
            if group.is_array_group {
                if group.array_field_name.as_deref().map_or(true, str::is_empty) {
                    return Err(FlowError::Definition(format!(
                        "Array group '{}' has no arrayFieldName",
                        group.id
                    )));
                }
                if group.array_min_rows > group.array_max_rows {
                    return Err(FlowError::Definition(format!(
                        "Array group '{}' has arrayMinRows {} > arrayMaxRows {}",
                        group.id, group.array_min_rows, group.array_max_rows
                    )));
                }
            }
        }

        let mut keys = HashSet::new();
        for field in &self.fields {
            if !group_ids.contains(field.group_id.as_str()) {
                return Err(FlowError::Definition(format!(
                    "Field '{}' references unknown group '{}'",
                    field.key, field.group_id
                )));
            }
            if !keys.insert((field.group_id.as_str(), field.key.as_str())) {
                return Err(FlowError::Definition(format!(
                    "Duplicate field key '{}' in group '{}'",
                    field.key, field.group_id
                )));
            }
        }

        for mapping in &self.node_mappings {
            if !group_ids.contains(mapping.group_id.as_str()) {
                return Err(FlowError::Definition(format!(
                    "Node mapping references unknown group '{}'",
                    mapping.group_id
                )));
            }
        }

        Ok(())
    }

    pub fn first_group(&self) -> Option<&Group> {
        self.groups.first()
    }

    pub fn group(&self, id: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn group_index(&self, id: &str) -> Option<usize> {
        self.groups.iter().position(|g| g.id == id)
    }

    /// Fields of a group, in `sortOrder`.
    pub fn fields_for<'a>(&'a self, group_id: &str) -> Vec<&'a Field> {
        let mut fields: Vec<&Field> = self.fields.iter().filter(|f| f.group_id == group_id).collect();
        fields.sort_by_key(|f| f.sort_order);
        fields
    }

    pub fn mapping_for(&self, group_id: &str) -> Option<&NodeMapping> {
        self.node_mappings.iter().find(|m| m.group_id == group_id)
    }

    /// Reverse lookup used when the processor names a node instead of a group.
    pub fn group_for_node(&self, node_id: &str) -> Option<&Group> {
        self.node_mappings
            .iter()
            .find(|m| m.node_id.as_deref() == Some(node_id))
            .and_then(|m| self.group(&m.group_id))
    }
}
