//! Field mappings — pre-populate a step's inputs from the context data.
//!
//! Each group's node mapping names, per field key, a path into the context
//! and an `applyCondition` gated on the outcome of the last edge the
//! processor followed (`lastEdgeHandle`).

use serde_json::Value;

use super::form_state::{normalize_checkbox, FormState, Row};
use super::step_path::Step;
use super::template;
use crate::models::{ApplyCondition, FieldType, FlowDefinition};

/// Context key the processor uses to record which edge it followed.
pub const LAST_EDGE_HANDLE: &str = "lastEdgeHandle";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOutcome {
    Success,
    Failure,
}

/// The outcome of the last edge taken, if the context records one.
pub fn edge_outcome(ctx: &Value) -> Option<EdgeOutcome> {
    let handle = ctx.get(LAST_EDGE_HANDLE)?.as_str()?;
    match handle.trim().to_ascii_lowercase().as_str() {
        "success" | "true" | "yes" => Some(EdgeOutcome::Success),
        "failure" | "false" | "error" | "no" => Some(EdgeOutcome::Failure),
        _ => None,
    }
}

pub fn condition_applies(condition: ApplyCondition, ctx: &Value) -> bool {
    match condition {
        ApplyCondition::Always => true,
        ApplyCondition::OnSuccess => edge_outcome(ctx) == Some(EdgeOutcome::Success),
        ApplyCondition::OnFailure => edge_outcome(ctx) == Some(EdgeOutcome::Failure),
    }
}

/// Resolve a mapping's `variablePath`. Plain paths are walked directly; a
/// path written as a template is rendered and dropped if anything in it is
/// still unresolved.
fn mapped_value(variable_path: &str, ctx: &Value) -> Option<Value> {
    if variable_path.contains("{{") {
        let rendered = template::resolve(variable_path, Some(ctx));
        return (!template::has_placeholders(&rendered)).then_some(Value::String(rendered));
    }
    template::lookup(ctx, variable_path).cloned()
}

fn rows_from(value: &Value) -> Option<Vec<Row>> {
    value
        .as_array()?
        .iter()
        .map(|item| {
            item.as_object().map(|obj| {
                obj.iter()
                    .map(|(k, v)| (k.clone(), template::value_to_string(v)))
                    .collect::<Row>()
            })
        })
        .collect()
}

/// Apply the field mappings of every group in `step`. Returns how many
/// inputs were written.
pub fn apply_field_mappings(def: &FlowDefinition, step: &Step, ctx: &Value, form: &mut FormState) -> usize {
    let mut applied = 0;

    for group_id in step.group_ids() {
        let (Some(group), Some(mapping)) = (def.group(group_id), def.mapping_for(group_id)) else {
            continue;
        };
        let fields = def.fields_for(group_id);

        for (key, field_mapping) in &mapping.field_mappings {
            if !condition_applies(field_mapping.apply_condition, ctx) {
                continue;
            }
            let Some(value) = mapped_value(&field_mapping.variable_path, ctx) else {
                tracing::debug!(
                    "[FieldMapping] '{}' not found in context for field '{}'",
                    field_mapping.variable_path,
                    key
                );
                continue;
            };

            if group.array_key() == Some(key.as_str()) {
                if let Some(rows) = rows_from(&value) {
                    form.replace_rows(def, group, rows, Some(ctx));
                    applied += 1;
                }
                continue;
            }

            let Some(field) = fields.iter().find(|f| &f.key == key) else {
                continue;
            };
            let text = match (field.field_type, &value) {
                (FieldType::Checkbox, Value::Bool(b)) => (if *b { "True" } else { "False" }).to_string(),
                (FieldType::Checkbox, other) => normalize_checkbox(&template::value_to_string(other)).to_string(),
                (_, other) => template::value_to_string(other),
            };
            if form.set_value(key, text).is_ok() {
                applied += 1;
            }
        }
    }

    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::step_path::combined_step;
    use crate::models::{Field, Group, NodeMapping};
    use serde_json::json;

    fn definition() -> FlowDefinition {
        FlowDefinition::new(
            vec![
                Group::new("g", "G", 1),
                Group::new("rows", "Rows", 2).into_array("contacts", 1, 2),
            ],
            vec![
                Field::new("1", "g", "name", FieldType::Text),
                Field::new("2", "g", "note", FieldType::Text),
                Field::new("3", "g", "vip", FieldType::Checkbox),
                Field::new("4", "g", "reason", FieldType::Text),
                Field::new("5", "rows", "email", FieldType::Email),
            ],
            vec![
                NodeMapping::new("g")
                    .map_field("name", "customer.name", ApplyCondition::Always)
                    .map_field("note", "Welcome {{customer.name}}", ApplyCondition::OnSuccess)
                    .map_field("vip", "customer.vip", ApplyCondition::Always)
                    .map_field("reason", "error.message", ApplyCondition::OnFailure),
                NodeMapping::new("rows")
                    .display_with_previous()
                    .map_field("contacts", "customer.contacts", ApplyCondition::Always),
            ],
        )
    }

    #[test]
    fn test_apply_on_success_edge() {
        let def = definition();
        let mut form = FormState::seed(&def, None);
        let ctx = json!({
            "lastEdgeHandle": "success",
            "customer": {
                "name": "Ada",
                "vip": true,
                "contacts": [{"email": "a@x.io"}, {"email": "b@x.io"}, {"email": "c@x.io"}]
            },
            "error": {"message": "boom"}
        });
        let step = combined_step(&def, "g").unwrap();
        let applied = apply_field_mappings(&def, &step, &ctx, &mut form);

        assert_eq!(applied, 4);
        assert_eq!(form.value("name"), Some("Ada"));
        assert_eq!(form.value("note"), Some("Welcome Ada"));
        assert_eq!(form.value("vip"), Some("True"));
        assert_eq!(form.value("reason"), Some(""));
        let rows = form.rows("contacts");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["email"], "b@x.io");
    }

    #[test]
    fn test_apply_on_failure_edge() {
        let def = definition();
        let mut form = FormState::seed(&def, None);
        let ctx = json!({"lastEdgeHandle": "failure", "error": {"message": "boom"}});
        let step = combined_step(&def, "g").unwrap();
        apply_field_mappings(&def, &step, &ctx, &mut form);
        assert_eq!(form.value("reason"), Some("boom"));
        assert_eq!(form.value("note"), Some(""));
    }

    #[test]
    fn test_no_edge_only_always_applies() {
        let ctx = json!({"customer": {"name": "Ada"}});
        assert!(condition_applies(ApplyCondition::Always, &ctx));
        assert!(!condition_applies(ApplyCondition::OnSuccess, &ctx));
        assert!(!condition_applies(ApplyCondition::OnFailure, &ctx));
    }
}
