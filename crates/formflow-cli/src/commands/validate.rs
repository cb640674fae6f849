//! `formflow validate` — Check a flow definition without running it.

use formflow_core::flow::template::has_placeholders;
use formflow_core::models::FieldType;
use formflow_core::FlowDefinition;

use super::load_definition;

pub fn run(path: &str) -> Result<(), String> {
    let definition = load_definition(path)?;

    for line in summary(&definition) {
        println!("{}", line);
    }

    let warnings = warnings(&definition);
    if !warnings.is_empty() {
        println!();
        for warning in &warnings {
            println!("⚠️  {}", warning);
        }
    }
    Ok(())
}

/// Human-readable overview of a definition that passed validation.
pub fn summary(definition: &FlowDefinition) -> Vec<String> {
    let mut lines = vec![
        format!(
            "✅ Flow '{}' is valid",
            definition.name.as_deref().unwrap_or("unnamed")
        ),
        format!("   Groups: {}", definition.groups.len()),
        format!("   Fields: {}", definition.fields.len()),
        format!("   Node mappings: {}", definition.node_mappings.len()),
    ];

    for (i, group) in definition.groups.iter().enumerate() {
        let mut notes = vec![format!("{} field(s)", definition.fields_for(&group.id).len())];
        if let Some(array) = group.array_key() {
            notes.push(format!(
                "rows '{}' {}..{}",
                array, group.array_min_rows, group.array_max_rows
            ));
        }
        if let Some(mapping) = definition.mapping_for(&group.id) {
            if mapping.display_with_previous {
                notes.push("shown with previous".to_string());
            }
            if let Some(node) = &mapping.node_id {
                notes.push(format!("node {}", node));
            }
        }
        lines.push(format!(
            "   {}. {} ({}): {}",
            i + 1,
            group.name,
            group.id,
            notes.join(", ")
        ));
    }
    lines
}

/// Problems that do not stop a run but are almost certainly mistakes.
pub fn warnings(definition: &FlowDefinition) -> Vec<String> {
    let mut warnings = Vec::new();

    if let Some(first) = definition.first_group() {
        if definition
            .mapping_for(&first.id)
            .is_some_and(|m| m.display_with_previous)
        {
            warnings.push(format!(
                "group '{}' is first, so displayWithPrevious has no effect",
                first.id
            ));
        }
    }

    for field in &definition.fields {
        let is_choice = matches!(
            field.field_type,
            FieldType::Dropdown | FieldType::Province | FieldType::State
        );
        if field.field_type == FieldType::Dropdown && field.options.is_empty() {
            warnings.push(format!("dropdown '{}' has no options", field.key));
        }
        if !is_choice && !field.options.is_empty() {
            warnings.push(format!(
                "field '{}' is {} but lists options",
                field.key, field.field_type
            ));
        }
        if let (Some(max), Some(default)) = (field.max_length, field.default_value.as_deref()) {
            if !has_placeholders(default) && default.chars().count() > max {
                warnings.push(format!(
                    "default of '{}' is longer than its maxLength {}",
                    field.key, max
                ));
            }
        }
    }

    for mapping in &definition.node_mappings {
        let Some(group) = definition.group(&mapping.group_id) else {
            continue;
        };
        let fields = definition.fields_for(&group.id);
        for key in mapping.field_mappings.keys() {
            let known = fields.iter().any(|f| &f.key == key) || group.array_key() == Some(key.as_str());
            if !known {
                warnings.push(format!(
                    "mapping for group '{}' targets unknown field '{}'",
                    group.id, key
                ));
            }
        }
    }

    warnings.sort();
    warnings
}
