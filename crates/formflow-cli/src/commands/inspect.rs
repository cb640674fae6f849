//! `formflow inspect` — Show the step layout and field widgets of a flow.

use formflow_core::flow::render::{render_step, WidgetKind};
use formflow_core::flow::{combined_step, Step};
use formflow_core::models::DropdownDisplayMode;
use formflow_core::{ExecutionDriver, FlowDefinition};

use super::{load_definition, print_json, truncate};

pub fn run(path: &str, json: bool) -> Result<(), String> {
    let definition = load_definition(path)?;

    if json {
        let driver = ExecutionDriver::new(definition, "inspect", "inspect").map_err(|e| e.to_string())?;
        let view = render_step(&driver).ok_or("Flow has no step to render")?;
        let value = serde_json::to_value(&view).map_err(|e| e.to_string())?;
        print_json(&value);
        return Ok(());
    }

    let screens = screens(&definition);
    println!(
        "📄 {} ({} screen(s) if every group is visited in order)",
        definition.name.as_deref().unwrap_or(path),
        screens.len()
    );

    for (i, step) in screens.iter().enumerate() {
        println!();
        println!("Screen {}: {}", i + 1, step.group_ids().join(" + "));
        println!("┌──────────────────────┬──────────────┬──────────────────┬──────────┐");
        println!("│ Key                  │ Type         │ Widget           │ Required │");
        println!("├──────────────────────┼──────────────┼──────────────────┼──────────┤");
        for group_id in step.group_ids() {
            for field in definition.fields_for(group_id) {
                println!(
                    "│ {:<20} │ {:<12} │ {:<16} │ {:<8} │",
                    truncate(&field.key, 20),
                    field.field_type.as_str(),
                    widget_label(WidgetKind::for_field(field)),
                    if field.required { "yes" } else { "" }
                );
            }
        }
        println!("└──────────────────────┴──────────────┴──────────────────┴──────────┘");
    }
    Ok(())
}

/// Screens in definition order, one per group that is not folded into the
/// screen before it.
pub fn screens(definition: &FlowDefinition) -> Vec<Step> {
    let mut screens: Vec<Step> = Vec::new();
    for group in &definition.groups {
        if screens.last().is_some_and(|s| s.contains(&group.id)) {
            continue;
        }
        if let Some(step) = combined_step(definition, &group.id) {
            screens.push(step);
        }
    }
    screens
}

pub fn widget_label(widget: WidgetKind) -> &'static str {
    match widget {
        WidgetKind::TextInput { .. } => "text input",
        WidgetKind::NumberInput => "number input",
        WidgetKind::DatePicker => "date picker",
        WidgetKind::DateTimePicker => "datetime picker",
        WidgetKind::TimePicker => "time picker",
        WidgetKind::Choice {
            display: DropdownDisplayMode::Radio,
        } => "radio group",
        WidgetKind::Choice {
            display: DropdownDisplayMode::Select,
        } => "select",
        WidgetKind::Toggle => "checkbox",
    }
}
