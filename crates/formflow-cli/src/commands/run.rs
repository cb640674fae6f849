//! `formflow run` — Drive a flow against a step processor.
//!
//! Interactive by default: every step is rendered with dialoguer prompts
//! and the user picks what to do next. With `--values` the steps are
//! answered from a JSON file instead, which is what scripts and CI use.

use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};
use serde_json::{Map, Value};

use formflow_core::flow::render::{render_step, FieldView, GroupBody, StepView, WidgetKind};
use formflow_core::models::DropdownDisplayMode;
use formflow_core::processor::{ConfirmationPrompt, ExecutionResult, ExitData};
use formflow_core::{
    ExecutionDriver, FlowError, FlowState, HttpStepProcessor, ProcessorConfig, StepProcessor,
    Transition,
};

use super::{load_definition, truncate};

/// Upper bound on submissions in `--values` mode, so a processor that keeps
/// routing back to the same group cannot loop forever.
const MAX_SCRIPTED_SUBMISSIONS: usize = 100;

pub struct RunOptions {
    pub button_id: String,
    pub user_id: String,
    pub values_file: Option<String>,
    pub auto_confirm: bool,
}

pub async fn run(path: &str, config: ProcessorConfig, options: RunOptions) -> Result<(), String> {
    let definition = load_definition(path)?;

    println!(
        "📄 Loaded flow: {} ({})",
        definition.name.as_deref().unwrap_or("unnamed"),
        path
    );
    println!(
        "   {} group(s), processor: {}",
        definition.groups.len(),
        config.endpoint
    );
    println!();

    let processor = HttpStepProcessor::new(config);
    let mut driver = ExecutionDriver::new(definition, options.button_id, options.user_id)
        .map_err(|e| e.to_string())?;

    match options.values_file {
        Some(file) => {
            let values = load_values(&file)?;
            let state = run_scripted(&mut driver, &processor, &values, options.auto_confirm).await?;
            finish(&state)
        }
        None => run_interactive(&mut driver, &processor).await,
    }
}

/// Read a `--values` file: a JSON object of field key to value, with array
/// groups given as a list of row objects under their array field name.
pub fn load_values(path: &str) -> Result<Map<String, Value>, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read values file '{}': {}", path, e))?;
    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(format!("Values file '{}' must contain a JSON object", path)),
        Err(e) => Err(format!("Failed to parse values file '{}': {}", path, e)),
    }
}

/// Answer every step from `values` until the flow reaches a terminal state,
/// and return that state.
pub async fn run_scripted(
    driver: &mut ExecutionDriver,
    processor: &dyn StepProcessor,
    values: &Map<String, Value>,
    auto_confirm: bool,
) -> Result<FlowState, String> {
    let mut submissions = 0;

    loop {
        match driver.state().clone() {
            FlowState::CollectingInput { .. } => {
                if submissions == MAX_SCRIPTED_SUBMISSIONS {
                    return Err(format!(
                        "Gave up after {} submissions without reaching the end of the flow",
                        submissions
                    ));
                }
                submissions += 1;
                apply_values(driver, values)?;
                match driver.execute(processor).await {
                    Ok(transition) => report_transition(&transition),
                    Err(FlowError::Validation(errors)) => {
                        let details: Vec<String> =
                            errors.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
                        return Err(format!("Step rejected by validation: {}", details.join("; ")));
                    }
                    Err(e) => return Err(e.to_string()),
                }
            }
            FlowState::AwaitingConfirmation { prompt, .. } => {
                print_confirmation(&prompt);
                if !auto_confirm {
                    return Err("Processor asked for confirmation; pass --yes to accept".to_string());
                }
                println!("   → {}", prompt.data.yes_button_label);
                driver
                    .answer_confirmation(processor, true)
                    .await
                    .map_err(|e| e.to_string())?;
            }
            FlowState::Submitting { .. } => {
                return Err("A submission is still in flight".to_string());
            }
            terminal @ (FlowState::Exited(_) | FlowState::Completed(_)) => return Ok(terminal),
        }
    }
}

/// Copy the values the current step knows about into the form.
fn apply_values(driver: &mut ExecutionDriver, values: &Map<String, Value>) -> Result<(), String> {
    let view = render_step(driver).ok_or("No step is on screen")?;

    for group in &view.groups {
        match &group.body {
            GroupBody::Fields { fields } => {
                for field in fields {
                    if let Some(value) = values.get(&field.key) {
                        driver
                            .set_value(&field.key, value_text(value))
                            .map_err(|e| e.to_string())?;
                    }
                }
            }
            GroupBody::Rows {
                array_field_name,
                rows,
                ..
            } => {
                let Some(wanted) = values.get(array_field_name).and_then(Value::as_array) else {
                    continue;
                };
                let mut have = rows.len();
                while have < wanted.len() && driver.can_add_row(&group.group_id) {
                    have = driver.add_row(&group.group_id).map_err(|e| e.to_string())? + 1;
                }
                while have > wanted.len() && driver.can_remove_row(&group.group_id) {
                    have -= 1;
                    driver
                        .remove_row(&group.group_id, have)
                        .map_err(|e| e.to_string())?;
                }
                for (index, row) in wanted.iter().take(have).enumerate() {
                    let Some(row) = row.as_object() else {
                        continue;
                    };
                    for (key, value) in row {
                        driver
                            .set_row_value(array_field_name, index, key, value_text(value))
                            .map_err(|e| e.to_string())?;
                    }
                }
            }
        }
    }
    Ok(())
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ── Interactive mode ─────────────────────────────────────────────────────

enum Action {
    Submit,
    Back,
    Forward,
    AddRow(String),
    RemoveRow(String),
    Edit,
    Restart,
    Quit,
}

async fn run_interactive(
    driver: &mut ExecutionDriver,
    processor: &dyn StepProcessor,
) -> Result<(), String> {
    let theme = ColorfulTheme::default();

    loop {
        match driver.state().clone() {
            FlowState::CollectingInput { .. } => {
                let view = render_step(driver).ok_or("No step is on screen")?;
                print_step_header(&view);
                prompt_step(driver, &view, &theme)?;

                match choose_action(driver, &theme)? {
                    Action::Submit => match driver.execute(processor).await {
                        Ok(transition) => report_transition(&transition),
                        Err(FlowError::Validation(errors)) => {
                            println!(
                                "{}",
                                style(format!("Please fix {} field(s) before continuing", errors.len()))
                                    .red()
                            );
                        }
                        Err(e) => return Err(e.to_string()),
                    },
                    Action::Back => {
                        driver.back().map_err(|e| e.to_string())?;
                    }
                    Action::Forward => {
                        driver.forward().map_err(|e| e.to_string())?;
                    }
                    Action::AddRow(group_id) => {
                        driver.add_row(&group_id).map_err(|e| e.to_string())?;
                    }
                    Action::RemoveRow(group_id) => {
                        remove_row(driver, &group_id, &theme)?;
                    }
                    Action::Edit => {}
                    Action::Restart => driver.reset(),
                    Action::Quit => return Ok(()),
                }
            }
            FlowState::AwaitingConfirmation { prompt, .. } => {
                print_confirmation(&prompt);
                let choice = Select::with_theme(&theme)
                    .items(&[&prompt.data.yes_button_label, &prompt.data.no_button_label])
                    .default(0)
                    .interact()
                    .map_err(prompt_error)?;
                let transition = driver
                    .answer_confirmation(processor, choice == 0)
                    .await
                    .map_err(|e| e.to_string())?;
                report_transition(&transition);
            }
            FlowState::Exited(exit) => {
                print_exit(&exit);
                let restart = exit.show_restart_button
                    && Confirm::with_theme(&theme)
                        .with_prompt("Restart the flow?")
                        .default(false)
                        .interact()
                        .map_err(prompt_error)?;
                if !restart {
                    return Ok(());
                }
                driver.reset();
            }
            FlowState::Completed(result) => {
                print_result(&result);
                let again = Confirm::with_theme(&theme)
                    .with_prompt("Run the flow again?")
                    .default(false)
                    .interact()
                    .map_err(prompt_error)?;
                if !again {
                    return if result.success {
                        Ok(())
                    } else {
                        Err(result.error.unwrap_or_else(|| "Flow failed".to_string()))
                    };
                }
                driver.reset();
            }
            FlowState::Submitting { .. } => {
                return Err("A submission is still in flight".to_string());
            }
        }
    }
}

fn print_step_header(view: &StepView) {
    println!();
    println!(
        "{}",
        style(format!(
            "── Step {} of {} discovered ──",
            view.step_index + 1,
            view.discovered_steps
        ))
        .dim()
    );
}

fn prompt_step(driver: &mut ExecutionDriver, view: &StepView, theme: &ColorfulTheme) -> Result<(), String> {
    for group in &view.groups {
        println!("{}", style(&group.header).bold());
        if let Some(description) = &group.description {
            println!("{}", style(description).dim());
        }

        match &group.body {
            GroupBody::Fields { fields } => {
                for field in fields {
                    let value = prompt_field(field, theme)?;
                    driver.set_value(&field.key, value).map_err(|e| e.to_string())?;
                }
            }
            GroupBody::Rows {
                array_field_name,
                rows,
                ..
            } => {
                for (index, row) in rows.iter().enumerate() {
                    println!("  {}", style(format!("Row {}", index + 1)).underlined());
                    for field in row {
                        let value = prompt_field(field, theme)?;
                        driver
                            .set_row_value(array_field_name, index, &field.key, value)
                            .map_err(|e| e.to_string())?;
                    }
                }
            }
        }
    }
    Ok(())
}

fn prompt_field(field: &FieldView, theme: &ColorfulTheme) -> Result<String, String> {
    if let Some(error) = &field.error {
        println!("  {}", style(error).red());
    }
    let label = if field.required {
        format!("{} *", field.label)
    } else {
        field.label.clone()
    };

    match field.widget {
        WidgetKind::Toggle => {
            let checked = Confirm::with_theme(theme)
                .with_prompt(label)
                .default(field.value == "True")
                .interact()
                .map_err(prompt_error)?;
            Ok(if checked { "True" } else { "False" }.to_string())
        }
        WidgetKind::Choice { display } if !field.options.is_empty() => {
            let mut items: Vec<&str> = field.options.iter().map(|o| o.label()).collect();
            let offset = if field.required {
                0
            } else {
                items.insert(0, "(none)");
                1
            };
            let current = field
                .options
                .iter()
                .position(|o| o.value() == field.value)
                .map(|i| i + offset)
                .unwrap_or(0);

            let mut select = Select::with_theme(theme)
                .with_prompt(label)
                .items(&items)
                .default(current);
            if display == DropdownDisplayMode::Select {
                select = select.max_length(7);
            }
            let index = select.interact().map_err(prompt_error)?;
            Ok(index
                .checked_sub(offset)
                .and_then(|i| field.options.get(i))
                .map(|o| o.value().to_string())
                .unwrap_or_default())
        }
        WidgetKind::TextInput { .. }
        | WidgetKind::NumberInput
        | WidgetKind::DatePicker
        | WidgetKind::DateTimePicker
        | WidgetKind::TimePicker
        | WidgetKind::Choice { .. } => {
            let hint = field.placeholder.as_deref().or(match field.widget {
                WidgetKind::DatePicker => Some("YYYY-MM-DD"),
                WidgetKind::DateTimePicker => Some("YYYY-MM-DDTHH:MM"),
                WidgetKind::TimePicker => Some("HH:MM"),
                _ => None,
            });
            let prompt = match hint {
                Some(hint) => format!("{} ({})", label, hint),
                None => label,
            };
            if let Some(help) = &field.help_text {
                println!("  {}", style(help).dim());
            }
            Input::<String>::with_theme(theme)
                .with_prompt(prompt)
                .with_initial_text(field.value.clone())
                .allow_empty(true)
                .interact_text()
                .map_err(prompt_error)
        }
    }
}

fn choose_action(driver: &ExecutionDriver, theme: &ColorfulTheme) -> Result<Action, String> {
    let mut actions = vec![(Action::Submit, "Continue".to_string())];
    if driver.can_back() {
        actions.push((Action::Back, "Back".to_string()));
    }
    if driver.can_forward() {
        actions.push((Action::Forward, "Forward".to_string()));
    }
    for group in driver.current_groups() {
        if group.array_key().is_none() {
            continue;
        }
        if driver.can_add_row(&group.id) {
            actions.push((Action::AddRow(group.id.clone()), format!("Add row to {}", group.name)));
        }
        if driver.can_remove_row(&group.id) {
            actions.push((
                Action::RemoveRow(group.id.clone()),
                format!("Remove row from {}", group.name),
            ));
        }
    }
    actions.push((Action::Edit, "Edit values".to_string()));
    actions.push((Action::Restart, "Restart".to_string()));
    actions.push((Action::Quit, "Quit".to_string()));

    let labels: Vec<&str> = actions.iter().map(|(_, label)| label.as_str()).collect();
    let index = Select::with_theme(theme)
        .with_prompt("Next")
        .items(&labels)
        .default(0)
        .interact()
        .map_err(prompt_error)?;
    actions
        .into_iter()
        .nth(index)
        .map(|(action, _)| action)
        .ok_or_else(|| "No action selected".to_string())
}

fn remove_row(driver: &mut ExecutionDriver, group_id: &str, theme: &ColorfulTheme) -> Result<(), String> {
    let count = driver
        .definition()
        .group(group_id)
        .and_then(|g| g.array_key())
        .map(|array| driver.form().rows(array).len())
        .unwrap_or(0);
    let items: Vec<String> = (1..=count).map(|i| format!("Row {}", i)).collect();
    let index = Select::with_theme(theme)
        .with_prompt("Remove which row?")
        .items(&items)
        .default(count.saturating_sub(1))
        .interact()
        .map_err(prompt_error)?;
    driver.remove_row(group_id, index).map_err(|e| e.to_string())
}

fn prompt_error(e: dialoguer::Error) -> String {
    format!("Prompt failed: {}", e)
}

// ── Reporting ────────────────────────────────────────────────────────────

fn report_transition(transition: &Transition) {
    match transition {
        Transition::Advanced { step_index } => {
            tracing::info!("[Run] Advanced to step {}", step_index + 1);
        }
        Transition::Discarded => {
            tracing::warn!("[Run] Processor reply arrived after a reset and was ignored");
        }
        Transition::ConfirmationRequired | Transition::Exited | Transition::Completed { .. } => {}
    }
}

fn print_confirmation(prompt: &ConfirmationPrompt) {
    println!();
    println!("❓ {}", style(&prompt.data.prompt_message).bold());
    if prompt.data.show_location_map {
        if let (Some(lat), Some(lon)) = (prompt.data.latitude, prompt.data.longitude) {
            println!("   📍 {:.5}, {:.5}", lat, lon);
        }
    }
}

fn print_exit(exit: &ExitData) {
    println!();
    println!("🚪 {}", exit.exit_message);
}

fn print_result(result: &ExecutionResult) {
    println!();
    if result.success {
        println!("🎉 Flow completed successfully!");
    } else {
        println!("❌ Flow failed");
    }
    if let Some(message) = &result.message {
        println!("   {}", message);
    }
    if let Some(error) = &result.error {
        println!("   {}", style(error).red());
    }
    if result.results.is_empty() {
        return;
    }

    println!();
    println!("┌──────────────────────┬────────────┬────────────────────────────────┐");
    println!("│ Step                 │ Status     │ Detail                         │");
    println!("├──────────────────────┼────────────┼────────────────────────────────┤");
    for step in &result.results {
        let detail = step
            .error
            .clone()
            .or_else(|| step.output.as_ref().map(|o| o.to_string()))
            .unwrap_or_default();
        println!(
            "│ {:<20} │ {:<10} │ {:<30} │",
            truncate(step.label(), 20),
            step.status.as_str(),
            truncate(&detail, 30)
        );
    }
    println!("└──────────────────────┴────────────┴────────────────────────────────┘");
}

/// Print a terminal state and map it to the command's exit status.
fn finish(state: &FlowState) -> Result<(), String> {
    match state {
        FlowState::Exited(exit) => {
            print_exit(exit);
            Ok(())
        }
        FlowState::Completed(result) => {
            print_result(result);
            if result.success {
                Ok(())
            } else {
                Err(result.error.clone().unwrap_or_else(|| "Flow failed".to_string()))
            }
        }
        other => Err(format!("Flow stopped while {}", other.name())),
    }
}
