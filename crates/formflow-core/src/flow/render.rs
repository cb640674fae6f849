//! Render contract — what a host needs to draw the current step.
//!
//! Field widgets are chosen by an exhaustive match over [`FieldType`], so a
//! new field kind cannot be added without deciding how it renders.

use serde::Serialize;
use serde_json::Value;

use super::driver::ExecutionDriver;
use super::template;
use crate::models::{DropdownDisplayMode, Field, FieldOption, FieldType, FlowDefinition, Group};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    Text,
    Email,
    Tel,
    PostalCode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WidgetKind {
    TextInput { mode: InputMode },
    NumberInput,
    DatePicker,
    DateTimePicker,
    TimePicker,
    Choice { display: DropdownDisplayMode },
    Toggle,
}

impl WidgetKind {
    pub fn for_field(field: &Field) -> Self {
        match field.field_type {
            FieldType::Text => WidgetKind::TextInput { mode: InputMode::Text },
            FieldType::Email => WidgetKind::TextInput { mode: InputMode::Email },
            FieldType::Phone => WidgetKind::TextInput { mode: InputMode::Tel },
            FieldType::Zip | FieldType::PostalCode => WidgetKind::TextInput { mode: InputMode::PostalCode },
            FieldType::Number => WidgetKind::NumberInput,
            FieldType::Date => WidgetKind::DatePicker,
            FieldType::DateTime => WidgetKind::DateTimePicker,
            FieldType::Time => WidgetKind::TimePicker,
            FieldType::Dropdown => WidgetKind::Choice {
                display: field.dropdown_display_mode,
            },
            FieldType::Province | FieldType::State => WidgetKind::Choice {
                display: DropdownDisplayMode::Select,
            },
            FieldType::Checkbox => WidgetKind::Toggle,
        }
    }
}

/// Everything a widget consumes: the field contract plus value and error.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldView {
    pub id: String,
    pub key: String,
    /// Key the value and error live under (`items[0].qty` for array rows)
    pub error_key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub widget: WidgetKind,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    pub options: Vec<FieldOption>,
    pub dropdown_display_mode: DropdownDisplayMode,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum GroupBody {
    Fields {
        fields: Vec<FieldView>,
    },
    Rows {
        array_field_name: String,
        rows: Vec<Vec<FieldView>>,
        can_add: bool,
        can_remove: bool,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupView {
    pub group_id: String,
    /// Resolved header template, or the group name
    pub header: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub body: GroupBody,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepView {
    pub step_index: usize,
    /// Steps discovered so far; later branches are unknown until reached
    pub discovered_steps: usize,
    pub groups: Vec<GroupView>,
    pub can_back: bool,
    pub can_forward: bool,
    pub is_busy: bool,
}

/// Header for a group: its mapping's template resolved against the
/// context, falling back to the group name.
pub fn group_header(def: &FlowDefinition, group: &Group, ctx: Option<&Value>) -> String {
    def.mapping_for(&group.id)
        .and_then(|m| m.header_template.as_deref())
        .filter(|t| !t.trim().is_empty())
        .map(|t| template::resolve(t, ctx))
        .unwrap_or_else(|| group.name.clone())
}

fn field_view(field: &Field, error_key: String, value: &str, error: Option<&String>) -> FieldView {
    FieldView {
        id: field.id.clone(),
        key: field.key.clone(),
        error_key,
        label: field.name.clone(),
        field_type: field.field_type,
        widget: WidgetKind::for_field(field),
        required: field.required,
        placeholder: field.placeholder.clone(),
        help_text: field.help_text.clone(),
        max_length: field.max_length,
        options: field.options.clone(),
        dropdown_display_mode: field.dropdown_display_mode,
        value: value.to_string(),
        error: error.cloned(),
    }
}

/// Build the view of the step currently on screen, if any.
pub fn render_step(driver: &ExecutionDriver) -> Option<StepView> {
    let step_index = driver.current_step_index()?;
    let def = driver.definition();
    let form = driver.form();
    let errors = driver.errors();
    let ctx = driver.context_data();

    let groups = driver
        .current_groups()
        .into_iter()
        .map(|group| {
            let fields = def.fields_for(&group.id);
            let body = match group.array_key() {
                Some(array) => GroupBody::Rows {
                    array_field_name: array.to_string(),
                    rows: form
                        .rows(array)
                        .iter()
                        .enumerate()
                        .map(|(i, row)| {
                            fields
                                .iter()
                                .map(|f| {
                                    let key = format!("{}[{}].{}", array, i, f.key);
                                    let value = row.get(&f.key).map(String::as_str).unwrap_or("");
                                    let error = errors.get(&key);
                                    field_view(f, key, value, error)
                                })
                                .collect()
                        })
                        .collect(),
                    can_add: form.can_add_row(group),
                    can_remove: form.can_remove_row(group),
                },
                None => GroupBody::Fields {
                    fields: fields
                        .iter()
                        .map(|f| {
                            let value = form.value(&f.key).unwrap_or("");
                            field_view(f, f.key.clone(), value, errors.get(&f.key))
                        })
                        .collect(),
                },
            };
            GroupView {
                group_id: group.id.clone(),
                header: group_header(def, group, ctx.as_ref()),
                description: group.description.clone(),
                body,
            }
        })
        .collect();

    Some(StepView {
        step_index,
        discovered_steps: driver.step_path().len(),
        groups,
        can_back: driver.can_back(),
        can_forward: driver.can_forward(),
        is_busy: driver.is_busy(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Group, NodeMapping};
    use serde_json::json;

    #[test]
    fn test_widget_for_each_type() {
        let mut f = Field::new("1", "g", "k", FieldType::Dropdown);
        f.dropdown_display_mode = DropdownDisplayMode::Radio;
        assert_eq!(
            WidgetKind::for_field(&f),
            WidgetKind::Choice { display: DropdownDisplayMode::Radio }
        );
        f.field_type = FieldType::Phone;
        assert_eq!(WidgetKind::for_field(&f), WidgetKind::TextInput { mode: InputMode::Tel });
        f.field_type = FieldType::Checkbox;
        assert_eq!(WidgetKind::for_field(&f), WidgetKind::Toggle);
    }

    #[test]
    fn test_group_header_resolution() {
        let def = FlowDefinition::new(
            vec![Group::new("a", "Applicant", 1), Group::new("b", "Billing", 2)],
            vec![],
            vec![NodeMapping::new("a").with_header("Welcome back, {{user.first}}")],
        );
        let ctx = json!({"user": {"first": "Ada"}});
        let a = def.group("a").unwrap();
        let b = def.group("b").unwrap();
        assert_eq!(group_header(&def, a, Some(&ctx)), "Welcome back, Ada");
        assert_eq!(group_header(&def, a, None), "Welcome back, {{user.first}}");
        assert_eq!(group_header(&def, b, Some(&ctx)), "Billing");
    }

    #[test]
    fn test_render_step_with_rows_and_errors() {
        let def = FlowDefinition::new(
            vec![
                Group::new("a", "A", 1),
                Group::new("r", "Rows", 2).into_array("items", 1, 2),
            ],
            vec![
                Field::new("1", "a", "email", FieldType::Email).required(),
                Field::new("2", "r", "qty", FieldType::Number),
            ],
            vec![NodeMapping::new("r").display_with_previous()],
        );
        let mut driver = ExecutionDriver::new(def, "btn", "user").unwrap();
        assert!(driver.validate_current().is_err());

        let view = render_step(&driver).unwrap();
        assert_eq!(view.step_index, 0);
        assert_eq!(view.groups.len(), 2);
        match &view.groups[0].body {
            GroupBody::Fields { fields } => {
                assert_eq!(fields[0].error.as_deref(), Some("email is required"));
                assert_eq!(fields[0].widget, WidgetKind::TextInput { mode: InputMode::Email });
            }
            other => panic!("unexpected {:?}", other),
        }
        match &view.groups[1].body {
            GroupBody::Rows { rows, can_add, can_remove, .. } => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0][0].error_key, "items[0].qty");
                assert!(*can_add);
                assert!(!*can_remove);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
