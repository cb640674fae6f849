//! Field validation for the groups visible in the current step.
//!
//! Errors are keyed by field key, or `arrayFieldName[rowIndex].fieldKey` for
//! array rows, so every row validates on its own.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use super::form_state::FormState;
use super::step_path::Step;
use crate::models::{Field, FieldType, FlowDefinition};

/// Error key -> message.
pub type ValidationErrors = BTreeMap<String, String>;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"));
static DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-(0[1-9]|1[0-2])-(0[1-9]|[12]\d|3[01])$").expect("date pattern"));
static DATETIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-(0[1-9]|1[0-2])-(0[1-9]|[12]\d|3[01])[T ]([01]\d|2[0-3]):[0-5]\d(:[0-5]\d)?$")
        .expect("datetime pattern")
});
static TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d(:[0-5]\d)?$").expect("time pattern"));
static ZIP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{5}(-\d{4})?$").expect("zip pattern"));
static POSTAL_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ABCEGHJ-NPRSTVXY]\d[ABCEGHJ-NPRSTV-Z] ?\d[ABCEGHJ-NPRSTV-Z]\d$").expect("postal code pattern")
});

/// Validate every field of every group in `step`.
pub fn validate_step(def: &FlowDefinition, step: &Step, form: &FormState) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    for group_id in step.group_ids() {
        let Some(group) = def.group(group_id) else {
            continue;
        };
        let fields = def.fields_for(group_id);

        match group.array_key() {
            Some(array) => {
                for (index, row) in form.rows(array).iter().enumerate() {
                    for field in &fields {
                        let value = row.get(&field.key).map(String::as_str).unwrap_or("");
                        if let Some(message) = validate_field(field, value) {
                            errors.insert(format!("{}[{}].{}", array, index, field.key), message);
                        }
                    }
                }
            }
            None => {
                for field in fields {
                    let value = form.value(&field.key).unwrap_or("");
                    if let Some(message) = validate_field(field, value) {
                        errors.insert(field.key.clone(), message);
                    }
                }
            }
        }
    }

    errors
}

/// The first problem with `value` for `field`, if any. Empty optional
/// fields are never format-checked.
pub fn validate_field(field: &Field, value: &str) -> Option<String> {
    let trimmed = value.trim();

    if field.field_type == FieldType::Checkbox {
        return (field.required && trimmed != "True").then(|| format!("{} must be checked", field.name));
    }

    if trimmed.is_empty() {
        return field.required.then(|| format!("{} is required", field.name));
    }

    if let Some(max) = field.max_length {
        if value.chars().count() > max {
            return Some(format!("{} must be at most {} characters", field.name, max));
        }
    }

    let valid = match field.field_type {
        FieldType::Email => EMAIL.is_match(trimmed),
        FieldType::Number => trimmed.parse::<f64>().is_ok_and(f64::is_finite),
        FieldType::Date => DATE.is_match(trimmed),
        FieldType::DateTime => DATETIME.is_match(trimmed),
        FieldType::Time => TIME.is_match(trimmed),
        FieldType::Zip => ZIP.is_match(trimmed),
        FieldType::PostalCode => POSTAL_CODE.is_match(&trimmed.to_ascii_uppercase()),
        FieldType::Phone => {
            let digits = trimmed.chars().filter(char::is_ascii_digit).count();
            let allowed = trimmed
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')' | '.' | '+'));
            allowed && (10..=15).contains(&digits)
        }
        FieldType::Dropdown | FieldType::Province | FieldType::State => {
            field.options.is_empty() || field.options.iter().any(|o| o.value() == trimmed)
        }
        FieldType::Text | FieldType::Checkbox => true,
    };

    if valid {
        None
    } else {
        Some(format_message(field))
    }
}

fn format_message(field: &Field) -> String {
    let expected = match field.field_type {
        FieldType::Email => "a valid email address",
        FieldType::Number => "a number",
        FieldType::Date => "a date (YYYY-MM-DD)",
        FieldType::DateTime => "a date and time (YYYY-MM-DDTHH:MM)",
        FieldType::Time => "a time (HH:MM)",
        FieldType::Zip => "a ZIP code (12345 or 12345-6789)",
        FieldType::PostalCode => "a postal code (A1A 1A1)",
        FieldType::Phone => "a phone number",
        FieldType::Dropdown | FieldType::Province | FieldType::State => "one of the listed options",
        FieldType::Text | FieldType::Checkbox => "valid",
    };
    format!("{} must be {}", field.name, expected)
}
