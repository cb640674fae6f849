//! Form state — scalar values and repeating-row values for one flow run.
//!
//! Booleans are stored as the strings `"True"` / `"False"`, the way the step
//! processor expects them. Array rows are keyed by field key and always kept
//! within the owning group's `[arrayMinRows, arrayMaxRows]`.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::template;
use crate::error::FlowError;
use crate::models::{Field, FieldType, FlowDefinition, Group};

/// One repeating row: field key -> value.
pub type Row = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormState {
    values: BTreeMap<String, String>,
    arrays: BTreeMap<String, Vec<Row>>,
}

impl FormState {
    /// Build the initial state for every group in the definition.
    pub fn seed(def: &FlowDefinition, ctx: Option<&Value>) -> Self {
        let mut state = Self::default();
        for group in &def.groups {
            let fields = def.fields_for(&group.id);
            match group.array_key() {
                Some(array) => {
                    let row = default_row(&fields, ctx);
                    state
                        .arrays
                        .insert(array.to_string(), vec![row; group.array_min_rows]);
                }
                None => {
                    for field in fields {
                        state.values.insert(field.key.clone(), seed_value(field, ctx));
                    }
                }
            }
        }
        state
    }

    /// Fill still-empty inputs of `group` from their defaults. Values the
    /// user already entered are left alone. A checkbox counts as empty while
    /// it still holds `"False"` from an unresolved template default.
    pub fn fill_empty(&mut self, def: &FlowDefinition, group: &Group, ctx: Option<&Value>) {
        let fields = def.fields_for(&group.id);
        match group.array_key() {
            Some(array) => {
                let rows = self.arrays.entry(array.to_string()).or_default();
                for row in rows.iter_mut() {
                    for field in &fields {
                        let cell = row.entry(field.key.clone()).or_default();
                        if needs_seed(field, cell) {
                            *cell = seed_value(field, ctx);
                        }
                    }
                }
            }
            None => {
                for field in fields {
                    let slot = self.values.entry(field.key.clone()).or_default();
                    if needs_seed(field, slot) {
                        *slot = seed_value(field, ctx);
                    }
                }
            }
        }
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    pub(crate) fn set_value(&mut self, key: &str, value: String) -> Result<(), FlowError> {
        match self.values.get_mut(key) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(FlowError::UnknownField(key.to_string())),
        }
    }

    pub fn rows(&self, array: &str) -> &[Row] {
        self.arrays.get(array).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn arrays(&self) -> &BTreeMap<String, Vec<Row>> {
        &self.arrays
    }

    pub(crate) fn set_row_value(
        &mut self,
        array: &str,
        row: usize,
        key: &str,
        value: String,
    ) -> Result<(), FlowError> {
        let cell = self
            .arrays
            .get_mut(array)
            .and_then(|rows| rows.get_mut(row))
            .and_then(|r| r.get_mut(key))
            .ok_or_else(|| FlowError::UnknownField(format!("{}[{}].{}", array, row, key)))?;
        *cell = value;
        Ok(())
    }

    pub fn can_add_row(&self, group: &Group) -> bool {
        group
            .array_key()
            .is_some_and(|a| self.rows(a).len() < group.array_max_rows)
    }

    pub fn can_remove_row(&self, group: &Group) -> bool {
        group
            .array_key()
            .is_some_and(|a| self.rows(a).len() > group.array_min_rows)
    }

    /// Append a default-shaped row. Returns the new row's index.
    pub(crate) fn add_row(
        &mut self,
        def: &FlowDefinition,
        group: &Group,
        ctx: Option<&Value>,
    ) -> Result<usize, FlowError> {
        let array = group
            .array_key()
            .ok_or_else(|| FlowError::RowLimit(format!("group '{}' is not an array group", group.id)))?;
        if !self.can_add_row(group) {
            return Err(FlowError::RowLimit(format!(
                "'{}' already has the maximum of {} rows",
                array, group.array_max_rows
            )));
        }
        let row = default_row(&def.fields_for(&group.id), ctx);
        let rows = self.arrays.entry(array.to_string()).or_default();
        rows.push(row);
        Ok(rows.len() - 1)
    }

    pub(crate) fn remove_row(&mut self, group: &Group, index: usize) -> Result<(), FlowError> {
        let array = group
            .array_key()
            .ok_or_else(|| FlowError::RowLimit(format!("group '{}' is not an array group", group.id)))?;
        if !self.can_remove_row(group) {
            return Err(FlowError::RowLimit(format!(
                "'{}' already has the minimum of {} rows",
                array, group.array_min_rows
            )));
        }
        let rows = self.arrays.entry(array.to_string()).or_default();
        if index >= rows.len() {
            return Err(FlowError::UnknownField(format!("{}[{}]", array, index)));
        }
        rows.remove(index);
        Ok(())
    }

    /// Replace a group's rows wholesale, clamped to its row bounds and padded
    /// with default rows. Cells missing from `rows` take their defaults.
    pub(crate) fn replace_rows(
        &mut self,
        def: &FlowDefinition,
        group: &Group,
        rows: Vec<Row>,
        ctx: Option<&Value>,
    ) {
        let Some(array) = group.array_key() else {
            return;
        };
        let fields = def.fields_for(&group.id);
        let template_row = default_row(&fields, ctx);

        let mut next: Vec<Row> = rows
            .into_iter()
            .take(group.array_max_rows)
            .map(|incoming| {
                let mut row = template_row.clone();
                for (key, value) in incoming {
                    if let Some(cell) = row.get_mut(&key) {
                        *cell = value;
                    }
                }
                row
            })
            .collect();
        while next.len() < group.array_min_rows {
            next.push(template_row.clone());
        }
        self.arrays.insert(array.to_string(), next);
    }

    /// `{...FormData, ...ArrayData}` as sent to the step processor.
    pub fn to_execute_parameters(&self) -> Map<String, Value> {
        let mut params: Map<String, Value> = self
            .values
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        for (array, rows) in &self.arrays {
            let rows = rows
                .iter()
                .map(|row| {
                    Value::Object(
                        row.iter()
                            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                            .collect(),
                    )
                })
                .collect();
            params.insert(array.clone(), Value::Array(rows));
        }
        params
    }
}

/// Seed value for one field. Defaults go through the template resolver;
/// one that still holds an unresolved placeholder seeds as empty.
pub fn seed_value(field: &Field, ctx: Option<&Value>) -> String {
    let raw = match field.default_value.as_deref() {
        Some(d) if !d.is_empty() => d,
        _ => return field.field_type.empty_value().to_string(),
    };

    let resolved = template::resolve(raw, ctx);
    if template::has_placeholders(&resolved) {
        return field.field_type.empty_value().to_string();
    }

    match field.field_type {
        FieldType::Checkbox => normalize_checkbox(&resolved).to_string(),
        _ => resolved,
    }
}

/// True when `current` is still the placeholder left by seeding, so the
/// default should be resolved again.
fn needs_seed(field: &Field, current: &str) -> bool {
    if current.is_empty() {
        return true;
    }
    current == field.field_type.empty_value()
        && field
            .default_value
            .as_deref()
            .is_some_and(template::has_placeholders)
}

/// Map loose truthy spellings onto the `"True"`/`"False"` convention.
pub fn normalize_checkbox(value: &str) -> &'static str {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "checked" => "True",
        _ => "False",
    }
}

fn default_row(fields: &[&Field], ctx: Option<&Value>) -> Row {
    fields
        .iter()
        .map(|f| (f.key.clone(), seed_value(f, ctx)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Field, Group};
    use serde_json::json;

    fn definition() -> FlowDefinition {
        FlowDefinition::new(
            vec![
                Group::new("main", "Main", 1),
                Group::new("items", "Items", 2).into_array("lineItems", 1, 3),
            ],
            vec![
                Field::new("1", "main", "name", FieldType::Text).with_default("Guest"),
                Field::new("2", "main", "agree", FieldType::Checkbox),
                Field::new("3", "main", "greeting", FieldType::Text).with_default("Hi {{user.name}}"),
                Field::new("4", "items", "sku", FieldType::Text),
                Field::new("5", "items", "gift", FieldType::Checkbox).with_default("true"),
            ],
            vec![],
        )
    }

    #[test]
    fn test_seed_defaults() {
        let state = FormState::seed(&definition(), None);
        assert_eq!(state.value("name"), Some("Guest"));
        assert_eq!(state.value("agree"), Some("False"));
        // unresolved template default seeds empty
        assert_eq!(state.value("greeting"), Some(""));
        let rows = state.rows("lineItems");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["sku"], "");
        assert_eq!(rows[0]["gift"], "True");
    }

    #[test]
    fn test_seed_resolves_template_defaults_when_possible() {
        let ctx = json!({"user": {"name": "Ada"}});
        let state = FormState::seed(&definition(), Some(&ctx));
        assert_eq!(state.value("greeting"), Some("Hi Ada"));
    }

    #[test]
    fn test_row_bounds() {
        let def = definition();
        let group = def.group("items").unwrap().clone();
        let mut state = FormState::seed(&def, None);

        assert!(!state.can_remove_row(&group));
        assert!(state.remove_row(&group, 0).is_err());

        assert_eq!(state.add_row(&def, &group, None).unwrap(), 1);
        assert_eq!(state.add_row(&def, &group, None).unwrap(), 2);
        assert!(!state.can_add_row(&group));
        assert!(matches!(state.add_row(&def, &group, None), Err(FlowError::RowLimit(_))));

        state.remove_row(&group, 1).unwrap();
        assert_eq!(state.rows("lineItems").len(), 2);
    }

    #[test]
    fn test_fill_empty_keeps_entered_values() {
        let def = definition();
        let mut state = FormState::seed(&def, None);
        state.set_value("name", "Grace".to_string()).unwrap();
        state.set_value("greeting", String::new()).unwrap();

        let ctx = json!({"user": {"name": "Ada"}});
        let main = def.group("main").unwrap().clone();
        state.fill_empty(&def, &main, Some(&ctx));
        assert_eq!(state.value("name"), Some("Grace"));
        assert_eq!(state.value("greeting"), Some("Hi Ada"));
    }

    #[test]
    fn test_fill_empty_resolves_checkbox_template_defaults() {
        let def = FlowDefinition::new(
            vec![
                Group::new("main", "Main", 1),
                Group::new("items", "Items", 2).into_array("lineItems", 1, 2),
            ],
            vec![
                Field::new("1", "main", "vip", FieldType::Checkbox).with_default("{{customer.vip}}"),
                Field::new("2", "main", "terms", FieldType::Checkbox),
                Field::new("3", "items", "gift", FieldType::Checkbox).with_default("{{customer.vip}}"),
            ],
            vec![],
        );
        let mut state = FormState::seed(&def, None);
        assert_eq!(state.value("vip"), Some("False"));
        assert_eq!(state.rows("lineItems")[0]["gift"], "False");

        let ctx = json!({"customer": {"vip": true}});
        for group in def.groups.clone() {
            state.fill_empty(&def, &group, Some(&ctx));
        }
        assert_eq!(state.value("vip"), Some("True"));
        assert_eq!(state.value("terms"), Some("False"));
        assert_eq!(state.rows("lineItems")[0]["gift"], "True");
    }

    #[test]
    fn test_replace_rows_clamps_and_pads() {
        let def = definition();
        let group = def.group("items").unwrap().clone();
        let mut state = FormState::seed(&def, None);

        let incoming: Vec<Row> = (0..5)
            .map(|i| Row::from([("sku".to_string(), format!("S{}", i)), ("bogus".to_string(), "x".to_string())]))
            .collect();
        state.replace_rows(&def, &group, incoming, None);
        let rows = state.rows("lineItems");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2]["sku"], "S2");
        assert!(!rows[0].contains_key("bogus"));

        state.replace_rows(&def, &group, vec![], None);
        assert_eq!(state.rows("lineItems").len(), 1);
    }

    #[test]
    fn test_execute_parameters_shape() {
        let state = FormState::seed(&definition(), None);
        let params = Value::Object(state.to_execute_parameters());
        assert_eq!(params["name"], "Guest");
        assert_eq!(params["lineItems"][0]["gift"], "True");
    }

    #[test]
    fn test_set_unknown_value() {
        let mut state = FormState::seed(&definition(), None);
        assert!(matches!(state.set_value("nope", "x".into()), Err(FlowError::UnknownField(_))));
        assert!(state.set_row_value("lineItems", 4, "sku", "x".into()).is_err());
    }
}
