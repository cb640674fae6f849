use serde::{Deserialize, Serialize};

/// The widget kind a field renders as.
///
/// Definitions carry this as a string; anything unrecognized falls back to
/// [`FieldType::Text`] so an unknown widget still collects a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    #[default]
    Text,
    Number,
    Date,
    DateTime,
    Phone,
    Zip,
    PostalCode,
    Province,
    State,
    Time,
    Dropdown,
    Email,
    Checkbox,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Phone => "phone",
            Self::Zip => "zip",
            Self::PostalCode => "postal_code",
            Self::Province => "province",
            Self::State => "state",
            Self::Time => "time",
            Self::Dropdown => "dropdown",
            Self::Email => "email",
            Self::Checkbox => "checkbox",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "number" => Self::Number,
            "date" => Self::Date,
            "datetime" | "datetime-local" => Self::DateTime,
            "phone" | "tel" => Self::Phone,
            "zip" => Self::Zip,
            "postal_code" => Self::PostalCode,
            "province" => Self::Province,
            "state" => Self::State,
            "time" => Self::Time,
            "dropdown" | "select" => Self::Dropdown,
            "email" => Self::Email,
            "checkbox" => Self::Checkbox,
            _ => Self::Text,
        }
    }

    /// Value seeded when a field has no default.
    pub fn empty_value(&self) -> &'static str {
        match self {
            Self::Checkbox => "False",
            _ => "",
        }
    }
}

impl From<String> for FieldType {
    fn from(s: String) -> Self {
        Self::from_str(&s)
    }
}

impl From<FieldType> for String {
    fn from(t: FieldType) -> Self {
        t.as_str().to_string()
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a dropdown presents its options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DropdownDisplayMode {
    #[default]
    Select,
    Radio,
}

/// A selectable option: either a bare string or a label/value pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldOption {
    Simple(String),
    Labeled { label: String, value: String },
}

impl FieldOption {
    pub fn value(&self) -> &str {
        match self {
            FieldOption::Simple(s) => s,
            FieldOption::Labeled { value, .. } => value,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            FieldOption::Simple(s) => s,
            FieldOption::Labeled { label, .. } => label,
        }
    }
}

/// A single input within a group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    #[serde(deserialize_with = "super::de_id")]
    pub id: String,
    #[serde(deserialize_with = "super::de_id")]
    pub group_id: String,
    /// Display label
    pub name: String,
    /// FormData key, unique within the group
    pub key: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    /// Literal default, may contain `{{path}}` placeholders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    #[serde(default)]
    pub dropdown_display_mode: DropdownDisplayMode,
    #[serde(default)]
    pub sort_order: i32,
}

impl Field {
    pub fn new(
        id: impl Into<String>,
        group_id: impl Into<String>,
        key: impl Into<String>,
        field_type: FieldType,
    ) -> Self {
        let key = key.into();
        Self {
            id: id.into(),
            group_id: group_id.into(),
            name: key.clone(),
            key,
            field_type,
            required: false,
            default_value: None,
            options: Vec::new(),
            max_length: None,
            placeholder: None,
            help_text: None,
            dropdown_display_mode: DropdownDisplayMode::default(),
            sort_order: 0,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(|o| FieldOption::Simple(o.into())).collect();
        self
    }

    pub fn with_max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_roundtrip_and_fallback() {
        assert_eq!(FieldType::from_str("postal_code"), FieldType::PostalCode);
        assert_eq!(FieldType::from_str("Email"), FieldType::Email);
        assert_eq!(FieldType::from_str("signature"), FieldType::Text);
        assert_eq!(String::from(FieldType::DateTime), "datetime");
    }

    #[test]
    fn test_parse_field_with_mixed_options() {
        let json = serde_json::json!({
            "id": 7,
            "groupId": 2,
            "name": "Province",
            "key": "province",
            "type": "dropdown",
            "required": true,
            "options": ["ON", {"label": "Quebec", "value": "QC"}]
        });
        let field: Field = serde_json::from_value(json).unwrap();
        assert_eq!(field.id, "7");
        assert_eq!(field.group_id, "2");
        assert_eq!(field.field_type, FieldType::Dropdown);
        assert_eq!(field.options[0].value(), "ON");
        assert_eq!(field.options[1].label(), "Quebec");
        assert_eq!(field.options[1].value(), "QC");
    }
}
