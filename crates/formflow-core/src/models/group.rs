use serde::{Deserialize, Serialize};

/// One form page of fields. Array groups repeat their fields per row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(deserialize_with = "super::de_id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub is_array_group: bool,
    #[serde(default = "default_min_rows")]
    pub array_min_rows: usize,
    #[serde(default = "default_max_rows")]
    pub array_max_rows: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_field_name: Option<String>,
}

fn default_min_rows() -> usize {
    1
}

fn default_max_rows() -> usize {
    10
}

impl Group {
    pub fn new(id: impl Into<String>, name: impl Into<String>, sort_order: i32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            sort_order,
            is_array_group: false,
            array_min_rows: default_min_rows(),
            array_max_rows: default_max_rows(),
            array_field_name: None,
        }
    }

    /// Turn this group into a repeating-row group stored under `field_name`.
    pub fn into_array(mut self, field_name: impl Into<String>, min_rows: usize, max_rows: usize) -> Self {
        self.is_array_group = true;
        self.array_field_name = Some(field_name.into());
        self.array_min_rows = min_rows;
        self.array_max_rows = max_rows;
        self
    }

    /// The ArrayData key for this group, if it is an array group.
    pub fn array_key(&self) -> Option<&str> {
        if self.is_array_group {
            self.array_field_name.as_deref()
        } else {
            None
        }
    }
}
