pub mod definition;
pub mod field;
pub mod group;
pub mod node_mapping;

pub use definition::FlowDefinition;
pub use field::{DropdownDisplayMode, Field, FieldOption, FieldType};
pub use group::Group;
pub use node_mapping::{ApplyCondition, FieldMapping, NodeMapping};

use serde::{Deserialize, Deserializer};

/// Flow ids arrive either as strings or as bare numbers depending on the
/// backend that authored the definition; both normalize to `String`.
pub(crate) fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdRepr {
        Str(String),
        Int(i64),
    }

    Ok(match IdRepr::deserialize(deserializer)? {
        IdRepr::Str(s) => s,
        IdRepr::Int(n) => n.to_string(),
    })
}
