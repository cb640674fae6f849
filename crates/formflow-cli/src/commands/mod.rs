//! CLI command implementations.
//!
//! Each submodule corresponds to a top-level CLI command and drives the
//! formflow-core engine.

pub mod inspect;
pub mod run;
pub mod validate;

use formflow_core::FlowDefinition;

/// Load a flow definition and run the structural checks.
pub fn load_definition(path: &str) -> Result<FlowDefinition, String> {
    let definition = FlowDefinition::from_file(path).map_err(|e| format!("{}: {}", path, e))?;
    definition
        .validate()
        .map_err(|e| format!("{}: {}", path, e))?;
    Ok(definition)
}

/// Pretty-print a JSON value to stdout.
pub fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    );
}

/// Truncate to `max` characters for table cells.
pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }
}
