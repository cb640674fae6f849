//! `{{path}}` placeholder resolution against the accumulated context data.
//!
//! A placeholder is replaced by walking its dot-separated path through the
//! context. Object keys are matched by name, array elements by numeric
//! index. Anything that cannot be walked is left as the original
//! `{{path}}` text so resolution never fails and is idempotent.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([^{}]+?)\s*\}\}").expect("placeholder pattern"));

/// Replace every `{{path}}` in `template` with the value found in `ctx`.
pub fn resolve(template: &str, ctx: Option<&Value>) -> String {
    if !template.contains("{{") {
        return template.to_string();
    }
    let Some(ctx) = ctx else {
        return template.to_string();
    };

    PLACEHOLDER
        .replace_all(template, |caps: &Captures| match lookup(ctx, &caps[1]) {
            Some(value) => value_to_string(value),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Walk `path` (e.g. `customer.addresses.0.city`) through `ctx`.
pub fn lookup<'a>(ctx: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.trim();
    if path.is_empty() {
        return None;
    }
    path.split('.').try_fold(ctx, |current, segment| {
        let segment = segment.trim();
        match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    })
}

/// True when the text still carries at least one `{{...}}` placeholder.
pub fn has_placeholders(text: &str) -> bool {
    PLACEHOLDER.is_match(text)
}

/// Render a context value the way it is shown inside a form field.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_nested_paths() {
        let ctx = json!({
            "customer": {"name": "Ada", "orders": [{"id": 41}, {"id": 42}]},
            "active": true
        });
        assert_eq!(resolve("Hello {{customer.name}}!", Some(&ctx)), "Hello Ada!");
        assert_eq!(resolve("Order {{ customer.orders.1.id }}", Some(&ctx)), "Order 42");
        assert_eq!(resolve("{{active}}", Some(&ctx)), "true");
    }

    #[test]
    fn test_missing_path_left_unchanged() {
        let ctx = json!({"a": {"b": 1}});
        assert_eq!(resolve("x={{a.c}} y={{a.b}}", Some(&ctx)), "x={{a.c}} y=1");
        assert_eq!(resolve("{{a.b}}", None), "{{a.b}}");
        assert_eq!(resolve("{{a.b.c}}", Some(&ctx)), "{{a.b.c}}");
    }

    #[test]
    fn test_resolve_is_idempotent_on_unresolved() {
        let ctx = json!({"known": "v"});
        let once = resolve("{{unknown.path}} and {{known}}", Some(&ctx));
        let twice = resolve(&once, Some(&ctx));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_object_values_render_as_json() {
        let ctx = json!({"addr": {"city": "Oslo"}});
        assert_eq!(resolve("{{addr}}", Some(&ctx)), r#"{"city":"Oslo"}"#);
    }

    #[test]
    fn test_has_placeholders() {
        assert!(has_placeholders("Dear {{ name }}"));
        assert!(!has_placeholders("plain {text}"));
    }
}
