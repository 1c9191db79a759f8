//! Legend rendering for metric label sets.
//!
//! Supports a single, deliberately small template dialect: `{{label}}`
//! placeholders substituted from the label set. No conditionals, no loops,
//! no expression evaluation.

use serde_json::{Map, Value};

/// Reserved label carrying the metric name.
pub const NAME_LABEL: &str = "__name__";

/// Renders a display name for a label set.
///
/// With a non-empty template, `{{label}}` placeholders are substituted from
/// the label set (unresolved placeholders render as empty string).
/// Otherwise falls back to the canonical `name{k="v",...}` form.
#[must_use]
pub fn render_legend(labels: &Map<String, Value>, template: Option<&str>) -> String {
    match template {
        Some(template) if !template.is_empty() => render_template(labels, template),
        _ => canonical_name(labels),
    }
}

/// Canonical `name{k1="v1",k2="v2"}` form. The `__name__` label supplies
/// the name and is excluded from the brace list; remaining labels keep
/// their encountered order.
#[must_use]
pub fn canonical_name(labels: &Map<String, Value>) -> String {
    let name = labels.get(NAME_LABEL).and_then(Value::as_str).unwrap_or("");
    let label_part = labels
        .iter()
        .filter(|(key, _)| key.as_str() != NAME_LABEL)
        .map(|(key, value)| format!("{key}=\"{}\"", value_text(value)))
        .collect::<Vec<_>>()
        .join(",");
    format!("{name}{{{label_part}}}")
}

/// Substitutes `{{ident}}` placeholders against the label set. Identifier
/// whitespace is trimmed; anything without a matching label renders empty.
fn render_template(labels: &Map<String, Value>, template: &str) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        rendered.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];
        match after_open.find("}}") {
            Some(close) => {
                let ident = after_open[..close].trim();
                if let Some(value) = labels.get(ident) {
                    rendered.push_str(&value_text(value));
                }
                rest = &after_open[close + 2..];
            }
            None => {
                // Unterminated placeholder: emit the remainder literally.
                rendered.push_str(&rest[open..]);
                return rendered;
            }
        }
    }

    rendered.push_str(rest);
    rendered
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
