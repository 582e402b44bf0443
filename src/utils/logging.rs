use modhost_manifest::Violation;
use serde::Serialize;

/// Pretty-prints `value` for `log_action`, skipping the serialization entirely unless DEBUG is on.
pub(crate) fn with_pretty_json_debug<T, F>(value: &T, log_action: F)
where
    T: Serialize,
    F: FnOnce(&str),
{
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }

    let pretty_json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|error| format!("<pretty serialize failed: {error}>"));
    log_action(pretty_json.as_str());
}

/// One-line rendering for log fields: `/slug: ...; /type: ...`.
pub(crate) fn violations_line(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| {
            let path = if v.path.is_empty() { "/" } else { v.path.as_str() };
            format!("{path}: {}", v.message)
        })
        .collect::<Vec<_>>()
        .join("; ")
}
