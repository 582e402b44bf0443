use crate::manifest::{Manifest, ValidatedManifest};
use crate::schema::MANIFEST_VALIDATOR;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error as ThisError;

/// One violated constraint. `path` is a JSON pointer into the manifest (`""` for the root).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Every constraint the manifest broke, in schema evaluation order.
#[derive(Debug, Clone, ThisError)]
#[error("manifest failed validation with {} violation(s)", .violations.len())]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl ValidationError {
    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            violations: vec![Violation::new(path, message)],
        }
    }
}

/// Validates a parsed manifest document against [`crate::MANIFEST_SCHEMA`].
///
/// Collects all violations instead of stopping at the first one.
pub fn validate(document: &Value) -> Result<ValidatedManifest, ValidationError> {
    let mut violations: Vec<Violation> = MANIFEST_VALIDATOR
        .iter_errors(document)
        .map(|err| Violation::new(err.instance_path().to_string(), err.to_string()))
        .collect();

    // The version names an artifact directory and a URL segment, so it must be one plain path
    // segment that needs no percent-encoding.
    if let Some(version) = document.get("version").and_then(Value::as_str) {
        if !is_version_segment(version) {
            violations.push(Violation::new(
                "/version",
                format!("{version:?} must use only ASCII letters, digits, '.', '_', '+' or '-'"),
            ));
        }
    }

    if !violations.is_empty() {
        return Err(ValidationError { violations });
    }

    let manifest: Manifest = serde_json::from_value(document.clone())
        .map_err(|e| ValidationError::single("", e.to_string()))?;

    Ok(ValidatedManifest {
        manifest,
        document: document.clone(),
    })
}

fn is_version_segment(s: &str) -> bool {
    !s.is_empty()
        && s != "."
        && s != ".."
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'+' | b'-'))
}

/// Parses raw `manifest.json` bytes, then validates.
pub fn validate_bytes(raw: &[u8]) -> Result<ValidatedManifest, ValidationError> {
    let document: Value = serde_json::from_slice(raw)
        .map_err(|e| ValidationError::single("", format!("manifest.json is not valid JSON: {e}")))?;
    validate(&document)
}
