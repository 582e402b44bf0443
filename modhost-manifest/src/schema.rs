use jsonschema::Validator;
use serde_json::Value;
use std::sync::LazyLock;

/// JSON Schema (draft-07) every uploaded `manifest.json` must satisfy.
///
/// The schema is open: unknown top-level properties are accepted and kept verbatim.
pub const MANIFEST_SCHEMA: &str = r#"{
  "$schema": "http://json-schema.org/draft-07/schema#",
  "type": "object",
  "required": ["name", "slug", "version", "type"],
  "properties": {
    "name": { "type": "string" },
    "slug": { "type": "string", "pattern": "^[a-z0-9-]+$" },
    "version": { "type": "string" },
    "type": { "enum": ["ui", "backend", "full"] },
    "entryClient": { "type": "string" },
    "ui": { "type": "object" },
    "backend": {
      "type": "object",
      "properties": {
        "entry": { "type": "string" },
        "migrations": { "type": "string" }
      }
    },
    "configSchema": { "type": ["object", "boolean"] }
  },
  "additionalProperties": true
}"#;

pub(crate) static MANIFEST_VALIDATOR: LazyLock<Validator> = LazyLock::new(|| {
    let schema: Value =
        serde_json::from_str(MANIFEST_SCHEMA).expect("invalid fixed manifest schema JSON");
    jsonschema::validator_for(&schema).expect("invalid fixed manifest schema")
});
