use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleType {
    /// Browser bundle only.
    Ui,
    /// Server-side route handlers only.
    Backend,
    /// Both pieces.
    Full,
}

impl ModuleType {
    pub fn as_str(self) -> &'static str {
        match self {
            ModuleType::Ui => "ui",
            ModuleType::Backend => "backend",
            ModuleType::Full => "full",
        }
    }
}

impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server-side part of a package. Both paths are package-relative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migrations: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BackendSpec {
    /// Entry path, if declared and non-blank.
    pub fn entry(&self) -> Option<&str> {
        self.entry.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Migration script path, if declared and non-blank.
    pub fn migrations(&self) -> Option<&str> {
        self.migrations
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub name: String,
    pub slug: String,
    pub version: String,

    #[serde(rename = "type")]
    pub module_type: ModuleType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_client: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_schema: Option<Value>,

    /// Properties outside the known set; the schema is not closed.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Manifest {
    /// Backend entry path when the package ships server code.
    pub fn backend_entry(&self) -> Option<&str> {
        self.backend.as_ref().and_then(BackendSpec::entry)
    }

    pub fn backend_migrations(&self) -> Option<&str> {
        self.backend.as_ref().and_then(BackendSpec::migrations)
    }
}

/// A manifest that passed schema validation, together with the document exactly as uploaded.
#[derive(Debug, Clone)]
pub struct ValidatedManifest {
    pub manifest: Manifest,
    pub document: Value,
}
