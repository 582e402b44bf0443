use modhost_manifest::ValidatedManifest;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fields written on every install. `config`, `enabled` and timestamps of an existing row are kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleUpsert {
    pub slug: String,
    pub name: String,
    pub version: String,
    pub module_type: String,
    pub entry_client: Option<String>,
    pub manifest: Value,
}

impl ModuleUpsert {
    pub fn from_validated(validated: &ValidatedManifest, entry_client: Option<String>) -> Self {
        let m = &validated.manifest;
        Self {
            slug: m.slug.clone(),
            name: m.name.clone(),
            version: m.version.clone(),
            module_type: m.module_type.as_str().to_string(),
            entry_client,
            manifest: validated.document.clone(),
        }
    }
}
