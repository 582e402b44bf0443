use chrono::{DateTime, Utc};
use modhost_manifest::Manifest;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, types::Json};

/// One registry row. Serialized with the camelCase keys the admin API exposes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DbModule {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub version: String,
    #[serde(rename = "type")]
    pub module_type: String,
    pub entry_client: Option<String>,
    pub manifest: Json<Value>,
    pub config: Json<Value>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbModule {
    /// Typed view of the stored manifest. `None` if the stored document no longer parses.
    pub fn parsed_manifest(&self) -> Option<Manifest> {
        serde_json::from_value(self.manifest.0.clone()).ok()
    }

    /// `manifest.configSchema`, if the module declared one.
    pub fn config_schema(&self) -> Option<&Value> {
        self.manifest.0.get("configSchema").filter(|v| !v.is_null())
    }
}
