//! SQL DDL for initializing the registry database.

/// SQLite schema:
/// - `modules` table (one row per slug; the registry)
pub const SQLITE_INIT: &str = r#"
-- ---------------------------------------------------------------------------
-- Module registry (one row per slug)
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS modules (
    id INTEGER PRIMARY KEY AUTOINCREMENT, -- never reused: uninstall is terminal
    slug TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    version TEXT NOT NULL,
    module_type TEXT NOT NULL, -- ui | backend | full
    entry_client TEXT NULL,
    manifest TEXT NOT NULL, -- JSON, verbatim upload
    config TEXT NOT NULL DEFAULT '{}', -- JSON, admin-owned
    enabled INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL, -- RFC3339
    updated_at TEXT NOT NULL -- RFC3339
);

CREATE INDEX IF NOT EXISTS idx_modules_enabled ON modules(enabled);
"#;
