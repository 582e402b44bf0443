use axum::{Json, http::StatusCode, response::IntoResponse};
use modhost_manifest::ValidationError;
use serde::Serialize;
use serde_json::{Value, json};
use std::path::PathBuf;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ModhostError {
    #[error("Archive error: {0}")]
    Archive(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Filesystem error ({context}) at {path}: {source}")]
    Filesystem {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Migration failed for module {slug}: {source}")]
    Migration {
        slug: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Failed to load backend of module {slug}: {message}")]
    Load { slug: String, message: String },

    #[error("Backend mount of module {slug} failed: {message}")]
    Mount { slug: String, message: String },

    #[error("Module not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Timed out during {0}")]
    Timeout(&'static str),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Ractor error: {0}")]
    RactorError(String),
}

impl ModhostError {
    pub(crate) fn fs(context: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ModhostError::Filesystem {
            context,
            path: path.into(),
            source,
        }
    }

    /// Machine-readable error code used in HTTP responses.
    pub fn code(&self) -> &'static str {
        match self {
            ModhostError::Archive(_) => "ARCHIVE_ERROR",
            ModhostError::Validation(_) => "VALIDATION_ERROR",
            ModhostError::Filesystem { .. } => "FILESYSTEM_ERROR",
            ModhostError::Migration { .. } => "MIGRATION_ERROR",
            ModhostError::Load { .. } => "LOAD_ERROR",
            ModhostError::Mount { .. } => "MOUNT_ERROR",
            ModhostError::NotFound(_) => "NOT_FOUND",
            ModhostError::BadRequest(_) => "BAD_REQUEST",
            ModhostError::Timeout(_) => "TIMEOUT",
            ModhostError::DatabaseError(_) | ModhostError::RactorError(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ModhostError {
    fn into_response(self) -> axum::response::Response {
        let code = self.code().to_string();
        let (status, error_body) = match self {
            ModhostError::Validation(err) => {
                let body = ApiErrorObject {
                    code,
                    message: err.to_string(),
                    details: Some(json!({ "violations": err.violations })),
                };
                (StatusCode::BAD_REQUEST, body)
            }

            ModhostError::BadRequest(message) => {
                let body = ApiErrorObject {
                    code,
                    message,
                    details: None,
                };
                (StatusCode::BAD_REQUEST, body)
            }

            ModhostError::NotFound(slug) => {
                let body = ApiErrorObject {
                    code,
                    message: format!("Module '{slug}' is not installed."),
                    details: None,
                };
                (StatusCode::NOT_FOUND, body)
            }

            err @ (ModhostError::Archive(_)
            | ModhostError::Filesystem { .. }
            | ModhostError::Migration { .. }
            | ModhostError::Load { .. }
            | ModhostError::Mount { .. }
            | ModhostError::Timeout(_)) => {
                let body = ApiErrorObject {
                    code,
                    message: err.to_string(),
                    details: None,
                };
                (StatusCode::INTERNAL_SERVER_ERROR, body)
            }

            ModhostError::DatabaseError(_) | ModhostError::RactorError(_) => {
                let body = ApiErrorObject {
                    code,
                    message: "An internal server error occurred.".to_string(),
                    details: None,
                };
                (StatusCode::INTERNAL_SERVER_ERROR, body)
            }
        };
        (status, Json(ApiErrorBody { inner: error_body })).into_response()
    }
}

/// Standardized API error response payload.
#[derive(Serialize)]
pub struct ApiErrorObject {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Serialize)]
pub struct ApiErrorBody {
    #[serde(rename = "error")]
    pub inner: ApiErrorObject,
}
