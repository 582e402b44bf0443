use crate::error::ModhostError;
use crate::server::router::ModhostState;
use axum::{
    Json,
    extract::{Multipart, Path, State},
};
use serde_json::{Value, json};
use tracing::debug;

pub(super) async fn list_modules(
    State(state): State<ModhostState>,
) -> Result<Json<Value>, ModhostError> {
    let modules = state.controller.list().await?;
    Ok(Json(json!({ "modules": modules })))
}

pub(super) async fn module_by_slug(
    State(state): State<ModhostState>,
    Path(slug): Path<String>,
) -> Result<Json<Value>, ModhostError> {
    let module = state.controller.get(&slug).await?;
    Ok(Json(json!({
        "id": module.id,
        "slug": module.slug,
        "manifest": module.manifest,
    })))
}

pub(super) async fn install_module(
    State(state): State<ModhostState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ModhostError> {
    let archive = read_archive_field(&mut multipart).await?;
    debug!(bytes = archive.len(), "package upload received");
    let module = state.controller.install(archive).await?;
    Ok(Json(json!({ "ok": true, "module": module })))
}

/// First field that carries a filename, or is named `file`.
async fn read_archive_field(multipart: &mut Multipart) -> Result<Vec<u8>, ModhostError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ModhostError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        if field.file_name().is_none() && field.name() != Some("file") {
            continue;
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ModhostError::BadRequest(format!("failed to read upload: {e}")))?;
        return Ok(bytes.to_vec());
    }
    Err(ModhostError::BadRequest(
        "multipart body carries no package file".to_string(),
    ))
}

pub(super) async fn enable_module(
    State(state): State<ModhostState>,
    Path(slug): Path<String>,
) -> Result<Json<Value>, ModhostError> {
    let module = state.controller.set_enabled(&slug, true).await?;
    Ok(Json(json!({ "ok": true, "module": module })))
}

pub(super) async fn disable_module(
    State(state): State<ModhostState>,
    Path(slug): Path<String>,
) -> Result<Json<Value>, ModhostError> {
    let module = state.controller.set_enabled(&slug, false).await?;
    Ok(Json(json!({ "ok": true, "module": module })))
}

pub(super) async fn uninstall_module(
    State(state): State<ModhostState>,
    Path(slug): Path<String>,
) -> Result<Json<Value>, ModhostError> {
    state.controller.uninstall(&slug).await?;
    Ok(Json(json!({ "ok": true })))
}

pub(super) async fn get_module_config(
    State(state): State<ModhostState>,
    Path(slug): Path<String>,
) -> Result<Json<Value>, ModhostError> {
    let (config, schema) = state.controller.get_config(&slug).await?;
    Ok(Json(json!({ "config": config, "schema": schema })))
}

pub(super) async fn put_module_config(
    State(state): State<ModhostState>,
    Path(slug): Path<String>,
    Json(config): Json<Value>,
) -> Result<Json<Value>, ModhostError> {
    let config = state.controller.set_config(&slug, config).await?;
    Ok(Json(json!({ "ok": true, "config": config })))
}
