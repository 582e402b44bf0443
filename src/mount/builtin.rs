//! Backends linked into the `modhost` binary.

use super::backend::{BoxError, ModuleBackend, MountContext};
use super::loader::BackendCatalog;
use super::registrar::RouteRegistrar;
use async_trait::async_trait;
use axum::{Json, response::IntoResponse, routing::get};
use serde_json::json;
use std::sync::Arc;

/// Export name of [`PingBackend`] in entry descriptors.
pub const PING_EXPORT: &str = "modhost/ping";

/// Health probe for a module: `GET <prefix>/ping` and `GET <prefix>/config`.
pub struct PingBackend;

#[async_trait]
impl ModuleBackend for PingBackend {
    async fn mount(&self, routes: &mut RouteRegistrar, ctx: &MountContext) -> Result<(), BoxError> {
        let slug = ctx.slug.clone();
        let db = ctx.db.clone();
        routes.route(
            "/ping",
            get(move || {
                let slug = slug.clone();
                let db = db.clone();
                async move {
                    let db_ok = sqlx::query_scalar::<_, i64>("SELECT 1")
                        .fetch_one(&db)
                        .await
                        .is_ok();
                    Json(json!({ "pong": true, "module": slug, "db": db_ok }))
                }
            }),
        );

        let slug = ctx.slug.clone();
        let host = ctx.host.clone();
        routes.route(
            "/config",
            get(move || {
                let slug = slug.clone();
                let host = host.clone();
                async move {
                    match host.module_config(&slug).await {
                        Ok(config) => Json(json!({ "config": config })).into_response(),
                        Err(e) => e.into_response(),
                    }
                }
            }),
        );
        Ok(())
    }
}

/// Catalog with every built-in backend registered.
pub fn builtin_catalog() -> BackendCatalog {
    BackendCatalog::new().with_backend(PING_EXPORT, Arc::new(PingBackend))
}
