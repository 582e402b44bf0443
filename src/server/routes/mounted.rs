//! Dispatch into the route sets module backends registered at mount time.

use crate::mount::MOUNT_ROOT;
use crate::server::router::ModhostState;
use axum::{
    Router,
    extract::{Path, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::any,
};
use tower::ServiceExt;

pub fn router() -> Router<ModhostState> {
    Router::new()
        .route(&format!("{MOUNT_ROOT}/{{slug}}"), any(dispatch_root))
        .route(&format!("{MOUNT_ROOT}/{{slug}}/"), any(dispatch_root))
        .route(&format!("{MOUNT_ROOT}/{{slug}}/{{*rest}}"), any(dispatch_nested))
}

async fn dispatch_root(
    State(state): State<ModhostState>,
    Path(slug): Path<String>,
    req: Request,
) -> Response {
    forward(&state, &slug, req).await
}

async fn dispatch_nested(
    State(state): State<ModhostState>,
    Path((slug, _rest)): Path<(String, String)>,
    req: Request,
) -> Response {
    forward(&state, &slug, req).await
}

/// Hands the untouched request to the slug's router; it matches on the full `/mod/<slug>/..` path.
async fn forward(state: &ModhostState, slug: &str, req: Request) -> Response {
    let Some(router) = state.controller.routes().get(slug) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    match router.oneshot(req).await {
        Ok(resp) => resp,
        Err(never) => match never {},
    }
}
