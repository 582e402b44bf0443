//! Admin API over installed modules. Every route here sits behind the admin-key guard.

use crate::server::router::ModhostState;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

mod handlers;

pub fn router(max_upload_bytes: usize) -> Router<ModhostState> {
    Router::new()
        .route("/modules", get(handlers::list_modules))
        .route("/modules/by-slug/{slug}", get(handlers::module_by_slug))
        .route(
            "/modules/install",
            post(handlers::install_module).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/modules/slug/{slug}/enable", post(handlers::enable_module))
        .route("/modules/slug/{slug}/disable", post(handlers::disable_module))
        .route(
            "/modules/slug/{slug}",
            axum::routing::delete(handlers::uninstall_module),
        )
        .route(
            "/modules/slug/{slug}/config",
            get(handlers::get_module_config).put(handlers::put_module_config),
        )
}
