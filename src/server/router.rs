use crate::lifecycle::LifecycleController;
use crate::server::guards::auth::RequireKeyAuth;
use crate::server::routes::{modules, mounted};
use crate::store::PACKAGES_ROUTE;

use axum::{
    Router,
    extract::Request,
    http::{HeaderName, HeaderValue, StatusCode, Version, header::USER_AGENT},
    middleware::{self, Next},
    response::Response,
};
use base64::Engine as _;
use rand::RngCore;
use std::sync::Arc;
use std::time::Instant;
use tower_http::services::ServeDir;
use tracing::{error, info, warn};

const MAX_REQUEST_ID_LEN: usize = 128;
const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

fn generate_request_id() -> String {
    // 96 bits => 16 chars base64url (no padding).
    let mut bytes = [0u8; 12];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn format_http_version(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2",
        Version::HTTP_3 => "HTTP/3",
        _ => "HTTP/?",
    }
}

#[derive(Clone)]
pub struct ModhostState {
    pub controller: LifecycleController,
    pub admin_key: Arc<str>,
    pub max_upload_bytes: usize,
}

impl ModhostState {
    pub fn new(controller: LifecycleController, admin_key: Arc<str>, max_upload_bytes: usize) -> Self {
        Self {
            controller,
            admin_key,
            max_upload_bytes,
        }
    }
}

async fn not_found_handler() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn access_log(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let version = req.version();

    let request_id = req
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_string)
        .unwrap_or_else(generate_request_id);

    let user_agent = req
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let start = Instant::now();
    let mut resp = next.run(req).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        resp.headers_mut().insert(X_REQUEST_ID, value);
    }

    let status = resp.status().as_u16();
    let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    let path = uri.path();
    let protocol = format_http_version(version);

    if resp.status().is_server_error() {
        error!(status, request_id = %request_id, method = %method, protocol, path, latency_ms, user_agent = %user_agent, "request failed");
    } else if resp.status().is_client_error() {
        warn!(status, request_id = %request_id, method = %method, protocol, path, latency_ms, user_agent = %user_agent, "request rejected");
    } else {
        info!(status, request_id = %request_id, method = %method, protocol, path, latency_ms, user_agent = %user_agent, "request served");
    }

    resp
}

/// Full host router: admin API, static artifacts and mounted module routes.
pub fn modhost_router(state: ModhostState) -> Router {
    let admin = modules::router(state.max_upload_bytes).layer(
        middleware::from_extractor_with_state::<RequireKeyAuth, _>(state.clone()),
    );

    let packages = ServeDir::new(state.controller.packages_dir());

    Router::new()
        .merge(admin)
        .merge(mounted::router())
        .nest_service(PACKAGES_ROUTE, packages)
        .fallback(not_found_handler)
        .with_state(state)
        .layer(middleware::from_fn(access_log))
}
