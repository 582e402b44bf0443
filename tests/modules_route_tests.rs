mod common;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
    routing::get,
};
use common::{IDEMPOTENT_MIGRATION, TestHost, backend_package, multipart_body, multipart_content_type};
use modhost::mount::builtin::{PING_EXPORT, builtin_catalog};
use modhost::mount::{BoxError, ModuleBackend, MountContext, RouteRegistrar};
use modhost::server::router::{ModhostState, modhost_router};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

const KEY: &str = "pwd";

fn app(host: &TestHost) -> Router {
    let state = ModhostState::new(host.controller.clone(), Arc::from(KEY), 4 * 1024 * 1024);
    modhost_router(state)
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.expect("request failed");
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

fn admin(method: &str, uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-api-key", KEY)
}

fn install_request(package: &[u8]) -> Request<Body> {
    admin("POST", "/modules/install")
        .header("content-type", multipart_content_type())
        .body(Body::from(multipart_body("package", "notes.tar.gz", package)))
        .expect("failed to build request")
}

#[tokio::test]
async fn modules_api_drives_the_full_lifecycle() {
    let host = TestHost::new().await;
    let app = app(&host);

    // 1) no key / wrong key -> 401
    let (status, _) = send(
        &app,
        Request::builder().uri("/modules").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, body) = send(
        &app,
        Request::builder()
            .uri("/modules")
            .header("authorization", "Bearer nope")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], json!("UNAUTHORIZED"));

    // 2) install
    let package = backend_package("notes", "1.0.0", PING_EXPORT, IDEMPOTENT_MIGRATION);
    let (status, body) = send(&app, install_request(&package)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["ok"], json!(true));
    assert_eq!(body["module"]["slug"], json!("notes"));
    assert_eq!(body["module"]["type"], json!("full"));
    assert_eq!(
        body["module"]["entryClient"],
        json!("/packages/notes/1.0.0/client.js")
    );
    assert_eq!(body["module"]["enabled"], json!(true));
    let id = body["module"]["id"].clone();

    // 3) list and lookup (query-string key works too)
    let (status, body) = send(
        &app,
        Request::builder()
            .uri(format!("/modules?key={KEY}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["modules"].as_array().map(Vec::len), Some(1));

    let (status, body) = send(
        &app,
        admin("GET", "/modules/by-slug/notes").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id);
    assert_eq!(body["slug"], json!("notes"));
    assert_eq!(body["manifest"]["backend"]["entry"], json!("./server.json"));

    // 4) artifact is served statically without a key
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/packages/notes/1.0.0/client.js")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"export default {};");

    // 5) mounted backend answers under its prefix
    let (status, body) = send(
        &app,
        Request::builder().uri("/mod/notes/ping").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "pong": true, "module": "notes", "db": true }));

    let (status, _) = send(
        &app,
        Request::builder().uri("/mod/notes/missing").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // 6) config round trip, schema comes from the manifest
    let (status, body) = send(
        &app,
        admin("PUT", "/modules/slug/notes/config")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"greeting":"hello"}"#))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true, "config": { "greeting": "hello" } }));

    let (status, body) = send(
        &app,
        admin("GET", "/modules/slug/notes/config").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["config"], json!({ "greeting": "hello" }));
    assert_eq!(body["schema"]["type"], json!("object"));

    let (_, body) = send(
        &app,
        Request::builder().uri("/mod/notes/config").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(body, json!({ "config": { "greeting": "hello" } }));

    // 7) disable flips the flag but leaves routes mounted
    let (status, body) = send(
        &app,
        admin("POST", "/modules/slug/notes/disable").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], json!(true));
    assert_eq!(body["module"]["enabled"], json!(false));
    let (status, _) = send(
        &app,
        Request::builder().uri("/mod/notes/ping").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(
        &app,
        admin("POST", "/modules/slug/notes/enable").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(body["module"]["enabled"], json!(true));

    // 8) uninstall, then everything about the slug is 404
    let (status, body) = send(
        &app,
        admin("DELETE", "/modules/slug/notes").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));

    for (method, uri) in [
        ("GET", "/modules/by-slug/notes"),
        ("DELETE", "/modules/slug/notes"),
        ("POST", "/modules/slug/notes/enable"),
        ("POST", "/modules/slug/notes/disable"),
        ("GET", "/modules/slug/notes/config"),
    ] {
        let (status, body) = send(&app, admin(method, uri).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{method} {uri}");
        assert_eq!(body["error"]["code"], json!("NOT_FOUND"));
    }

    let (status, _) = send(
        &app,
        Request::builder().uri("/mod/notes/ping").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn install_reports_every_manifest_violation() {
    let host = TestHost::new().await;
    let app = app(&host);

    let manifest = json!({ "slug": "Bad Slug", "type": "widget" }).to_string();
    let package = common::tarball(&[("manifest.json", manifest.as_bytes())]);
    let (status, body) = send(&app, install_request(&package)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("VALIDATION_ERROR"));
    let violations = body["error"]["details"]["violations"]
        .as_array()
        .expect("violations array");
    let rendered = serde_json::to_string(violations).unwrap();
    assert!(rendered.contains("name"), "{rendered}");
    assert!(rendered.contains("version"), "{rendered}");
    let paths: Vec<&str> = violations
        .iter()
        .filter_map(|v| v["path"].as_str())
        .collect();
    assert!(paths.contains(&"/slug"), "{paths:?}");
    assert!(paths.contains(&"/type"), "{paths:?}");

    let (_, body) = send(&app, admin("GET", "/modules").body(Body::empty()).unwrap()).await;
    assert_eq!(body, json!({ "modules": [] }));
}

#[tokio::test]
async fn install_rejects_uploads_without_a_package_file() {
    let host = TestHost::new().await;
    let app = app(&host);

    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n--{b}--\r\n",
        b = common::BOUNDARY
    );
    let (status, resp) = send(
        &app,
        admin("POST", "/modules/install")
            .header("content-type", multipart_content_type())
            .body(Body::from(body))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["error"]["code"], json!("BAD_REQUEST"));

    let (status, resp) = send(
        &app,
        install_request(b"garbage bytes, not gzip"),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp["error"]["code"], json!("ARCHIVE_ERROR"));
}

#[tokio::test]
async fn unknown_paths_are_404_and_request_ids_are_echoed() {
    let host = TestHost::new().await;
    let app = app(&host);

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/nowhere")
                .header("x-request-id", "trace-me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        resp.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("trace-me")
    );

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/mod/ghost/anything")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(resp.headers().contains_key("x-request-id"));
}

struct Landing;

#[async_trait]
impl ModuleBackend for Landing {
    async fn mount(&self, routes: &mut RouteRegistrar, _: &MountContext) -> Result<(), BoxError> {
        routes.route("/", get(|| async { "landing" }));
        Ok(())
    }
}

#[tokio::test]
async fn module_root_route_answers_with_trailing_slash() {
    let host = TestHost::with_catalog(builtin_catalog().with_backend("custom/landing", Arc::new(Landing))).await;
    host.controller
        .install(backend_package("home", "1.0.0", "custom/landing", IDEMPOTENT_MIGRATION))
        .await
        .unwrap();
    let app = app(&host);

    for uri in ["/mod/home", "/mod/home/"] {
        let (status, body) = send(&app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body, json!("landing"), "{uri}");
    }
}
