use mimalloc::MiMalloc;
use modhost::mount::{LinkedBackendLoader, builtin::builtin_catalog};
use modhost::server::router::{ModhostState, modhost_router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = &modhost::config::CONFIG;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_level(true)
                .with_target(false),
        )
        .init();

    let storage = cfg.storage();
    info!(
        database_url = %cfg.basic.database_url,
        loglevel = %cfg.basic.loglevel,
        listen_addr = %cfg.basic.listen_addr,
        listen_port = cfg.basic.listen_port,
        packages_dir = %storage.packages_dir.display(),
        modules_dir = %storage.modules_dir.display(),
        max_upload_bytes = cfg.install.max_upload_bytes,
    );

    let registry = modhost::db::spawn(&cfg.basic.database_url).await?;

    let catalog = builtin_catalog();
    info!(exports = ?catalog.exports(), "linked backends available");
    let loader = Arc::new(LinkedBackendLoader::new(catalog));

    let controller =
        modhost::LifecycleController::new(registry, &storage, &cfg.install, loader);
    let report = controller.remount_all().await;
    for failure in &report.failed {
        warn!(slug = %failure.slug, error = %failure.error, "module left unmounted after boot");
    }

    let admin_key: Arc<str> = Arc::from(cfg.basic.admin_key.as_str());
    let state = ModhostState::new(controller, admin_key, cfg.install.max_upload_bytes);
    let app = modhost_router(state);

    let addr = SocketAddr::from((cfg.basic.listen_addr, cfg.basic.listen_port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server has shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
