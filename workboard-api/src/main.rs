//! # Workboard API Server
//!
//! Multi-tenant project and task management over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgres://... JWT_SECRET=... cargo run -p workboard-api
//! ```
//!
//! Set `LOG_FORMAT=json` for JSON log lines.

use std::net::SocketAddr;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use workboard_api::{
    app::{build_router, AppState},
    config::Config,
};
use workboard_shared::audit::AuditRecorder;
use workboard_shared::db::migrations::run_migrations;
use workboard_shared::db::pool::{close_pool, create_pool, PoolConfig};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "workboard_api=debug,workboard_shared=debug,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // before tracing, so .env can carry RUST_LOG
    dotenvy::dotenv().ok();
    init_tracing();

    tracing::info!("Workboard API Server v{} starting", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env().context("Failed to load configuration")?;

    let pool = create_pool(PoolConfig {
        max_connections: config.database.max_connections,
        ..PoolConfig::new(config.database.url.clone())
    })
    .await
    .context("Failed to connect to database")?;

    run_migrations(&pool).await.context("Failed to run migrations")?;

    let (audit, audit_writer) = AuditRecorder::spawn(pool.clone(), config.audit.channel_capacity);

    let bind_address = config.bind_address();
    let app = build_router(AppState::new(pool.clone(), config, audit));

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;

    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    // the router (and every recorder clone in it) is gone; the writer drains and exits
    if let Err(e) = audit_writer.await {
        tracing::warn!(error = %e, "Audit writer ended abnormally");
    }

    close_pool(&pool).await;
    tracing::info!("Shutdown complete");

    Ok(())
}
