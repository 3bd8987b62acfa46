mod config;
mod db;
mod errors;
mod mailer;
mod models;
mod records;
mod routes;
mod state;
mod storage;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::{connect_with_retry, init_schema};
use crate::mailer::SmtpMailer;
use crate::records::PgApplicationStore;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::S3FileStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing database settings)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http={}",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log,
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting intake API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (bounded retry) and the schema
    let pool = connect_with_retry(&config.database).await?;
    init_schema(&pool).await?;

    // Initialize S3 / MinIO
    let files = S3FileStore::from_config(&config.storage).await;

    // Initialize SMTP mailer
    let mailer = SmtpMailer::new(config.mail.clone());

    let state = AppState {
        store: Arc::new(PgApplicationStore::new(pool, config.external_call_timeout)),
        files: Arc::new(files),
        mailer: Arc::new(mailer),
        config: config.clone(),
    };

    let app = build_router(state)?;

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
