//! Hashvault Server - Main entry point

use anyhow::Result;
use hashvault_common::logging::{init_logging, LogConfig};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tracing::info;

use hashvault_server::{
    api,
    config::Config,
    crawl::{CrawlService, HttpHashListSource},
    db::{self, HashRepository, PgHashRepository},
    features::FeatureState,
};

#[tokio::main]
async fn main() -> Result<()> {
    let log_config = LogConfig::builder()
        .log_file_prefix("hashvault-server")
        .filter_directives("hashvault_server=debug,tower_http=debug,sqlx=warn")
        .build()
        .merge_env()?;

    init_logging(&log_config)?;

    info!("Starting Hashvault Server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let db_pool = db::create_pool(&config.database).await?;
    info!("Database connection pool established");

    db::run_migrations(&db_pool).await?;
    info!("Database migrations completed");

    let repo: Arc<dyn HashRepository> = Arc::new(PgHashRepository::new(db_pool));
    let source = Arc::new(HttpHashListSource::new(
        config.crawl.base_url.clone(),
        config.crawl.request_timeout(),
    )?);
    let crawler = CrawlService::new(config.crawl.clone(), Arc::clone(&repo), source);
    info!(
        base_url = %config.crawl.base_url,
        max_files = config.crawl.max_files,
        max_concurrent = config.crawl.max_concurrent,
        max_import_workers = config.crawl.max_import_workers,
        "Crawler ready"
    );

    let state = FeatureState {
        repo,
        crawler: crawler.clone(),
    };
    let app = api::create_router(state, &config.cors);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(crawler.clone(), config.server.shutdown_timeout_secs))
        .await?;

    let timeout = Duration::from_secs(config.server.shutdown_timeout_secs);
    if tokio::time::timeout(timeout, crawler.wait_idle()).await.is_err() {
        tracing::warn!("Crawl run did not stop within {}s", timeout.as_secs());
    }

    info!("Server shut down gracefully");

    Ok(())
}

/// Graceful shutdown signal handler; also cancels an active crawl
async fn shutdown_signal(crawler: CrawlService, timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    crawler.shutdown();
    info!("Waiting up to {} seconds for connections to close", timeout_secs);
}
