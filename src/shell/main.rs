use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use event_correlation::shared::infrastructure::stream::in_memory::InMemoryStream;
use event_correlation::shell::config::AppConfig;
use event_correlation::shell::{compose, http, workers};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = AppConfig::from_env();
    info!(
        broker = %config.broker,
        topic = %config.topic,
        partitions = config.partitions,
        "using in-process stream"
    );

    let stream = InMemoryStream::with_retention(
        config.topic.clone(),
        config.partitions,
        config.stream_retention,
    );
    let state = compose(&config, stream);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let background = workers::spawn(&state, &config, shutdown_rx);

    let app = http::router(state.clone());
    let listener = tokio::net::TcpListener::bind(config.http_addr).await?;
    info!("listening on http://{}", config.http_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown_tx.send_replace(true);
    for worker in background {
        if let Err(error) = worker.await {
            warn!(%error, "worker did not stop cleanly");
        }
    }
    if let Some(stats) = state.observer.shutdown().await {
        info!(records = stats.records, evicted = stats.evicted, "correlation store stopped");
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(%error, "unable to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
