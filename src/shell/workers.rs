// Background workers started next to the HTTP server.

use crate::modules::events::use_cases::make_noise::worker::make_noise;
use crate::shell::config::AppConfig;
use crate::shell::state::AppState;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

pub fn spawn(
    state: &AppState,
    config: &AppConfig,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    let mut workers = Vec::new();
    match config.noise_interval {
        Some(every) => {
            let publisher = Arc::clone(&state.publisher);
            workers.push(tokio::spawn(async move {
                make_noise(publisher, every, shutdown).await;
            }));
        }
        None => info!("noise maker disabled"),
    }
    workers
}
