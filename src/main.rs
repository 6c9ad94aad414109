//! Biblio bot host entry point.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use biblio_bot::config::Config;
use biblio_bot::messenger::LogMessenger;

#[tokio::main]
async fn main() {
    let config = Config::parse();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let state = match biblio_bot::build_state(&config, Arc::new(LogMessenger)) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "failed to build host state");
            std::process::exit(1);
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        persistent = config.db_path.is_some(),
        pool_capacity = config.pool_capacity,
        session_ttl = config.session_ttl,
        "Biblio host starting",
    );

    // Periodic metrics snapshot. Session expiry itself runs on per-session
    // timers and needs no sweep here.
    let metrics_state = state.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            tracing::debug!(
                active_sessions = metrics_state.sessions().active_count(),
                pooled_handles = metrics_state.pool().len(),
                searches = metrics_state.metrics().searches_total(),
                downloads = metrics_state.metrics().downloads_total(),
                "maintenance snapshot",
            );
        }
    });

    tracing::info!("Biblio host ready; waiting for a transport adapter or ctrl-c");

    shutdown_signal().await;

    state.shutdown();
    tracing::info!("Biblio host shut down");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install ctrl-c handler");
}
