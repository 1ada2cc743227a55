//! search-portal: a search backend over Elasticsearch and a proxying frontend.

pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
pub mod frontend;
pub mod retry;
pub mod seed;
pub mod startup;

/// Resolves on Ctrl+C; used for graceful shutdown of both services.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
