//! search-portal: run the search backend or the proxying frontend.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use search_portal::config::{BackendConfig, FrontendConfig};
use search_portal::{backend, frontend};

#[derive(Parser)]
#[command(name = "search-portal")]
#[command(about = "Document search over Elasticsearch, with a proxying web frontend")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Wait for Elasticsearch, seed the index if empty, serve search and insert.
    Backend(BackendConfig),

    /// Serve the web page and proxy API calls to the backend.
    Frontend(FrontendConfig),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let rt = tokio::runtime::Runtime::new()?;
    match cli.command {
        Command::Backend(config) => rt.block_on(backend::serve(config)),
        Command::Frontend(config) => rt.block_on(frontend::serve(config)),
    }
}
