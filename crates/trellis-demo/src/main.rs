//! trellis-demo: in-memory users and org members served over HTTP

mod api;
mod store;

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use trellis_core::{logging, Config, Router};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser, Debug)]
#[command(name = "trellis-demo")]
#[command(about = "Demo REST API built on the trellis dispatcher", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the log filter (RUST_LOG still wins)
    #[arg(long)]
    log: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(log) = cli.log {
        config.log = log;
    }

    logging::init(&config.log)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.workers)
        .enable_all()
        .build()?;
    runtime.block_on(run(config))
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(store::Store::new());
    let router = Arc::new(Router::with_handlers(api::routes(store), &config));
    tracing::info!(
        workers = config.workers,
        max_body_size = %trellis_core::format_size(config.max_body_size),
        body_pool_size = config.body_pool_size,
        "starting trellis-demo"
    );

    let listener = trellis_core::bind(&config)?;
    trellis_core::serve(listener, router, shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
