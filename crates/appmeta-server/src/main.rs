use appmeta_logger::AsyncLogger;
use appmeta_server::{Server, ServerConfig};
use appmeta_workpool::DispatchMode;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "appmeta")]
#[command(about = "Application metadata service", long_about = None)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen host
    #[arg(long)]
    host: Option<String>,

    /// Listen port
    #[arg(long)]
    port: Option<u16>,

    /// Number of workers
    #[arg(long)]
    workers: Option<usize>,

    /// Work queue capacity
    #[arg(long)]
    queue_capacity: Option<usize>,

    /// Dispatch mode (racing or ordered)
    #[arg(long)]
    dispatch_mode: Option<DispatchMode>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = ServerConfig::load(args.config.as_deref())?;

    // Override with CLI args
    if let Some(host) = args.host {
        config.http.host = host;
    }
    if let Some(port) = args.port {
        config.http.port = port;
    }
    if let Some(workers) = args.workers {
        config.pool.max_workers = workers;
    }
    if let Some(queue_capacity) = args.queue_capacity {
        config.pool.queue_capacity = queue_capacity;
    }
    if let Some(dispatch_mode) = args.dispatch_mode {
        config.pool.dispatch_mode = dispatch_mode;
    }
    config.pool.validate()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    tracing::info!("Starting appmeta with config: {:?}", config);

    let logger = AsyncLogger::stdio(config.logging.logger_config());
    let server = match Server::new(config, logger.clone()) {
        Ok(server) => server,
        Err(e) => {
            logger.stop().await;
            return Err(e.into());
        }
    };

    let result = server.run(shutdown_signal()).await;
    match &result {
        Ok(report) if report.is_clean() => tracing::info!("Shutdown complete"),
        Ok(report) => tracing::warn!("Shutdown incomplete: {:?}", report),
        Err(e) => tracing::error!("Server error: {}", e),
    }

    // The logger goes last so the drain above is fully recorded.
    logger.stop().await;
    result?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
