//! Todo API entry point.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use todo_metrics_api::api::{create_router, AppState};
use todo_metrics_api::config::Config;
use todo_metrics_api::metrics::{spawn_upkeep, MetricsRegistry, UPKEEP_INTERVAL};
use todo_metrics_api::utils::shutdown_signal;
use todo_metrics_api::ServiceError;

/// Mock todo API with Prometheus request metrics.
#[derive(Parser, Debug)]
#[command(name = "todo-api")]
#[command(about = "Mock todo HTTP API instrumented with request metrics")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    /// HTTP port (overrides PORT).
    #[arg(short, long, global = true)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default).
    Serve,

    /// Print the resolved configuration and check it.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration before logging so RUST_LOG from .env is honoured
    let mut config = Config::load().map_err(ServiceError::from)?;
    if let Some(port) = args.port {
        config.port = port;
    }

    init_logging(&args, &config);

    match args.command {
        Some(Command::CheckConfig) => cmd_check_config(&config),
        Some(Command::Serve) | None => cmd_serve(config).await,
    }
}

fn init_logging(args: &Args, config: &Config) {
    let filter = if args.verbose {
        EnvFilter::new("todo_metrics_api=debug,tower_http=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.rust_log))
    };

    if args.json_logs {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
}

/// Print configuration and validation result.
fn cmd_check_config(config: &Config) -> anyhow::Result<()> {
    println!("======================================================================");
    println!("TODO API - CONFIGURATION CHECK");
    println!("======================================================================");
    println!("  Environment: {}", config.environment);
    println!("  Bind host: {}", config.host);
    println!("  Port: {}", config.port);
    println!("  Body limit: {} bytes", config.body_limit_bytes);
    println!("  Log level: {}", config.rust_log);
    println!("----------------------------------------------------------------------");

    match config.validate() {
        Ok(()) => {
            println!("CONFIGURATION CHECK PASSED");
            Ok(())
        }
        Err(e) => {
            println!("CONFIGURATION CHECK FAILED");
            println!("  Error: {}", e);
            Err(ServiceError::InvalidConfig(e).into())
        }
    }
}

/// Run the HTTP server until a shutdown signal arrives.
async fn cmd_serve(config: Config) -> anyhow::Result<()> {
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(ServiceError::InvalidConfig(e).into());
    }
    let addr = config.listen_addr().map_err(ServiceError::InvalidConfig)?;

    let metrics = Arc::new(MetricsRegistry::for_http().map_err(ServiceError::from)?);
    let upkeep = spawn_upkeep(Arc::clone(&metrics), UPKEEP_INTERVAL);
    let state = AppState::new(config.environment.as_str(), metrics)
        .with_body_limit(config.body_limit_bytes);
    let router = create_router(state);

    let listener = TcpListener::bind(addr).await.map_err(ServiceError::from)?;

    info!("[{}] Todo API running on port {}", config.environment, config.port);
    info!("Health check: http://localhost:{}/health", config.port);
    info!("Metrics: http://localhost:{}/metrics", config.port);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServiceError::from)?;

    upkeep.abort();
    info!("Server stopped");
    Ok(())
}
