//! ecoscan - Sustainability data orchestrator
//!
//! Scores a product from several independent data providers and suggests
//! better-scoring alternatives. Runs one-shot from the command line or as an
//! HTTP service.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ecoscan_common::config::EcoScanConfig;
use ecoscan_orchestrator::adapters::ExternalHelpers;
use ecoscan_orchestrator::api::analyze::AnalyzeRequest;
use ecoscan_orchestrator::{build_router, Analyzer, AppState};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for ecoscan
#[derive(Parser, Debug)]
#[command(name = "ecoscan")]
#[command(about = "Multi-source sustainability scoring and alternatives")]
#[command(version)]
struct Args {
    /// Configuration file (overrides ECOSCAN_CONFIG and the platform default)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze one product and print the report as JSON
    Analyze {
        /// Scanned barcode (8-14 digits)
        #[arg(short, long)]
        barcode: Option<String>,

        /// Product name
        #[arg(short, long)]
        name: Option<String>,

        /// Category hint (e.g. "beverages")
        #[arg(long)]
        category: Option<String>,

        /// Brand hint
        #[arg(long)]
        brand: Option<String>,
    },

    /// Run the HTTP service
    Serve {
        /// Bind host (defaults to [server].host)
        #[arg(long, env = "ECOSCAN_HOST")]
        host: Option<String>,

        /// Bind port (defaults to [server].port)
        #[arg(short, long, env = "ECOSCAN_PORT")]
        port: Option<u16>,
    },

    /// List configured sources
    Sources,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = EcoScanConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Initialize tracing: RUST_LOG wins over [logging].level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let analyzer = Analyzer::from_config(&config, ExternalHelpers::default())
        .context("Failed to build analyzer")?;

    match args.command {
        Command::Analyze {
            barcode,
            name,
            category,
            brand,
        } => {
            let query = AnalyzeRequest {
                barcode,
                name,
                category,
                brand,
            }
            .into_query()
            .map_err(|e| anyhow::anyhow!("{}", e))?;

            let report = analyzer.analyze(&query).await;
            let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
            println!("{}", json);
        }
        Command::Sources => {
            for source in analyzer.registry().iter() {
                let config = &source.config;
                println!(
                    "{:<20} {:<16} priority={:<2} enabled={:<5} timeout={}ms ttl={}h chain=[{}]",
                    config.source_name,
                    config.kind(),
                    config.priority,
                    config.enabled,
                    config.timeout_ms,
                    config.cache_ttl_hours,
                    config.fallback_chain.join(", ")
                );
            }
        }
        Command::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            serve(analyzer, config, &host, port).await?;
        }
    }

    Ok(())
}

async fn serve(analyzer: Analyzer, config: EcoScanConfig, host: &str, port: u16) -> Result<()> {
    info!("Starting ecoscan orchestrator");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        "Sources: {} registered, concurrency cap {}, deadline {}ms",
        analyzer.registry().len(),
        config.orchestrator.concurrency_cap,
        config.orchestrator.query_deadline_ms
    );

    let state = AppState::new(analyzer, config);
    let app = build_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
