//! Prometheus exporter for Akka Cluster HTTP Management.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};

use akka_cluster_exporter::{ClusterCollector, ExporterConfig, HttpServer};

/// Prometheus exporter for Akka Cluster HTTP Management.
#[derive(Parser, Debug)]
#[command(name = "akka-cluster-exporter")]
#[command(about = "Export Akka cluster membership as Prometheus metrics")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    config: Option<String>,

    /// Address to listen on for web interface and telemetry (overrides config).
    #[arg(long, alias = "web.listen-address")]
    listen: Option<String>,

    /// Path under which to expose metrics (overrides config).
    #[arg(long, alias = "web.telemetry-path")]
    path: Option<String>,

    /// URI on which to scrape the Akka HTTP management endpoint (overrides config).
    #[arg(long, alias = "akka.scrape-uri")]
    scrape_uri: Option<String>,

    /// Timeout for one fetch from the endpoint, in milliseconds (overrides config).
    #[arg(long, alias = "akka.timeout-ms", value_name = "MILLISECONDS")]
    timeout_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error; overrides config).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &args.config {
        ExporterConfig::load_from_file(config_path)?
    } else {
        ExporterConfig::default()
    };

    // CLI overrides
    if let Some(listen) = args.listen {
        config.prometheus.listen = listen;
    }
    if let Some(path) = args.path {
        config.prometheus.path = path;
    }
    if let Some(scrape_uri) = args.scrape_uri {
        config.akka.scrape_uri = scrape_uri;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.akka.timeout_ms = timeout_ms;
    }
    if let Some(log_level) = args.log_level {
        config.logging.level = log_level;
    }
    config.validate()?;

    akka_cluster_common::init_tracing(&config.logging)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting akka cluster http management exporter"
    );

    // An unsupported scrape URI is fatal before the listener comes up
    let collector = Arc::new(ClusterCollector::from_config(&config)?);
    info!(
        uri = %collector.uri(),
        timeout_ms = config.akka.timeout_ms,
        "Scraping akka http management endpoint"
    );

    let listen_addr: SocketAddr = config
        .prometheus
        .listen
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid listen address: {}", e))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let http_server = HttpServer::new(
        collector.clone(),
        listen_addr,
        config.prometheus.path.clone(),
    );
    let mut http_task = tokio::spawn(async move {
        if let Err(e) = http_server.run(shutdown_rx).await {
            error!("HTTP server error: {}", e);
        }
    });

    // Wait for shutdown signal, or for the server to exit on its own
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate() => {
            info!("Received SIGTERM, shutting down...");
        }
        _ = &mut http_task => {
            anyhow::bail!("HTTP server exited unexpectedly");
        }
    }

    shutdown_tx.send(true)?;

    let _ = tokio::time::timeout(Duration::from_secs(5), http_task).await;

    let stats = collector.stats();
    info!(
        scrapes = stats.scrapes,
        fetch_failures = stats.fetch_failures,
        parse_failures = stats.parse_failures,
        "Final statistics"
    );

    info!("Exporter stopped");
    Ok(())
}

/// Resolve when SIGTERM is received. Never resolves on non-unix platforms.
async fn terminate() {
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        std::future::pending::<()>().await;
    }
}
