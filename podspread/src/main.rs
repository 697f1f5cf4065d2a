//! podspread
//!
//! Kubernetes rebalancer that spreads workload replicas across nodes.
//! Periodically finds replicas of the same workload sharing a node and
//! deletes one of them when another eligible node hosts no replica, so the
//! owning controller recreates it elsewhere.

mod cli;
mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::Cli;
use config::Config;
use podspread_core::metrics::MetricsRegistry;
use podspread_core::{
    OrchestratorConfig, PendingActionRegistry, ReadinessOutcome, ReschedulingOrchestrator,
};
use podspread_k8s::{EvictionMode, K8sClient, KubeCluster};

/// Initialize the tracing/logging subsystem
fn init_logging(log_level: &str, json_format: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}

/// Convert config eviction mode to k8s eviction mode
fn to_k8s_eviction_mode(mode: config::EvictionMode) -> EvictionMode {
    match mode {
        config::EvictionMode::Delete => EvictionMode::Delete,
        config::EvictionMode::Evict => EvictionMode::Evict,
    }
}

fn to_orchestrator_config(config: &Config) -> OrchestratorConfig {
    OrchestratorConfig {
        interval: config.interval,
        min_replicas: config.min_replicas,
        pod_ready_timeout: config.pod_ready_timeout,
        ready_poll_interval: config.ready_poll_interval,
        dry_run: config.dry_run,
    }
}

/// Build the cluster adapter, preferring an explicit kubeconfig
async fn connect(config: &Config) -> Result<KubeCluster> {
    let client = match &config.kubeconfig {
        Some(path) => K8sClient::with_kubeconfig(path).await?,
        None => K8sClient::new().await?,
    };

    client
        .health_check()
        .await
        .context("Kubernetes API server is not reachable")?;

    Ok(KubeCluster::new(
        client,
        config.namespace.clone(),
        to_k8s_eviction_mode(config.eviction_mode),
    ))
}

/// Run the housekeeping loop, or a single tick with `once`
async fn run(config: Config, shutdown_rx: watch::Receiver<bool>, once: bool) -> Result<()> {
    let cluster = Arc::new(connect(&config).await?);
    let registry = Arc::new(PendingActionRegistry::new());
    let metrics = Arc::new(MetricsRegistry::new());

    let orchestrator = ReschedulingOrchestrator::new(
        cluster,
        registry,
        metrics,
        to_orchestrator_config(&config),
        shutdown_rx,
    );

    if once {
        info!("Running single housekeeping tick (--once mode)");
        let report = orchestrator
            .run_tick()
            .await
            .context("Housekeeping tick failed")?;

        let evictions = report.evictions().count();
        let outcomes = report.wait_all().await;
        let ready = outcomes
            .iter()
            .filter(|o| matches!(o, ReadinessOutcome::Ready { .. }))
            .count();
        info!(
            evictions = evictions,
            ready = ready,
            unresolved = outcomes.len() - ready,
            "Single tick complete"
        );
        return Ok(());
    }

    // Start metrics server if enabled
    if config.metrics.enabled {
        let port = config.metrics.port;
        let path = config.metrics.path.clone();
        tokio::spawn(async move {
            if let Err(e) = start_metrics_server(port, path).await {
                error!(error = %e, "Metrics server failed");
            }
        });
    }

    orchestrator.run().await;

    info!("podspread shutdown complete");
    Ok(())
}

/// Start the Prometheus metrics HTTP server
async fn start_metrics_server(port: u16, path: String) -> Result<()> {
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(port = port, path = %path, "Metrics server listening");

    let path = Arc::new(path);
    loop {
        let (mut socket, _) = listener.accept().await?;
        let path = path.clone();

        tokio::spawn(async move {
            let mut buf = [0; 1024];
            let n = socket.read(&mut buf).await.unwrap_or(0);
            let request = String::from_utf8_lossy(&buf[..n]);

            let response = if request_targets(&request, &path) {
                let metrics_output = prometheus::TextEncoder::new()
                    .encode_to_string(&prometheus::gather())
                    .unwrap_or_default();
                format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\n\r\n{}",
                    metrics_output.len(),
                    metrics_output
                )
            } else {
                "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n".to_string()
            };

            let _ = socket.write_all(response.as_bytes()).await;
        });
    }
}

/// Whether an HTTP request line asks for `path`
fn request_targets(request: &str, path: &str) -> bool {
    let mut parts = request.lines().next().unwrap_or_default().split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("GET"), Some(target)) => target.split('?').next() == Some(path),
        _ => false,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(&cli.log_level, cli.log_json);

    info!(version = env!("CARGO_PKG_VERSION"), "podspread starting");

    // Load configuration
    let mut config = if cli.config.exists() {
        Config::from_file(&cli.config)
            .with_context(|| format!("Failed to load config from {:?}", cli.config))?
    } else {
        warn!(path = ?cli.config, "Config file not found, using defaults");
        Config::default()
    };

    // Apply CLI overrides
    if cli.dry_run {
        config.dry_run = true;
    }
    if let Some(namespace) = cli.namespace {
        config.namespace = namespace;
    }
    if cli.kubeconfig.is_some() {
        config.kubeconfig = cli.kubeconfig;
    }
    if let Some(min_replicas) = cli.min_replicas {
        config.min_replicas = min_replicas;
    }
    if let Some(interval) = cli.interval {
        config.interval = interval;
    }
    if let Some(timeout) = cli.pod_ready_timeout {
        config.pod_ready_timeout = timeout;
    }

    // Validate configuration
    config.validate().context("Invalid configuration")?;

    info!(
        namespace = %config.namespace,
        min_replicas = config.min_replicas,
        dry_run = config.dry_run,
        "Configuration loaded"
    );

    // Setup shutdown signal handler
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received Ctrl+C, initiating shutdown");
            }
            _ = terminate => {
                info!("Received SIGTERM, initiating shutdown");
            }
        }

        let _ = shutdown_tx.send(true);
    });

    run(config, shutdown_rx, cli.once).await
}
