use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use meshd_interfaces::{
    MeshDriver, RouteInstaller, StaticMetricSource, UdpRoutingTransport, UdpTransportConfig,
};
use meshd_node::adapters::{LoggingDriver, LoggingRouteInstaller};
use meshd_node::config::{NodeConfig, Settings};
use meshd_node::gateway::{GatewayMonitor, GatewayMonitorConfig, TcpProber};
use meshd_node::routing::{Routing, RoutingConfig};
use meshd_node::stats::Stats;
use meshd_node::sync_routes::{SyncRoutes, SyncRoutesConfig};
use meshd_routing::RouteDampener;

#[derive(Parser)]
#[command(name = "meshd", about = "HWMP-style 802.11s mesh routing daemon")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "/etc/meshd/config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match NodeConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to load config from {}: {e}", cli.config.display());
            std::process::exit(1);
        }
    };

    // Initialize logging
    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        meshd_node::logging::init_json_with_default(&config.logging.level);
    } else {
        meshd_node::logging::init_with_default(&config.logging.level);
    }
    let settings = match Settings::from_config(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(settings).await {
        tracing::error!("meshd failed: {e}");
        std::process::exit(1);
    }
}

async fn run(settings: Settings) -> Result<(), meshd_node::NodeError> {
    let stats = Arc::new(Stats::new());
    // Stop signal for the daemon tasks; the kept receiver only ensures
    // sending the signal cannot fail before any task subscribes.
    let (stop_tx, _stop_keepalive) = watch::channel(false);
    let mut tasks: Vec<(&str, JoinHandle<()>)> = Vec::new();

    // Transport.
    let transport = UdpRoutingTransport::bind(&UdpTransportConfig {
        interface: settings.interface.clone(),
        port: settings.port,
    })
    .await?;
    let (inbound_tx, mut inbound_rx) = mpsc::channel(1024);
    let (outbound_tx, outbound_rx) = mpsc::channel(1024);
    transport.start(inbound_tx, outbound_rx).await;

    // Routing actor.
    let metric_source = Arc::new(StaticMetricSource::with_fallback(
        settings.default_link_metric,
    ));
    let (routing, handle) = Routing::new(
        RoutingConfig {
            node_addr: settings.node_addr,
            element_ttl: settings.element_ttl,
            active_path_timeout_ms: settings.active_path_timeout_ms,
            root_pann_interval_ms: settings.root_pann_interval_ms,
            housekeeping_interval_ms: settings.housekeeping_interval_ms,
            is_root: settings.is_root,
            top_k_gates: settings.top_k_gates,
        },
        metric_source,
        outbound_tx,
        Arc::clone(&stats),
    );
    let routing_task = tokio::spawn(routing.run());

    // Bridge inbound datagrams onto the routing loop. Ends when the
    // transport closes the inbound channel, so it needs no stop signal.
    let frame_handle = handle.clone();
    tasks.push((
        "inbound bridge",
        tokio::spawn(async move {
            while let Some((from, data)) = inbound_rx.recv().await {
                if frame_handle.deliver_frame(from, data).await.is_err() {
                    break;
                }
            }
        }),
    ));

    // Route sync.
    let installer: Arc<dyn RouteInstaller> = Arc::new(LoggingRouteInstaller);
    let sync = SyncRoutes::new(
        SyncRoutesConfig {
            interface: settings.interface.clone(),
            interval_ms: settings.sync_routes_interval_ms,
        },
        handle.clone(),
        installer,
        Arc::clone(&stats),
    );
    let sync_stop = stop_tx.subscribe();
    tasks.push((
        "route sync",
        tokio::spawn(async move { sync.run(sync_stop).await }),
    ));

    // Gateway connectivity monitor, when upstream probing is configured.
    if settings.monitored_addresses.is_empty() {
        tracing::info!("no monitored addresses configured, gateway monitor disabled");
    } else {
        let driver: Arc<dyn MeshDriver> = Arc::new(LoggingDriver);
        let dampener = RouteDampener::new(settings.dampener, 0)
            .map_err(|e| meshd_node::NodeError::Config(e.to_string()))?;
        let monitor = GatewayMonitor::new(
            GatewayMonitorConfig {
                monitor_interval_ms: settings.monitor_interval_ms,
                set_root_mode_if_gate: settings.set_root_mode_if_gate,
            },
            TcpProber {
                interface: settings.monitored_interface.clone(),
                addresses: settings.monitored_addresses.clone(),
                timeout: Duration::from_millis(settings.monitor_socket_timeout_ms),
                robustness: settings.robustness,
            },
            handle.clone(),
            driver,
            dampener,
            Arc::clone(&stats),
        );
        let monitor_stop = stop_tx.subscribe();
        tasks.push((
            "gateway monitor",
            tokio::spawn(async move { monitor.run(monitor_stop).await }),
        ));
    }

    tracing::info!(
        node = %settings.node_addr,
        interface = %settings.interface,
        is_root = settings.is_root,
        "meshd started"
    );

    // Wait for SIGINT or SIGTERM (Docker sends SIGTERM on `docker stop`).
    wait_for_shutdown_signal().await;
    tracing::info!("shutting down");

    // Stop timers and monitors first, then the transport (which closes the
    // inbound bridge), then release the routing actor.
    let _ = stop_tx.send(true);
    transport.stop().await;
    for (name, task) in tasks {
        if let Err(e) = task.await {
            if e.is_panic() {
                tracing::warn!(task = name, "task panicked before shutdown");
            }
        }
    }
    drop(handle);
    let _ = routing_task.await;

    let snapshot = stats.snapshot();
    tracing::info!(
        pann_received = snapshot.pann_received,
        pann_originated = snapshot.pann_originated,
        pann_forwarded = snapshot.pann_forwarded,
        "final counters"
    );
    Ok(())
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!("failed to register SIGTERM handler: {e}");
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => tracing::info!("received SIGINT"),
            _ = sigterm.recv() => tracing::info!("received SIGTERM"),
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
