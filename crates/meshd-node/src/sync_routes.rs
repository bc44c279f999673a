//! Kernel default-route reconciliation.
//!
//! On its own interval this task asks the routing loop for a gate election
//! (run against the live table, with hysteresis relative to whatever is
//! installed) and reconciles the kernel default route through the
//! [`RouteInstaller`] seam. Installer failures are logged and retried on
//! the next cycle; the remembered state only advances on success.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use meshd_interfaces::RouteInstaller;
use meshd_routing::InstalledGate;

use crate::error::NodeError;
use crate::routing::RoutingHandle;
use crate::stats::Stats;

/// Route sync parameters.
#[derive(Debug, Clone)]
pub struct SyncRoutesConfig {
    /// Mesh interface the default route is installed on.
    pub interface: String,
    pub interval_ms: u64,
}

/// The route sync task.
pub struct SyncRoutes {
    config: SyncRoutesConfig,
    routing: RoutingHandle,
    installer: Arc<dyn RouteInstaller>,
    stats: Arc<Stats>,
    current_gate: Option<InstalledGate>,
}

impl SyncRoutes {
    pub fn new(
        config: SyncRoutesConfig,
        routing: RoutingHandle,
        installer: Arc<dyn RouteInstaller>,
        stats: Arc<Stats>,
    ) -> Self {
        Self {
            config,
            routing,
            installer,
            stats,
            current_gate: None,
        }
    }

    /// The gate currently believed to be installed.
    #[must_use]
    pub fn current_gate(&self) -> Option<InstalledGate> {
        self.current_gate
    }

    /// Run the reconciliation loop until the stop signal.
    pub async fn run(mut self, mut stop_rx: watch::Receiver<bool>) {
        let mut timer = tokio::time::interval(Duration::from_millis(self.config.interval_ms));
        loop {
            tokio::select! {
                _ = timer.tick() => {
                    if let Err(e) = self.sync_once().await {
                        tracing::debug!("route sync stopping: {e}");
                        break;
                    }
                }
                _ = stop_rx.changed() => break,
            }
        }
    }

    /// One reconciliation pass.
    pub async fn sync_once(&mut self) -> Result<(), NodeError> {
        // A gate has its own upstream; it must not default-route into the
        // mesh.
        if self.routing.get_gateway_status().await? {
            if self.current_gate.is_some() {
                self.clear_installed();
            }
            return Ok(());
        }

        match self.routing.select_gate(self.current_gate).await? {
            Some(choice) => {
                let changed = self.current_gate.map(|g| g.addr) != Some(choice.addr);
                if changed {
                    match self
                        .installer
                        .set_default_gate(choice.addr, &self.config.interface)
                    {
                        Ok(()) => {
                            tracing::info!(
                                gate = %choice.addr,
                                metric = choice.metric,
                                "installed default gate"
                            );
                            self.current_gate = Some(InstalledGate {
                                addr: choice.addr,
                                metric: choice.metric,
                            });
                        }
                        Err(e) => {
                            self.stats
                                .route_install_failures
                                .fetch_add(1, Ordering::Relaxed);
                            tracing::warn!(gate = %choice.addr, "default gate install failed: {e}");
                        }
                    }
                } else {
                    // Same gate: refresh the remembered metric so hysteresis
                    // tracks current link conditions.
                    self.current_gate = Some(InstalledGate {
                        addr: choice.addr,
                        metric: choice.metric,
                    });
                }
            }
            None => {
                if self.current_gate.is_some() {
                    self.clear_installed();
                }
            }
        }
        Ok(())
    }

    fn clear_installed(&mut self) {
        match self.installer.clear_default_gate(&self.config.interface) {
            Ok(()) => {
                tracing::info!("cleared default gate");
                self.current_gate = None;
            }
            Err(e) => {
                self.stats
                    .route_install_failures
                    .fetch_add(1, Ordering::Relaxed);
                tracing::warn!("default gate clear failed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshd_core::{MacAddress, PannFrame};
    use meshd_interfaces::testing::{RecordingRouteInstaller, RouteOp};
    use meshd_interfaces::StaticMetricSource;
    use tokio::sync::mpsc;

    use crate::routing::{Routing, RoutingConfig};

    fn mac(last: u8) -> MacAddress {
        MacAddress::new([0x02, 0, 0, 0, 0, last])
    }

    fn gate_pann(orig: u8, sn: u64, metric: u32) -> PannFrame {
        PannFrame {
            orig_addr: mac(orig),
            orig_sn: sn,
            hop_count: 0,
            ttl: 4,
            target_addr: MacAddress::BROADCAST,
            metric,
            is_gate: true,
            reply_requested: false,
        }
    }

    /// Spawn a routing actor with a neighbor metric of 1 and return the
    /// pieces the sync task needs.
    fn spawn_routing() -> (RoutingHandle, Arc<Stats>) {
        let metrics = StaticMetricSource::new();
        metrics.set(mac(0x10), 1);
        let stats = Arc::new(Stats::new());
        let (outbound_tx, _outbound_rx) = mpsc::channel(64);
        let (routing, handle) = Routing::new(
            RoutingConfig {
                node_addr: mac(1),
                element_ttl: 32,
                active_path_timeout_ms: 60_000,
                root_pann_interval_ms: 5_000,
                housekeeping_interval_ms: 1_000,
                is_root: false,
                top_k_gates: 1,
            },
            Arc::new(metrics),
            outbound_tx,
            Arc::clone(&stats),
        );
        tokio::spawn(routing.run());
        (handle, stats)
    }

    fn sync_task(
        handle: RoutingHandle,
        stats: Arc<Stats>,
    ) -> (SyncRoutes, Arc<RecordingRouteInstaller>) {
        let installer = Arc::new(RecordingRouteInstaller::new());
        let sync = SyncRoutes::new(
            SyncRoutesConfig {
                interface: "mesh0".to_string(),
                interval_ms: 1_000,
            },
            handle,
            Arc::clone(&installer) as Arc<dyn RouteInstaller>,
            stats,
        );
        (sync, installer)
    }

    #[tokio::test]
    async fn installs_best_gate_once() {
        let (handle, stats) = spawn_routing();
        handle
            .deliver_frame(mac(0x10), gate_pann(0xaa, 1, 40).encode())
            .await
            .unwrap();

        let (mut sync, installer) = sync_task(handle, stats);
        sync.sync_once().await.unwrap();
        sync.sync_once().await.unwrap();

        assert_eq!(
            installer.ops(),
            vec![RouteOp::SetDefaultGate {
                gate: mac(0xaa),
                interface: "mesh0".to_string(),
            }]
        );
        assert_eq!(sync.current_gate().unwrap().addr, mac(0xaa));
        assert_eq!(sync.current_gate().unwrap().metric, 41);
    }

    #[tokio::test]
    async fn no_gates_installs_nothing() {
        let (handle, stats) = spawn_routing();
        let (mut sync, installer) = sync_task(handle, stats);
        sync.sync_once().await.unwrap();
        assert!(installer.ops().is_empty());
        assert!(sync.current_gate().is_none());
    }

    #[tokio::test]
    async fn install_failure_retries_next_cycle() {
        let (handle, stats) = spawn_routing();
        handle
            .deliver_frame(mac(0x10), gate_pann(0xaa, 1, 40).encode())
            .await
            .unwrap();

        let (mut sync, installer) = sync_task(handle, Arc::clone(&stats));
        installer.set_failing(true);
        sync.sync_once().await.unwrap();
        assert!(sync.current_gate().is_none());
        assert_eq!(stats.snapshot().route_install_failures, 1);

        installer.set_failing(false);
        sync.sync_once().await.unwrap();
        assert_eq!(sync.current_gate().unwrap().addr, mac(0xaa));
        assert_eq!(installer.ops().len(), 1);
    }

    #[tokio::test]
    async fn becoming_a_gate_clears_the_default_route() {
        let (handle, stats) = spawn_routing();
        handle
            .deliver_frame(mac(0x10), gate_pann(0xaa, 1, 40).encode())
            .await
            .unwrap();

        let (mut sync, installer) = sync_task(handle.clone(), stats);
        sync.sync_once().await.unwrap();
        assert!(sync.current_gate().is_some());

        handle.set_gateway_status(true).await.unwrap();
        sync.sync_once().await.unwrap();

        assert!(sync.current_gate().is_none());
        assert_eq!(
            installer.ops().last().unwrap(),
            &RouteOp::ClearDefaultGate {
                interface: "mesh0".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn hysteresis_keeps_installed_gate() {
        let (handle, stats) = spawn_routing();
        handle
            .deliver_frame(mac(0x10), gate_pann(0xaa, 1, 99).encode())
            .await
            .unwrap();

        let (mut sync, installer) = sync_task(handle.clone(), stats);
        sync.sync_once().await.unwrap();
        assert_eq!(sync.current_gate().unwrap().metric, 100);

        // A challenger at metric 60+1 is not better than 100 / 2.
        handle
            .deliver_frame(mac(0x10), gate_pann(0xbb, 1, 60).encode())
            .await
            .unwrap();
        sync.sync_once().await.unwrap();
        assert_eq!(sync.current_gate().unwrap().addr, mac(0xaa));

        // A challenger at 40+1 clears the cutoff: switch.
        handle
            .deliver_frame(mac(0x10), gate_pann(0xcc, 1, 40).encode())
            .await
            .unwrap();
        sync.sync_once().await.unwrap();
        assert_eq!(sync.current_gate().unwrap().addr, mac(0xcc));
        assert_eq!(installer.ops().len(), 2);
    }
}
