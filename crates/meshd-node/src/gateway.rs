//! Gateway connectivity monitor.
//!
//! Periodically probes upstream reachability and decides whether this node
//! should advertise itself as a mesh gate. Every down-to-up transition
//! counts as a flap against the route dampener; while the dampener holds
//! the flow suppressed, successful probes stop re-advertising until the
//! penalty decays.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use meshd_interfaces::MeshDriver;
use meshd_routing::{DampenerEvent, RouteDampener};

use crate::probe;
use crate::routing::RoutingHandle;
use crate::stats::Stats;

/// Source of WAN reachability verdicts.
///
/// The production prober does bound TCP connects; tests script the answers.
pub trait WanProber: Send {
    fn probe(&mut self) -> impl std::future::Future<Output = bool> + Send;
}

/// Probes each monitored address with a bound, timed TCP connect, repeating
/// the round up to `robustness` times until any attempt succeeds.
pub struct TcpProber {
    pub interface: String,
    pub addresses: Vec<std::net::SocketAddr>,
    pub timeout: Duration,
    pub robustness: u32,
}

impl WanProber for TcpProber {
    async fn probe(&mut self) -> bool {
        for _ in 0..self.robustness {
            if probe::probe_any(&self.interface, &self.addresses, self.timeout).await {
                return true;
            }
        }
        false
    }
}

/// What the monitor should do after a probe, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayAction {
    /// Set the driver root mode and mark this node a gate.
    Advertise,
    /// Clear the driver root mode and withdraw gate status.
    Withdraw,
    /// Count a down-to-up transition against the dampener.
    Flap,
}

/// Decide the monitor actions for one probe outcome.
///
/// On success: advertise unless suppressed, and count the transition as a
/// flap if we were previously down. On failure: withdraw unconditionally.
/// Returns the actions plus the new activity state.
#[must_use]
pub fn decide_gateway_actions(
    probe_ok: bool,
    was_active: bool,
    dampened: bool,
) -> (Vec<GatewayAction>, bool) {
    if probe_ok {
        let mut actions = Vec::new();
        if !dampened {
            actions.push(GatewayAction::Advertise);
        }
        if !was_active {
            actions.push(GatewayAction::Flap);
        }
        (actions, true)
    } else {
        (vec![GatewayAction::Withdraw], false)
    }
}

/// Monitor parameters.
#[derive(Debug, Clone)]
pub struct GatewayMonitorConfig {
    pub monitor_interval_ms: u64,
    /// Driver root mode to apply while advertising; 0 leaves the driver
    /// untouched.
    pub set_root_mode_if_gate: u8,
}

/// The gateway connectivity monitor task.
pub struct GatewayMonitor<P> {
    config: GatewayMonitorConfig,
    prober: P,
    routing: RoutingHandle,
    driver: Arc<dyn MeshDriver>,
    dampener: RouteDampener,
    stats: Arc<Stats>,
    is_gateway_active: bool,
    started: Instant,
}

impl<P: WanProber> GatewayMonitor<P> {
    pub fn new(
        config: GatewayMonitorConfig,
        prober: P,
        routing: RoutingHandle,
        driver: Arc<dyn MeshDriver>,
        dampener: RouteDampener,
        stats: Arc<Stats>,
    ) -> Self {
        Self {
            config,
            prober,
            routing,
            driver,
            dampener,
            stats,
            is_gateway_active: false,
            started: Instant::now(),
        }
    }

    fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Whether the last probe found the upstream reachable.
    #[must_use]
    pub fn is_gateway_active(&self) -> bool {
        self.is_gateway_active
    }

    /// Run the monitor until the stop signal.
    pub async fn run(mut self, mut stop_rx: watch::Receiver<bool>) {
        let mut timer =
            tokio::time::interval(Duration::from_millis(self.config.monitor_interval_ms));
        loop {
            tokio::select! {
                _ = timer.tick() => self.check_once().await,
                _ = stop_rx.changed() => break,
            }
        }
    }

    /// One probe-and-reconcile pass.
    pub async fn check_once(&mut self) {
        // Decay first so a long-suppressed flow can be released on the same
        // tick that finds the upstream healthy.
        if let Some(DampenerEvent::Undampened) = self.dampener.decay(self.now_ms()) {
            self.stats.dampener_releases.fetch_add(1, Ordering::Relaxed);
            if self.is_gateway_active {
                self.advertise().await;
            }
        }

        let probe_ok = self.prober.probe().await;
        if probe_ok {
            self.stats.probe_successes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.probe_failures.fetch_add(1, Ordering::Relaxed);
        }

        let (actions, now_active) =
            decide_gateway_actions(probe_ok, self.is_gateway_active, self.dampener.is_dampened());
        for action in actions {
            match action {
                GatewayAction::Advertise => self.advertise().await,
                GatewayAction::Withdraw => self.withdraw().await,
                GatewayAction::Flap => {
                    if let Some(DampenerEvent::Dampened) = self.dampener.flap(self.now_ms()) {
                        self.stats
                            .dampener_suppressions
                            .fetch_add(1, Ordering::Relaxed);
                        if self.is_gateway_active {
                            self.withdraw().await;
                        }
                    }
                }
            }
        }
        self.is_gateway_active = now_active;
    }

    async fn advertise(&mut self) {
        if self.config.set_root_mode_if_gate != 0 {
            if let Err(e) = self.driver.set_root_mode(self.config.set_root_mode_if_gate) {
                tracing::warn!("failed to set driver root mode: {e}");
            }
        }
        if self.routing.set_gateway_status(true).await.is_err() {
            tracing::debug!("routing loop gone, cannot advertise gateway");
        }
    }

    async fn withdraw(&mut self) {
        if self.config.set_root_mode_if_gate != 0 {
            if let Err(e) = self.driver.set_root_mode(0) {
                tracing::warn!("failed to clear driver root mode: {e}");
            }
        }
        if self.routing.set_gateway_status(false).await.is_err() {
            tracing::debug!("routing loop gone, cannot withdraw gateway");
        }
    }
}
