//! The routing event loop.
//!
//! One task owns the path table, the originator, and the gate flag. Inbound
//! frames, gateway-status changes, and inspection queries all arrive as
//! [`RoutingCommand`] messages; the origination and housekeeping timers are
//! polled in the same `select!` loop. Handlers run to completion, so every
//! observer sees table state from whole-operation boundaries only.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use meshd_core::constants::GATEWAY_CHANGE_THRESHOLD_FACTOR;
use meshd_core::{MacAddress, PannFrame};
use meshd_interfaces::MetricSource;
use meshd_routing::gate::is_station_in_top_k_gates;
use meshd_routing::{
    process_pann, select_gate, GateChoice, InstalledGate, PannDisposition, PannOriginator,
    PathTable,
};

use crate::error::NodeError;
use crate::stats::Stats;

/// Routing engine parameters, the validated subset of the node config.
#[derive(Debug, Clone)]
pub struct RoutingConfig {
    pub node_addr: MacAddress,
    pub element_ttl: u8,
    pub active_path_timeout_ms: u64,
    pub root_pann_interval_ms: u64,
    pub housekeeping_interval_ms: u64,
    pub is_root: bool,
    pub top_k_gates: usize,
}

/// Messages marshaled onto the routing loop.
#[derive(Debug)]
pub enum RoutingCommand {
    /// A raw frame received from neighbor `from`.
    Frame { from: MacAddress, data: Vec<u8> },
    /// Gateway monitor verdict: this node is (not) a gate.
    SetGatewayStatus(bool),
    GetGatewayStatus(oneshot::Sender<bool>),
    DumpPaths(oneshot::Sender<Vec<meshd_routing::MeshPath>>),
    /// Run gate selection against the live table.
    SelectGate {
        installed: Option<InstalledGate>,
        reply: oneshot::Sender<Option<GateChoice>>,
    },
    /// Whether `station` is currently one of the top-K gates.
    IsTopKGate {
        station: MacAddress,
        reply: oneshot::Sender<bool>,
    },
}

/// Cloneable handle for talking to the routing loop from other tasks.
#[derive(Clone)]
pub struct RoutingHandle {
    tx: mpsc::Sender<RoutingCommand>,
}

impl RoutingHandle {
    /// Deliver a received frame to the loop.
    pub async fn deliver_frame(&self, from: MacAddress, data: Vec<u8>) -> Result<(), NodeError> {
        self.tx
            .send(RoutingCommand::Frame { from, data })
            .await
            .map_err(|_| NodeError::RoutingGone)
    }

    pub async fn set_gateway_status(&self, is_gate: bool) -> Result<(), NodeError> {
        self.tx
            .send(RoutingCommand::SetGatewayStatus(is_gate))
            .await
            .map_err(|_| NodeError::RoutingGone)
    }

    pub async fn get_gateway_status(&self) -> Result<bool, NodeError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(RoutingCommand::GetGatewayStatus(reply))
            .await
            .map_err(|_| NodeError::RoutingGone)?;
        rx.await.map_err(|_| NodeError::RoutingGone)
    }

    /// Snapshot every mesh path.
    pub async fn dump_paths(&self) -> Result<Vec<meshd_routing::MeshPath>, NodeError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(RoutingCommand::DumpPaths(reply))
            .await
            .map_err(|_| NodeError::RoutingGone)?;
        rx.await.map_err(|_| NodeError::RoutingGone)
    }

    /// Run gate selection with hysteresis against `installed`.
    pub async fn select_gate(
        &self,
        installed: Option<InstalledGate>,
    ) -> Result<Option<GateChoice>, NodeError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(RoutingCommand::SelectGate { installed, reply })
            .await
            .map_err(|_| NodeError::RoutingGone)?;
        rx.await.map_err(|_| NodeError::RoutingGone)
    }

    /// Whether `station` is an acceptable upstream right now.
    pub async fn is_top_k_gate(&self, station: MacAddress) -> Result<bool, NodeError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(RoutingCommand::IsTopKGate { station, reply })
            .await
            .map_err(|_| NodeError::RoutingGone)?;
        rx.await.map_err(|_| NodeError::RoutingGone)
    }
}

/// The routing actor. Construct with [`Routing::new`], then drive with
/// [`Routing::run`] on its own task.
pub struct Routing {
    config: RoutingConfig,
    table: PathTable,
    originator: PannOriginator,
    is_gate: bool,
    metric_source: Arc<dyn MetricSource>,
    outbound: mpsc::Sender<(MacAddress, Vec<u8>)>,
    commands: mpsc::Receiver<RoutingCommand>,
    stats: Arc<Stats>,
    started: Instant,
}

impl Routing {
    pub fn new(
        config: RoutingConfig,
        metric_source: Arc<dyn MetricSource>,
        outbound: mpsc::Sender<(MacAddress, Vec<u8>)>,
        stats: Arc<Stats>,
    ) -> (Self, RoutingHandle) {
        let (tx, commands) = mpsc::channel(1024);
        let originator = PannOriginator::new(config.node_addr, config.element_ttl);
        let routing = Self {
            config,
            table: PathTable::new(),
            originator,
            is_gate: false,
            metric_source,
            outbound,
            commands,
            stats,
            started: Instant::now(),
        };
        (routing, RoutingHandle { tx })
    }

    fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Run the event loop until every handle is dropped.
    pub async fn run(mut self) {
        let mut pann_timer =
            tokio::time::interval(Duration::from_millis(self.config.root_pann_interval_ms));
        let mut housekeeping_timer =
            tokio::time::interval(Duration::from_millis(self.config.housekeeping_interval_ms));
        // The zeroth ticks fire immediately; skip announcing before anyone
        // has had a chance to set the gate flag.
        pann_timer.tick().await;
        housekeeping_timer.tick().await;

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        Some(command) => self.handle_command(command).await,
                        None => break,
                    }
                }
                _ = pann_timer.tick() => self.announce().await,
                _ = housekeeping_timer.tick() => self.housekeeping(),
            }
        }
        tracing::debug!("routing loop stopped");
    }

    async fn handle_command(&mut self, command: RoutingCommand) {
        match command {
            RoutingCommand::Frame { from, data } => self.handle_frame(from, &data).await,
            RoutingCommand::SetGatewayStatus(is_gate) => self.set_gateway_status(is_gate).await,
            RoutingCommand::GetGatewayStatus(reply) => {
                let _ = reply.send(self.is_gate);
            }
            RoutingCommand::DumpPaths(reply) => {
                let _ = reply.send(self.table.dump());
            }
            RoutingCommand::SelectGate { installed, reply } => {
                let paths = self.table.dump();
                let choice = select_gate(
                    &paths,
                    self.now_ms(),
                    installed,
                    GATEWAY_CHANGE_THRESHOLD_FACTOR,
                );
                let _ = reply.send(choice);
            }
            RoutingCommand::IsTopKGate { station, reply } => {
                let paths = self.table.dump();
                let _ = reply.send(is_station_in_top_k_gates(
                    &paths,
                    self.now_ms(),
                    self.config.top_k_gates,
                    station,
                ));
            }
        }
    }

    async fn handle_frame(&mut self, from: MacAddress, data: &[u8]) {
        let frame = match PannFrame::decode(data) {
            Ok(frame) => frame,
            Err(e) => {
                self.stats.malformed_frames.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(%from, "discarding malformed frame: {e}");
                return;
            }
        };
        self.stats.pann_received.fetch_add(1, Ordering::Relaxed);

        let link_metric = self.metric_source.link_metric(from);
        let now = self.now_ms();
        let disposition = process_pann(
            &mut self.table,
            self.config.node_addr,
            from,
            &frame,
            link_metric,
            now,
            self.config.active_path_timeout_ms,
        );

        match disposition {
            PannDisposition::SelfOriginated => {
                self.stats
                    .self_originated_drops
                    .fetch_add(1, Ordering::Relaxed);
            }
            PannDisposition::UnknownNeighbor => {
                self.stats
                    .unknown_neighbor_drops
                    .fetch_add(1, Ordering::Relaxed);
                tracing::debug!(%from, "no link metric for neighbor, frame dropped");
            }
            PannDisposition::Stale => {
                self.stats.stale_drops.fetch_add(1, Ordering::Relaxed);
            }
            PannDisposition::Accepted { forward } => {
                tracing::trace!(
                    orig = %frame.orig_addr,
                    sn = frame.orig_sn,
                    %from,
                    "path updated from PANN"
                );
                if let Some(forward) = forward {
                    self.stats.pann_forwarded.fetch_add(1, Ordering::Relaxed);
                    self.transmit(MacAddress::BROADCAST, &forward).await;
                }
            }
        }
    }

    async fn set_gateway_status(&mut self, is_gate: bool) {
        let was_gate = self.is_gate;
        self.is_gate = is_gate;
        if was_gate == is_gate {
            return;
        }
        tracing::info!(is_gate, "gateway status changed");

        // Announce the loss once so the mesh converges before origination
        // stops.
        if was_gate && !is_gate {
            let frame = self.originator.next_announcement(false);
            self.stats.pann_originated.fetch_add(1, Ordering::Relaxed);
            self.transmit(MacAddress::BROADCAST, &frame).await;
        }
    }

    async fn announce(&mut self) {
        if !self.config.is_root && !self.is_gate {
            return;
        }
        let frame = self.originator.next_announcement(self.is_gate);
        self.stats.pann_originated.fetch_add(1, Ordering::Relaxed);
        self.transmit(MacAddress::BROADCAST, &frame).await;
    }

    fn housekeeping(&mut self) {
        let grace = self.config.active_path_timeout_ms.saturating_mul(2);
        let removed = self.table.cull(self.now_ms(), grace);
        if removed > 0 {
            self.stats
                .paths_expired
                .fetch_add(removed as u64, Ordering::Relaxed);
            tracing::debug!(removed, "housekeeping removed stale paths");
        }
    }

    async fn transmit(&self, dest: MacAddress, frame: &PannFrame) {
        if self.outbound.send((dest, frame.encode())).await.is_err() {
            self.stats.send_failures.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(%dest, "outbound channel closed, frame dropped");
        }
    }
}
