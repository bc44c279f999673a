//! Capability traits at the kernel and driver seams.
//!
//! The routing engine never talks to netlink or nl80211 directly; it holds
//! trait objects for the three things the outside world provides. Tests use
//! the recording fakes from [`crate::testing`].

use std::collections::HashMap;
use std::sync::RwLock;

use meshd_core::MacAddress;

use crate::error::InterfaceError;

/// Source of current one-hop link metrics.
pub trait MetricSource: Send + Sync {
    /// The current metric of the link to `neighbor`, or `None` when the
    /// station is not a known neighbor or no estimate exists yet.
    fn link_metric(&self, neighbor: MacAddress) -> Option<u32>;
}

/// Kernel route-table writer.
pub trait RouteInstaller: Send + Sync {
    /// Install the default route via `gate` on `interface`.
    fn set_default_gate(&self, gate: MacAddress, interface: &str) -> Result<(), InterfaceError>;

    /// Remove the default route on `interface`.
    fn clear_default_gate(&self, interface: &str) -> Result<(), InterfaceError>;

    /// Install a per-destination mesh forwarding entry.
    fn set_mesh_path(&self, dst: MacAddress, next_hop: MacAddress) -> Result<(), InterfaceError>;

    /// Remove a per-destination mesh forwarding entry.
    fn clear_mesh_path(&self, dst: MacAddress) -> Result<(), InterfaceError>;
}

/// 802.11s driver control surface.
pub trait MeshDriver: Send + Sync {
    /// Set the driver root-announcement mode; 0 means "not root", nonzero
    /// values are the protocol-defined announcement intervals.
    fn set_root_mode(&self, mode: u8) -> Result<(), InterfaceError>;
}

/// A [`MetricSource`] backed by a mutable map, with an optional fallback
/// for unknown neighbors.
///
/// Stands in for the link-metric estimator (an external collaborator) both
/// in tests and in deployments that have not attached a real estimator.
#[derive(Debug, Default)]
pub struct StaticMetricSource {
    metrics: RwLock<HashMap<MacAddress, u32>>,
    fallback: Option<u32>,
}

impl StaticMetricSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source that answers `fallback` for every unknown neighbor.
    pub fn with_fallback(fallback: u32) -> Self {
        Self {
            metrics: RwLock::new(HashMap::new()),
            fallback: Some(fallback),
        }
    }

    /// Set the metric for one neighbor.
    pub fn set(&self, neighbor: MacAddress, metric: u32) {
        self.metrics
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(neighbor, metric);
    }

    /// Forget a neighbor, making it unknown again.
    pub fn remove(&self, neighbor: MacAddress) {
        self.metrics
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&neighbor);
    }
}

impl MetricSource for StaticMetricSource {
    // A poisoned lock still holds a valid map; recover the guard.
    fn link_metric(&self, neighbor: MacAddress) -> Option<u32> {
        self.metrics
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&neighbor)
            .copied()
            .or(self.fallback)
    }
}
