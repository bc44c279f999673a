//! Mesh-path entry type.

use meshd_core::MacAddress;

/// A single entry in the mesh-path table.
///
/// `dst` is the table key and never changes after creation. Timestamps are
/// monotonic milliseconds supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct MeshPath {
    /// Destination station.
    pub dst: MacAddress,
    /// Neighbor frames for `dst` are forwarded to. `MacAddress::ZERO` means
    /// the path has never been learned and is unreachable.
    pub next_hop: MacAddress,
    /// Latest sequence number observed from `dst`.
    pub sn: u64,
    /// Cumulative path metric to `dst`, lower is better.
    pub metric: u32,
    /// Metric of the one-hop link to `next_hop`.
    pub next_hop_metric: u32,
    /// Hops to `dst`.
    pub hop_count: u8,
    /// Absolute expiry deadline in monotonic milliseconds.
    pub exp_time: u64,
    /// `dst` is a proactive root.
    pub is_root: bool,
    /// `dst` is a mesh gate.
    pub is_gate: bool,
}

impl MeshPath {
    /// Create the default (unreachable) entry for `dst`.
    ///
    /// The defaults make the freshness comparator read naturally on first
    /// contact: sequence zero, metric zero, expiry at `now`.
    pub fn new(dst: MacAddress, now_ms: u64) -> Self {
        Self {
            dst,
            next_hop: MacAddress::ZERO,
            sn: 0,
            metric: 0,
            next_hop_metric: 0,
            hop_count: 0,
            exp_time: now_ms,
            is_root: false,
            is_gate: false,
        }
    }

    /// Whether this path is expired at `now_ms`.
    ///
    /// Strict comparison: a path queried exactly at its deadline is still
    /// valid.
    #[must_use]
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms > self.exp_time
    }

    /// Whether this path may serve forwarding decisions at `now_ms`.
    #[must_use]
    pub fn is_usable(&self, now_ms: u64) -> bool {
        !self.is_expired(now_ms) && !self.next_hop.is_zero()
    }
}
