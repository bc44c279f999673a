//! Upstream gate selection.
//!
//! Pure functions over a path-table snapshot: rank the non-expired gates by
//! metric, expose the top-K eligibility predicate, and pick the route target
//! with hysteresis so gates of similar quality do not oscillate.

use meshd_core::MacAddress;

use crate::path::MeshPath;

/// The gate currently installed in the kernel, as remembered by the sync
/// task (metric refreshed on each cycle the gate is kept).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstalledGate {
    pub addr: MacAddress,
    pub metric: u32,
}

/// A gate chosen by [`select_gate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct GateChoice {
    pub addr: MacAddress,
    pub next_hop: MacAddress,
    pub metric: u32,
}

impl From<&MeshPath> for GateChoice {
    fn from(path: &MeshPath) -> Self {
        Self {
            addr: path.dst,
            next_hop: path.next_hop,
            metric: path.metric,
        }
    }
}

/// Rank usable gate paths ascending by metric, ties broken by lower MAC.
fn ranked_gates(paths: &[MeshPath], now_ms: u64) -> Vec<&MeshPath> {
    let mut gates: Vec<&MeshPath> = paths
        .iter()
        .filter(|p| p.is_gate && p.is_usable(now_ms))
        .collect();
    gates.sort_by_key(|p| (p.metric, p.dst));
    gates
}

/// The K lowest-metric usable gates.
#[must_use]
pub fn top_k_gates(paths: &[MeshPath], now_ms: u64, k: usize) -> Vec<MacAddress> {
    ranked_gates(paths, now_ms)
        .into_iter()
        .take(k)
        .map(|p| p.dst)
        .collect()
}

/// Whether `station` is one of the K best gates right now.
#[must_use]
pub fn is_station_in_top_k_gates(
    paths: &[MeshPath],
    now_ms: u64,
    k: usize,
    station: MacAddress,
) -> bool {
    top_k_gates(paths, now_ms, k).contains(&station)
}

/// Choose the gate to install as the default route.
///
/// The best candidate wins outright when nothing is installed or the
/// installed gate has stopped being a usable gate path. While the installed
/// gate remains a candidate it is kept unless the challenger's metric is
/// strictly better than `installed.metric / threshold_factor`, so gates of
/// similar quality do not displace each other.
#[must_use]
pub fn select_gate(
    paths: &[MeshPath],
    now_ms: u64,
    installed: Option<InstalledGate>,
    threshold_factor: f64,
) -> Option<GateChoice> {
    let gates = ranked_gates(paths, now_ms);
    let best = *gates.first()?;

    let Some(current) = installed else {
        return Some(best.into());
    };

    let current_path = gates.iter().find(|p| p.dst == current.addr);
    match current_path {
        Some(current_path) => {
            let cutoff = f64::from(current.metric) / threshold_factor;
            if (f64::from(best.metric)) < cutoff {
                Some(best.into())
            } else {
                Some((*current_path).into())
            }
        }
        // Installed gate no longer eligible: take the best.
        None => Some(best.into()),
    }
}
