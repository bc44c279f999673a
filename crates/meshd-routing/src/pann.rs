//! PANN receive processing.
//!
//! The freshness rules, path update, and flood decision live here as a pure
//! function over the path table. The caller resolves the neighbor link
//! metric and performs the actual transmit; this keeps every protocol rule
//! testable without I/O.

use meshd_core::{MacAddress, PannFrame};

use crate::path::PathTable;

/// Outcome of processing one received PANN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PannDisposition {
    /// The frame carried our own origin address and was discarded.
    SelfOriginated,
    /// The sender is not a known neighbor (no link metric); discarded.
    UnknownNeighbor,
    /// The frame was not fresher than the stored path; discarded.
    Stale,
    /// The path was updated. `forward` carries the frame to re-flood on the
    /// broadcast address, when the TTL allows another hop.
    Accepted { forward: Option<PannFrame> },
}

/// Apply one received PANN to the path table.
///
/// `sa` is the neighbor the frame arrived from and `link_metric` the current
/// metric of the `sa -> self` link (`None` when `sa` is not a neighbor).
///
/// Sequence numbers compare with strict unsigned `>`; wraparound is
/// deliberately not handled, so an origin rolling over from `u64::MAX`
/// stalls until housekeeping expires its path.
pub fn process_pann(
    table: &mut PathTable,
    node_addr: MacAddress,
    sa: MacAddress,
    frame: &PannFrame,
    link_metric: Option<u32>,
    now_ms: u64,
    active_path_timeout_ms: u64,
) -> PannDisposition {
    if frame.orig_addr == node_addr {
        return PannDisposition::SelfOriginated;
    }

    let link_metric = match link_metric {
        Some(metric) => metric,
        None => return PannDisposition::UnknownNeighbor,
    };

    let path = table.entry(frame.orig_addr, now_ms);
    let new_metric = frame.metric.saturating_add(link_metric);

    let fresher = frame.orig_sn > path.sn
        || (frame.orig_sn == path.sn && new_metric < path.metric);
    if !fresher && !path.is_expired(now_ms) {
        return PannDisposition::Stale;
    }

    path.sn = frame.orig_sn;
    path.metric = new_metric;
    path.next_hop = sa;
    path.next_hop_metric = link_metric;
    path.hop_count = frame.hop_count.saturating_add(1);
    path.exp_time = now_ms + active_path_timeout_ms;
    path.is_gate = frame.is_gate;
    // PANNs are root announcements in this protocol variant.
    path.is_root = true;

    let forward = if frame.ttl > 1 {
        Some(PannFrame {
            orig_addr: frame.orig_addr,
            orig_sn: frame.orig_sn,
            hop_count: path.hop_count,
            ttl: frame.ttl - 1,
            target_addr: MacAddress::BROADCAST,
            metric: new_metric,
            is_gate: frame.is_gate,
            reply_requested: false,
        })
    } else {
        None
    };

    PannDisposition::Accepted { forward }
}
