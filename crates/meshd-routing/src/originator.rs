//! Self-originated PANN construction.

use meshd_core::{MacAddress, PannFrame};

/// Builds the periodic self-announcements for a root or gate node.
///
/// Owns the local sequence number, which increments before every frame so
/// receivers always see strictly increasing values from this origin.
#[must_use]
pub struct PannOriginator {
    node_addr: MacAddress,
    element_ttl: u8,
    sn: u64,
}

impl PannOriginator {
    pub fn new(node_addr: MacAddress, element_ttl: u8) -> Self {
        Self {
            node_addr,
            element_ttl,
            sn: 0,
        }
    }

    /// Build the next self-announcement, consuming a sequence number.
    pub fn next_announcement(&mut self, is_gate: bool) -> PannFrame {
        self.sn = self.sn.wrapping_add(1);
        PannFrame {
            orig_addr: self.node_addr,
            orig_sn: self.sn,
            hop_count: 0,
            ttl: self.element_ttl,
            target_addr: MacAddress::BROADCAST,
            metric: 0,
            is_gate,
            reply_requested: false,
        }
    }

    /// The last sequence number handed out.
    #[must_use]
    pub fn current_sn(&self) -> u64 {
        self.sn
    }
}
