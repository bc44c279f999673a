//! Daemon counters.
//!
//! A single shared counter block, bumped from the routing actor and the
//! gateway monitor, snapshot-able for inspection. Dropped frames are never
//! errors; the counters are how they stay observable.

use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! counters {
    ($($name:ident),* $(,)?) => {
        /// Shared atomic counters. Call sites bump fields directly with
        /// `fetch_add(1, Ordering::Relaxed)`.
        #[derive(Debug, Default)]
        pub struct Stats {
            $(pub $name: AtomicU64,)*
        }

        /// A point-in-time copy of every counter.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct StatsSnapshot {
            $(pub $name: u64,)*
        }

        impl Stats {
            pub fn new() -> Self {
                Self::default()
            }

            /// Copy every counter at once.
            pub fn snapshot(&self) -> StatsSnapshot {
                StatsSnapshot {
                    $($name: self.$name.load(Ordering::Relaxed),)*
                }
            }
        }
    };
}

counters! {
    pann_received,
    pann_originated,
    pann_forwarded,
    malformed_frames,
    unknown_neighbor_drops,
    stale_drops,
    self_originated_drops,
    send_failures,
    paths_expired,
    route_install_failures,
    probe_successes,
    probe_failures,
    dampener_suppressions,
    dampener_releases,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let stats = Stats::new();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn bump_and_snapshot() {
        let stats = Stats::new();
        stats.pann_received.fetch_add(1, Ordering::Relaxed);
        stats.pann_received.fetch_add(1, Ordering::Relaxed);
        stats.paths_expired.fetch_add(3, Ordering::Relaxed);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.pann_received, 2);
        assert_eq!(snapshot.paths_expired, 3);
        assert_eq!(snapshot.malformed_frames, 0);
    }
}
