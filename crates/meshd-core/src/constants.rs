//! Protocol constants and daemon defaults.

/// Default TTL carried in self-originated PANN frames.
pub const DEFAULT_ELEMENT_TTL: u8 = 32;

/// Default lifetime of a learned mesh path, in milliseconds.
pub const DEFAULT_ACTIVE_PATH_TIMEOUT_MS: u64 = 30_000;

/// Default interval between self-originated PANNs while root or gate.
pub const DEFAULT_ROOT_PANN_INTERVAL_MS: u64 = 5_000;

/// Default interval between housekeeping sweeps of the path table.
pub const DEFAULT_HOUSEKEEPING_INTERVAL_MS: u64 = 1_000;

/// Default interval between kernel route reconciliation passes.
pub const DEFAULT_SYNC_ROUTES_INTERVAL_MS: u64 = 1_000;

/// How many of the best gates count as "top K" for upstream eligibility.
pub const DEFAULT_TOP_K_GATES: usize = 1;

/// A better gate must beat the installed one by this factor to displace it.
pub const GATEWAY_CHANGE_THRESHOLD_FACTOR: f64 = 2.0;

/// UDP port the routing packet transport listens on.
pub const DEFAULT_ROUTING_PORT: u16 = 6668;

/// Gateway monitor defaults.
pub const DEFAULT_MONITOR_INTERVAL_MS: u64 = 10_000;
pub const DEFAULT_MONITOR_SOCKET_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_ROBUSTNESS: u32 = 2;

/// Route dampener defaults.
pub const DEFAULT_DAMPENER_PENALTY: f64 = 1_000.0;
pub const DEFAULT_DAMPENER_SUPPRESS_LIMIT: f64 = 2_000.0;
pub const DEFAULT_DAMPENER_REUSE_LIMIT: f64 = 750.0;
pub const DEFAULT_DAMPENER_HALF_LIFE_MS: u64 = 60_000;
pub const DEFAULT_DAMPENER_MAX_SUPPRESS_MS: u64 = 180_000;
