//! TOML-based configuration for meshd.
//!
//! [`NodeConfig`] mirrors the file layout; [`Settings`] is the validated,
//! typed form the daemon actually runs on. Invariant violations (threshold
//! orderings, zero timers, unparseable addresses) are fatal at startup.

use std::net::SocketAddr;
use std::path::Path;

use serde::Deserialize;

use meshd_core::constants::*;
use meshd_core::MacAddress;
use meshd_routing::DampenerConfig;

use crate::error::NodeError;

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct NodeConfig {
    pub node: NodeSection,
    #[serde(default)]
    pub gateway: GatewaySection,
    #[serde(default)]
    pub dampener: DampenerSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// The `[node]` section.
#[derive(Debug, Deserialize)]
pub struct NodeSection {
    /// This station's MAC address, e.g. "02:00:00:00:00:01".
    pub node_addr: String,
    /// Mesh interface the routing transport runs on.
    #[serde(default = "default_interface")]
    pub interface: String,
    /// UDP port for routing frames.
    #[serde(default = "default_port")]
    pub port: u16,
    /// TTL carried in self-originated PANNs (1-255).
    #[serde(default = "default_element_ttl")]
    pub element_ttl: u8,
    /// Lifetime of a learned path in milliseconds.
    #[serde(default = "default_active_path_timeout_ms")]
    pub active_path_timeout_ms: u64,
    /// Interval between self-originated PANNs while root or gate.
    #[serde(default = "default_root_pann_interval_ms")]
    pub root_pann_interval_ms: u64,
    /// Interval between path-table housekeeping sweeps.
    #[serde(default = "default_housekeeping_interval_ms")]
    pub housekeeping_interval_ms: u64,
    /// Interval between kernel route reconciliation passes.
    #[serde(default = "default_sync_routes_interval_ms")]
    pub sync_routes_interval_ms: u64,
    /// Whether this node is a proactive root regardless of gate status.
    #[serde(default)]
    pub is_root: bool,
    /// How many of the best gates are acceptable upstreams.
    #[serde(default = "default_top_k_gates")]
    pub top_k_gates: usize,
    /// Link metric assumed for neighbors when no estimator is attached.
    #[serde(default = "default_link_metric")]
    pub default_link_metric: u32,
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            node_addr: String::new(),
            interface: default_interface(),
            port: default_port(),
            element_ttl: default_element_ttl(),
            active_path_timeout_ms: default_active_path_timeout_ms(),
            root_pann_interval_ms: default_root_pann_interval_ms(),
            housekeeping_interval_ms: default_housekeeping_interval_ms(),
            sync_routes_interval_ms: default_sync_routes_interval_ms(),
            is_root: false,
            top_k_gates: default_top_k_gates(),
            default_link_metric: default_link_metric(),
        }
    }
}

fn default_interface() -> String {
    "mesh0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_ROUTING_PORT
}

fn default_element_ttl() -> u8 {
    DEFAULT_ELEMENT_TTL
}

fn default_active_path_timeout_ms() -> u64 {
    DEFAULT_ACTIVE_PATH_TIMEOUT_MS
}

fn default_root_pann_interval_ms() -> u64 {
    DEFAULT_ROOT_PANN_INTERVAL_MS
}

fn default_housekeeping_interval_ms() -> u64 {
    DEFAULT_HOUSEKEEPING_INTERVAL_MS
}

fn default_sync_routes_interval_ms() -> u64 {
    DEFAULT_SYNC_ROUTES_INTERVAL_MS
}

fn default_top_k_gates() -> usize {
    DEFAULT_TOP_K_GATES
}

fn default_link_metric() -> u32 {
    100
}

/// The `[gateway]` section. An empty address list disables monitoring.
#[derive(Debug, Deserialize)]
pub struct GatewaySection {
    /// Upstream endpoints probed for WAN reachability, e.g. "1.1.1.1:443".
    #[serde(default)]
    pub monitored_addresses: Vec<String>,
    /// Interface the probe sockets are bound to (the WAN side).
    #[serde(default = "default_monitored_interface")]
    pub monitored_interface: String,
    #[serde(default = "default_monitor_interval_ms")]
    pub monitor_interval_ms: u64,
    #[serde(default = "default_monitor_socket_timeout_ms")]
    pub monitor_socket_timeout_ms: u64,
    /// Probe rounds per check; any single success counts.
    #[serde(default = "default_robustness")]
    pub robustness: u32,
    /// Driver root mode to set while a gate; 0 leaves the driver alone.
    #[serde(default)]
    pub set_root_mode_if_gate: u8,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            monitored_addresses: Vec::new(),
            monitored_interface: default_monitored_interface(),
            monitor_interval_ms: default_monitor_interval_ms(),
            monitor_socket_timeout_ms: default_monitor_socket_timeout_ms(),
            robustness: default_robustness(),
            set_root_mode_if_gate: 0,
        }
    }
}

fn default_monitored_interface() -> String {
    "eth0".to_string()
}

fn default_monitor_interval_ms() -> u64 {
    DEFAULT_MONITOR_INTERVAL_MS
}

fn default_monitor_socket_timeout_ms() -> u64 {
    DEFAULT_MONITOR_SOCKET_TIMEOUT_MS
}

fn default_robustness() -> u32 {
    DEFAULT_ROBUSTNESS
}

/// The `[dampener]` section.
#[derive(Debug, Deserialize)]
pub struct DampenerSection {
    #[serde(default = "default_penalty")]
    pub penalty: f64,
    #[serde(default = "default_suppress_limit")]
    pub suppress_limit: f64,
    #[serde(default = "default_reuse_limit")]
    pub reuse_limit: f64,
    #[serde(default = "default_half_life_ms")]
    pub half_life_ms: u64,
    #[serde(default = "default_max_suppress_ms")]
    pub max_suppress_limit_ms: u64,
}

impl Default for DampenerSection {
    fn default() -> Self {
        Self {
            penalty: default_penalty(),
            suppress_limit: default_suppress_limit(),
            reuse_limit: default_reuse_limit(),
            half_life_ms: default_half_life_ms(),
            max_suppress_limit_ms: default_max_suppress_ms(),
        }
    }
}

fn default_penalty() -> f64 {
    DEFAULT_DAMPENER_PENALTY
}

fn default_suppress_limit() -> f64 {
    DEFAULT_DAMPENER_SUPPRESS_LIMIT
}

fn default_reuse_limit() -> f64 {
    DEFAULT_DAMPENER_REUSE_LIMIT
}

fn default_half_life_ms() -> u64 {
    DEFAULT_DAMPENER_HALF_LIFE_MS
}

fn default_max_suppress_ms() -> u64 {
    DEFAULT_DAMPENER_MAX_SUPPRESS_MS
}

/// The `[logging]` section.
#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("failed to read config file: {e}")))?;
        toml::from_str(&content)
            .map_err(|e| NodeError::Config(format!("failed to parse config: {e}")))
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(format!("failed to parse config: {e}")))
    }
}

/// Validated, typed daemon settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub node_addr: MacAddress,
    pub interface: String,
    pub port: u16,
    pub element_ttl: u8,
    pub active_path_timeout_ms: u64,
    pub root_pann_interval_ms: u64,
    pub housekeeping_interval_ms: u64,
    pub sync_routes_interval_ms: u64,
    pub is_root: bool,
    pub top_k_gates: usize,
    pub default_link_metric: u32,
    pub monitored_addresses: Vec<SocketAddr>,
    pub monitored_interface: String,
    pub monitor_interval_ms: u64,
    pub monitor_socket_timeout_ms: u64,
    pub robustness: u32,
    pub set_root_mode_if_gate: u8,
    pub dampener: DampenerConfig,
}

impl Settings {
    /// Validate a parsed config, producing runnable settings.
    pub fn from_config(config: &NodeConfig) -> Result<Self, NodeError> {
        let node_addr: MacAddress = config
            .node
            .node_addr
            .parse()
            .map_err(|e| NodeError::Config(format!("node_addr: {e}")))?;
        if node_addr.is_zero() || node_addr.is_broadcast() {
            return Err(NodeError::Config(format!(
                "node_addr {node_addr} is not a station address"
            )));
        }

        if config.node.element_ttl == 0 {
            return Err(NodeError::Config("element_ttl must be at least 1".into()));
        }
        for (name, value) in [
            ("active_path_timeout_ms", config.node.active_path_timeout_ms),
            ("root_pann_interval_ms", config.node.root_pann_interval_ms),
            (
                "housekeeping_interval_ms",
                config.node.housekeeping_interval_ms,
            ),
            (
                "sync_routes_interval_ms",
                config.node.sync_routes_interval_ms,
            ),
            ("monitor_interval_ms", config.gateway.monitor_interval_ms),
            (
                "monitor_socket_timeout_ms",
                config.gateway.monitor_socket_timeout_ms,
            ),
        ] {
            if value == 0 {
                return Err(NodeError::Config(format!("{name} must be positive")));
            }
        }
        if config.node.top_k_gates == 0 {
            return Err(NodeError::Config("top_k_gates must be at least 1".into()));
        }
        if config.gateway.robustness == 0 {
            return Err(NodeError::Config("robustness must be at least 1".into()));
        }

        let monitored_addresses = config
            .gateway
            .monitored_addresses
            .iter()
            .map(|s| {
                s.parse::<SocketAddr>()
                    .map_err(|e| NodeError::Config(format!("monitored address '{s}': {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let dampener = DampenerConfig {
            penalty_increment: config.dampener.penalty,
            suppress_limit: config.dampener.suppress_limit,
            reuse_limit: config.dampener.reuse_limit,
            half_life_ms: config.dampener.half_life_ms,
            max_suppress_ms: config.dampener.max_suppress_limit_ms,
        };
        dampener
            .validate()
            .map_err(|e| NodeError::Config(format!("dampener: {e}")))?;

        Ok(Self {
            node_addr,
            interface: config.node.interface.clone(),
            port: config.node.port,
            element_ttl: config.node.element_ttl,
            active_path_timeout_ms: config.node.active_path_timeout_ms,
            root_pann_interval_ms: config.node.root_pann_interval_ms,
            housekeeping_interval_ms: config.node.housekeeping_interval_ms,
            sync_routes_interval_ms: config.node.sync_routes_interval_ms,
            is_root: config.node.is_root,
            top_k_gates: config.node.top_k_gates,
            default_link_metric: config.node.default_link_metric,
            monitored_addresses,
            monitored_interface: config.gateway.monitored_interface.clone(),
            monitor_interval_ms: config.gateway.monitor_interval_ms,
            monitor_socket_timeout_ms: config.gateway.monitor_socket_timeout_ms,
            robustness: config.gateway.robustness,
            set_root_mode_if_gate: config.gateway.set_root_mode_if_gate,
            dampener,
        })
    }
}
