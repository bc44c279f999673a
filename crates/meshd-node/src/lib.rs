//! Daemon orchestration for meshd.
//!
//! Wires the routing engine, the UDP transport, the kernel-facing
//! capability adapters, and the gateway connectivity monitor into a set of
//! cooperating tokio tasks. Protocol decisions stay in `meshd-routing`;
//! this crate owns timers, channels, and I/O.

pub mod adapters;
pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod probe;
pub mod routing;
pub mod stats;
pub mod sync_routes;

pub use config::{NodeConfig, Settings};
pub use error::NodeError;
pub use routing::{Routing, RoutingHandle};
