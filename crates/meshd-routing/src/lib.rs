//! Routing engine for the meshd daemon.
//!
//! This crate holds the protocol logic as pure, synchronous state machines:
//! the mesh-path table, the PANN freshness/forwarding rules, self-origination,
//! gate selection with hysteresis, and the route dampener. All operations
//! take a caller-supplied monotonic `now_ms`, so every decision is
//! deterministic under test; I/O stays in the node crate.

pub mod dampener;
pub mod error;
pub mod gate;
pub mod originator;
pub mod pann;
pub mod path;

pub use dampener::{DampenerConfig, DampenerEvent, RouteDampener};
pub use error::DampenerConfigError;
pub use gate::{is_station_in_top_k_gates, select_gate, top_k_gates, GateChoice, InstalledGate};
pub use originator::PannOriginator;
pub use pann::{process_pann, PannDisposition};
pub use path::{MeshPath, PathTable};
