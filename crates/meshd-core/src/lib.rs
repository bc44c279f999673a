//! Wire-level types for the meshd routing daemon.
//!
//! This crate holds the pieces every other crate agrees on: the station
//! address type, the PANN frame structure with its binary codec, and the
//! protocol constants.

pub mod constants;
pub mod error;
pub mod frame;
pub mod types;

pub use error::FrameError;
pub use frame::{FrameType, PannFrame};
pub use types::MacAddress;
