//! Placeholder kernel adapters.
//!
//! The netlink route programmer and the nl80211 driver handler are external
//! collaborators; until one is attached, these stand-ins log every call so
//! the daemon remains runnable and observable end to end.

use meshd_core::MacAddress;
use meshd_interfaces::{InterfaceError, MeshDriver, RouteInstaller};

/// A [`RouteInstaller`] that only logs the operations it would perform.
#[derive(Debug, Default)]
pub struct LoggingRouteInstaller;

impl RouteInstaller for LoggingRouteInstaller {
    fn set_default_gate(&self, gate: MacAddress, interface: &str) -> Result<(), InterfaceError> {
        tracing::info!(%gate, interface, "would install default route");
        Ok(())
    }

    fn clear_default_gate(&self, interface: &str) -> Result<(), InterfaceError> {
        tracing::info!(interface, "would clear default route");
        Ok(())
    }

    fn set_mesh_path(&self, dst: MacAddress, next_hop: MacAddress) -> Result<(), InterfaceError> {
        tracing::debug!(%dst, %next_hop, "would install mesh path");
        Ok(())
    }

    fn clear_mesh_path(&self, dst: MacAddress) -> Result<(), InterfaceError> {
        tracing::debug!(%dst, "would clear mesh path");
        Ok(())
    }
}

/// A [`MeshDriver`] that only logs root-mode changes.
#[derive(Debug, Default)]
pub struct LoggingDriver;

impl MeshDriver for LoggingDriver {
    fn set_root_mode(&self, mode: u8) -> Result<(), InterfaceError> {
        tracing::info!(mode, "would set driver root mode");
        Ok(())
    }
}
