//! In-memory fakes for the capability traits.
//!
//! Used by unit and integration tests across the workspace; kept here so
//! every crate exercises the same fakes against the same trait surface.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use meshd_core::MacAddress;

use crate::error::InterfaceError;
use crate::traits::{MeshDriver, RouteInstaller};

/// One recorded route-table operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOp {
    SetDefaultGate { gate: MacAddress, interface: String },
    ClearDefaultGate { interface: String },
    SetMeshPath { dst: MacAddress, next_hop: MacAddress },
    ClearMeshPath { dst: MacAddress },
}

/// A [`RouteInstaller`] that records operations and can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingRouteInstaller {
    ops: Mutex<Vec<RouteOp>>,
    failing: AtomicBool,
}

impl RecordingRouteInstaller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every recorded operation, in call order.
    pub fn ops(&self) -> Vec<RouteOp> {
        self.ops.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Make subsequent calls fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn record(&self, op: RouteOp) -> Result<(), InterfaceError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(InterfaceError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "injected route installer failure",
            )));
        }
        self.ops.lock().unwrap_or_else(|e| e.into_inner()).push(op);
        Ok(())
    }
}

impl RouteInstaller for RecordingRouteInstaller {
    fn set_default_gate(&self, gate: MacAddress, interface: &str) -> Result<(), InterfaceError> {
        self.record(RouteOp::SetDefaultGate {
            gate,
            interface: interface.to_string(),
        })
    }

    fn clear_default_gate(&self, interface: &str) -> Result<(), InterfaceError> {
        self.record(RouteOp::ClearDefaultGate {
            interface: interface.to_string(),
        })
    }

    fn set_mesh_path(&self, dst: MacAddress, next_hop: MacAddress) -> Result<(), InterfaceError> {
        self.record(RouteOp::SetMeshPath { dst, next_hop })
    }

    fn clear_mesh_path(&self, dst: MacAddress) -> Result<(), InterfaceError> {
        self.record(RouteOp::ClearMeshPath { dst })
    }
}

/// A [`MeshDriver`] that records every root-mode change.
#[derive(Debug, Default)]
pub struct RecordingDriver {
    modes: Mutex<Vec<u8>>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every root mode set so far, in call order.
    pub fn root_modes(&self) -> Vec<u8> {
        self.modes.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl MeshDriver for RecordingDriver {
    fn set_root_mode(&self, mode: u8) -> Result<(), InterfaceError> {
        self.modes.lock().unwrap_or_else(|e| e.into_inner()).push(mode);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac(last: u8) -> MacAddress {
        MacAddress::new([0x02, 0, 0, 0, 0, last])
    }

    #[test]
    fn installer_records_in_order() {
        let installer = RecordingRouteInstaller::new();
        installer.set_default_gate(mac(1), "mesh0").unwrap();
        installer.clear_default_gate("mesh0").unwrap();

        assert_eq!(
            installer.ops(),
            vec![
                RouteOp::SetDefaultGate {
                    gate: mac(1),
                    interface: "mesh0".to_string(),
                },
                RouteOp::ClearDefaultGate {
                    interface: "mesh0".to_string(),
                },
            ]
        );
    }

    #[test]
    fn installer_failure_injection() {
        let installer = RecordingRouteInstaller::new();
        installer.set_failing(true);
        assert!(installer.set_default_gate(mac(1), "mesh0").is_err());
        assert!(installer.ops().is_empty());

        installer.set_failing(false);
        assert!(installer.set_default_gate(mac(1), "mesh0").is_ok());
        assert_eq!(installer.ops().len(), 1);
    }

    #[test]
    fn driver_records_modes() {
        let driver = RecordingDriver::new();
        driver.set_root_mode(4).unwrap();
        driver.set_root_mode(0).unwrap();
        assert_eq!(driver.root_modes(), vec![4, 0]);
    }
}
