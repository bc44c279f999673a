//! Error types for the daemon orchestrator.

use meshd_interfaces::InterfaceError;

/// Errors that can occur while assembling or running the daemon.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("interface error: {0}")]
    Interface(#[from] InterfaceError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("routing actor is gone")]
    RoutingGone,
}
