//! Interface error types.

/// Errors from transport and kernel-adapter operations.
#[derive(Debug, thiserror::Error)]
pub enum InterfaceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown network interface: {0}")]
    UnknownInterface(String),

    #[error("transport not started")]
    NotStarted,

    #[error("transport channel closed")]
    ChannelClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats() {
        let err = InterfaceError::UnknownInterface("mesh0".to_string());
        assert_eq!(err.to_string(), "unknown network interface: mesh0");

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: InterfaceError = io.into();
        assert!(err.to_string().starts_with("I/O error"));
    }
}
