//! WAN reachability probes.
//!
//! A probe is a TCP connect bound to the monitored (upstream) interface so
//! the kernel cannot satisfy it over the mesh, raced against a timeout.
//! Binding uses `SO_BINDTODEVICE`, which needs `CAP_NET_RAW`; an empty
//! interface name skips the binding for unprivileged use.

use std::net::SocketAddr;
use std::time::Duration;

use socket2::{Domain, Socket, Type};

/// Attempt one TCP connect to `addr`, bound to `interface`, within
/// `timeout`.
pub async fn connect_bound(
    interface: &str,
    addr: SocketAddr,
    timeout: Duration,
) -> std::io::Result<()> {
    let domain = match addr {
        SocketAddr::V4(_) => Domain::IPV4,
        SocketAddr::V6(_) => Domain::IPV6,
    };
    let socket = Socket::new(domain, Type::STREAM, None)?;
    if !interface.is_empty() {
        bind_to_device(&socket, interface)?;
    }
    socket.set_nonblocking(true)?;

    let socket = tokio::net::TcpSocket::from_std_stream(socket.into());
    match tokio::time::timeout(timeout, socket.connect(addr)).await {
        Ok(Ok(_stream)) => Ok(()),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "connect timed out",
        )),
    }
}

#[cfg(target_os = "linux")]
fn bind_to_device(socket: &Socket, interface: &str) -> std::io::Result<()> {
    socket.bind_device(Some(interface.as_bytes()))
}

#[cfg(not(target_os = "linux"))]
fn bind_to_device(_socket: &Socket, interface: &str) -> std::io::Result<()> {
    tracing::warn!(interface, "SO_BINDTODEVICE unsupported on this platform");
    Ok(())
}

/// Probe the monitored addresses once; the first successful connect wins.
pub async fn probe_any(
    interface: &str,
    addresses: &[SocketAddr],
    timeout: Duration,
) -> bool {
    for &addr in addresses {
        match connect_bound(interface, addr, timeout).await {
            Ok(()) => {
                tracing::debug!(%addr, "probe connect succeeded");
                return true;
            }
            Err(e) => {
                tracing::debug!(%addr, "probe connect failed: {e}");
            }
        }
    }
    false
}
