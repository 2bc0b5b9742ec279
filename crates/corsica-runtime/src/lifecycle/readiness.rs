//! Readiness checks for backgrounded servers.
//!
//! A detached server is considered ready once it accepts TCP connections on
//! its configured port. The check sits behind [`ReadinessProbe`] so tests and
//! embedders can substitute other signals.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, TcpStream};
use std::time::Duration;

use super::error::LifecycleError;

const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);

/// Decides whether a freshly launched server can accept work.
pub trait ReadinessProbe {
    /// Returns `Ok(true)` once the server is ready.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Probe`] when the check itself fails rather
    /// than reporting "not yet".
    fn is_ready(&self) -> Result<bool, LifecycleError>;

    /// Human-readable description used in diagnostics.
    fn describe(&self) -> String;
}

/// Probes `127.0.0.1:<port>` with a short connect timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpPortProbe {
    address: SocketAddr,
}

impl TcpPortProbe {
    /// Probes the loopback interface on `port`.
    #[must_use]
    pub const fn new(port: u16) -> Self {
        Self {
            address: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, port)),
        }
    }

    /// Address being probed.
    #[must_use]
    pub const fn address(&self) -> SocketAddr {
        self.address
    }
}

impl ReadinessProbe for TcpPortProbe {
    fn is_ready(&self) -> Result<bool, LifecycleError> {
        match TcpStream::connect_timeout(&self.address, CONNECT_TIMEOUT) {
            Ok(_) => Ok(true),
            Err(error) if is_not_listening(&error) => Ok(false),
            Err(source) => Err(LifecycleError::Probe {
                probe: self.describe(),
                source,
            }),
        }
    }

    fn describe(&self) -> String {
        format!("tcp {}", self.address)
    }
}

/// Errors meaning "nothing accepts connections yet", as opposed to probe failures.
fn is_not_listening(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::TimedOut
            | io::ErrorKind::AddrNotAvailable
    )
}
