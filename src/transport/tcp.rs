//! Plain TCP transport
//!
//! Wraps a `TcpStream` with deadline-based reads.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use super::{Dialer, Transport};

/// Smallest timeout handed to the socket; zero would disable the timeout
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// A TCP connection to the server
pub struct TcpTransport {
    stream: TcpStream,

    /// Peer address for logging
    peer_addr: String,
}

impl TcpTransport {
    /// Wrap an already connected stream
    pub fn new(stream: TcpStream) -> io::Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        Ok(Self { stream, peer_addr })
    }

    /// Connect to `addr`, trying each resolved address in turn
    pub fn connect(addr: &str, timeout: Duration) -> io::Result<Self> {
        let stream = connect_any(addr, timeout)?;
        Self::new(stream)
    }

    /// Handle that shuts the socket down from another thread, failing any
    /// read blocked on it
    pub fn shutdown_handle(&self) -> io::Result<ShutdownHandle> {
        Ok(ShutdownHandle {
            stream: self.stream.try_clone()?,
        })
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

impl Transport for TcpTransport {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stream.write_all(bytes)?;
        self.stream.flush()
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }

    fn set_read_deadline(&mut self, deadline: Instant) -> io::Result<()> {
        set_socket_deadline(&self.stream, deadline)
    }

    fn close(&mut self) -> io::Result<()> {
        tracing::trace!("Closing connection to {}", self.peer_addr);
        match self.stream.shutdown(Shutdown::Both) {
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}

/// Closes a TCP transport out-of-band
pub struct ShutdownHandle {
    stream: TcpStream,
}

impl ShutdownHandle {
    pub fn shutdown(&self) -> io::Result<()> {
        match self.stream.shutdown(Shutdown::Both) {
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}

/// Dials plain TCP connections to a fixed endpoint
#[derive(Debug, Clone)]
pub struct TcpDialer {
    addr: String,
    connect_timeout: Duration,
}

impl TcpDialer {
    pub fn new(addr: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            connect_timeout,
        }
    }
}

impl Dialer for TcpDialer {
    type Stream = TcpTransport;

    fn dial(&self) -> io::Result<TcpTransport> {
        TcpTransport::connect(&self.addr, self.connect_timeout)
    }
}

/// Connect to the first reachable address `addr` resolves to
pub(crate) fn connect_any(addr: &str, timeout: Duration) -> io::Result<TcpStream> {
    let addrs: Vec<SocketAddr> = addr.to_socket_addrs()?.collect();
    let mut last_err = None;

    for candidate in addrs {
        match TcpStream::connect_timeout(&candidate, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                tracing::debug!("Connect to {} failed: {}", candidate, e);
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} did not resolve to any address", addr),
        )
    }))
}

/// Translate an absolute deadline into the socket's relative read timeout
pub(crate) fn set_socket_deadline(stream: &TcpStream, deadline: Instant) -> io::Result<()> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    stream.set_read_timeout(Some(remaining.max(MIN_READ_TIMEOUT)))
}
