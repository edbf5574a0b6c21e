//! Transport Module
//!
//! Byte-stream connections to the server.
//!
//! ## Contract
//! - `Dialer::dial` opens one stream per logical request
//! - `Transport` exposes ordered writes, reads bounded by a deadline, and
//!   a close that must be called by whoever dialed
//! - Reads past the deadline fail with `WouldBlock` or `TimedOut`; a clean
//!   end of stream reads as `Ok(0)`
//!
//! The response assembler only sees this trait, so plain TCP, TLS and the
//! in-memory channel transport are interchangeable.

use std::io;
use std::time::Instant;

mod channel;
mod tcp;
#[cfg(feature = "tls")]
mod tls;
pub mod typed;

pub use channel::{channel_pair, ChannelDialer, ChannelListener, ChannelPeer, ChannelTransport, TransportStats};
pub use tcp::{ShutdownHandle, TcpDialer, TcpTransport};
#[cfg(feature = "tls")]
pub use tls::{TlsDialer, TlsTransport};

/// An open, bidirectional, ordered byte stream
pub trait Transport {
    /// Write the whole buffer
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Read whatever is available, up to `buf.len()` bytes
    ///
    /// Returns `Ok(0)` on a clean end of stream.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Fail reads that have not completed by `deadline`
    fn set_read_deadline(&mut self, deadline: Instant) -> io::Result<()>;

    /// Close the stream; further reads and writes fail
    fn close(&mut self) -> io::Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write_all(bytes)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn set_read_deadline(&mut self, deadline: Instant) -> io::Result<()> {
        (**self).set_read_deadline(deadline)
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

/// Opens transports to one endpoint
pub trait Dialer {
    type Stream: Transport;

    fn dial(&self) -> io::Result<Self::Stream>;
}

/// Whether an I/O error means a read deadline expired
pub fn is_timeout(err: &io::Error) -> bool {
    matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}
