//! In-memory transport
//!
//! A `Transport` backed by crossbeam channels. The peer end plays the
//! server: it receives written commands and pushes response chunks, one
//! chunk per read. Dropping the peer is a clean end of stream.

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use super::{Dialer, Transport};

/// Counters shared between a channel transport and its peer
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TransportStats {
    /// Successful reads that returned data
    pub reads: usize,
    pub bytes_read: usize,
    pub writes: usize,
    pub closed: bool,
}

/// Client end of an in-memory connection
pub struct ChannelTransport {
    incoming: Receiver<Bytes>,
    outgoing: Sender<Bytes>,

    /// Remainder of a chunk larger than the last read buffer
    pending: Bytes,

    deadline: Option<Instant>,
    stats: Arc<Mutex<TransportStats>>,
}

/// Server end of an in-memory connection
pub struct ChannelPeer {
    to_client: Sender<Bytes>,
    from_client: Receiver<Bytes>,
    stats: Arc<Mutex<TransportStats>>,
}

/// Create a connected transport/peer pair
pub fn channel_pair() -> (ChannelTransport, ChannelPeer) {
    let (to_client, incoming) = channel::unbounded();
    let (outgoing, from_client) = channel::unbounded();
    let stats = Arc::new(Mutex::new(TransportStats::default()));

    let transport = ChannelTransport {
        incoming,
        outgoing,
        pending: Bytes::new(),
        deadline: None,
        stats: Arc::clone(&stats),
    };
    let peer = ChannelPeer {
        to_client,
        from_client,
        stats,
    };
    (transport, peer)
}

impl ChannelTransport {
    pub fn stats(&self) -> TransportStats {
        self.stats.lock().clone()
    }

    fn take_pending(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.pending.len());
        let chunk = self.pending.split_to(n);
        buf[..n].copy_from_slice(&chunk);

        let mut stats = self.stats.lock();
        stats.reads += 1;
        stats.bytes_read += n;
        n
    }
}

impl Transport for ChannelTransport {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.stats.lock().closed {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "transport closed"));
        }
        self.outgoing
            .send(Bytes::copy_from_slice(bytes))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "peer hung up"))?;
        self.stats.lock().writes += 1;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.stats.lock().closed {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "transport closed"));
        }
        if buf.is_empty() {
            return Ok(0);
        }

        while self.pending.is_empty() {
            let received = match self.deadline {
                Some(deadline) => self.incoming.recv_deadline(deadline),
                None => self.incoming.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok(chunk) => self.pending = chunk,
                Err(RecvTimeoutError::Timeout) => {
                    return Err(io::Error::new(io::ErrorKind::TimedOut, "read deadline exceeded"))
                }
                Err(RecvTimeoutError::Disconnected) => return Ok(0),
            }
        }

        Ok(self.take_pending(buf))
    }

    fn set_read_deadline(&mut self, deadline: Instant) -> io::Result<()> {
        self.deadline = Some(deadline);
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.stats.lock().closed = true;
        Ok(())
    }
}

impl ChannelPeer {
    /// Push one chunk to the client
    pub fn send(&self, bytes: impl Into<Bytes>) -> io::Result<()> {
        self.to_client
            .send(bytes.into())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "client hung up"))
    }

    /// Wait for the next command written by the client
    pub fn recv_command(&self, timeout: Duration) -> Option<Bytes> {
        self.from_client.recv_timeout(timeout).ok()
    }

    pub fn stats(&self) -> TransportStats {
        self.stats.lock().clone()
    }

    /// Whether the client end has been closed
    pub fn client_closed(&self) -> bool {
        self.stats.lock().closed
    }
}

/// Dialer handing each new connection's peer end to a `ChannelListener`
#[derive(Clone)]
pub struct ChannelDialer {
    accept_tx: Sender<ChannelPeer>,
}

/// Accepts peers of connections dialed through a `ChannelDialer`
pub struct ChannelListener {
    accept_rx: Receiver<ChannelPeer>,
}

impl ChannelDialer {
    pub fn bind() -> (ChannelDialer, ChannelListener) {
        let (accept_tx, accept_rx) = channel::unbounded();
        (ChannelDialer { accept_tx }, ChannelListener { accept_rx })
    }
}

impl Dialer for ChannelDialer {
    type Stream = ChannelTransport;

    fn dial(&self) -> io::Result<ChannelTransport> {
        let (transport, peer) = channel_pair();
        self.accept_tx
            .send(peer)
            .map_err(|_| io::Error::new(io::ErrorKind::ConnectionRefused, "listener dropped"))?;
        Ok(transport)
    }
}

impl ChannelListener {
    /// Wait for the next dialed connection
    pub fn accept(&self, timeout: Duration) -> Option<ChannelPeer> {
        self.accept_rx.recv_timeout(timeout).ok()
    }
}
