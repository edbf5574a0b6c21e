//! TLS transport
//!
//! TCP wrapped in rustls, trusting exactly the certificates given to the
//! dialer (typically the server's own self-signed certificate).

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};
use rustls_pki_types::pem::PemObject;
use rustls_pki_types::{CertificateDer, ServerName};

use super::tcp::{connect_any, set_socket_deadline};
use super::{Dialer, Transport};
use crate::error::{ClientError, Result};

/// A TLS connection to the server
pub struct TlsTransport {
    stream: StreamOwned<ClientConnection, TcpStream>,
}

impl Transport for TlsTransport {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stream.write_all(bytes)?;
        self.stream.flush()
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }

    fn set_read_deadline(&mut self, deadline: Instant) -> io::Result<()> {
        set_socket_deadline(&self.stream.sock, deadline)
    }

    fn close(&mut self) -> io::Result<()> {
        self.stream.conn.send_close_notify();
        if let Err(e) = self.stream.flush() {
            tracing::debug!("Failed to flush close_notify: {}", e);
        }
        match self.stream.sock.shutdown(Shutdown::Both) {
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}

/// Dials TLS connections to a fixed endpoint
#[derive(Clone)]
pub struct TlsDialer {
    addr: String,
    server_name: ServerName<'static>,
    config: Arc<ClientConfig>,
    connect_timeout: Duration,
}

impl TlsDialer {
    /// Build a dialer trusting the PEM certificates in `pem`
    pub fn new(
        addr: impl Into<String>,
        server_name: &str,
        pem: &[u8],
        connect_timeout: Duration,
    ) -> Result<Self> {
        let mut roots = RootCertStore::empty();
        for cert in CertificateDer::pem_slice_iter(pem) {
            let cert = cert.map_err(|e| ClientError::Config(format!("invalid certificate: {}", e)))?;
            roots
                .add(cert)
                .map_err(|e| ClientError::Config(format!("failed to trust certificate: {}", e)))?;
        }
        if roots.is_empty() {
            return Err(ClientError::Config("no certificate found in trust material".to_string()));
        }

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| ClientError::Config(format!("TLS setup failed: {}", e)))?
            .with_root_certificates(roots)
            .with_no_client_auth();

        let server_name = ServerName::try_from(server_name.to_string())
            .map_err(|e| ClientError::Config(format!("invalid server name: {}", e)))?;

        Ok(Self {
            addr: addr.into(),
            server_name,
            config: Arc::new(config),
            connect_timeout,
        })
    }

    /// Build a dialer trusting the certificate file at `path`
    pub fn from_pem_file(
        addr: impl Into<String>,
        server_name: &str,
        path: &Path,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let pem = std::fs::read(path).map_err(|e| {
            ClientError::Config(format!("failed to read certificate {}: {}", path.display(), e))
        })?;
        Self::new(addr, server_name, &pem, connect_timeout)
    }
}

impl Dialer for TlsDialer {
    type Stream = TlsTransport;

    /// Connect and finish the handshake before handing the stream over.
    ///
    /// The handshake shares the connect timeout, so a server that accepts
    /// TCP but never answers the ClientHello fails here as a timeout.
    fn dial(&self) -> io::Result<TlsTransport> {
        let mut sock = connect_any(&self.addr, self.connect_timeout)?;
        sock.set_nodelay(true)?;

        let mut conn = ClientConnection::new(Arc::clone(&self.config), self.server_name.clone())
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

        let deadline = Instant::now() + self.connect_timeout;
        while conn.is_handshaking() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(io::Error::new(io::ErrorKind::TimedOut, "TLS handshake timed out"));
            }
            sock.set_read_timeout(Some(remaining))?;
            sock.set_write_timeout(Some(remaining))?;

            if let Err(e) = conn.complete_io(&mut sock) {
                tracing::debug!("TLS handshake with {} failed: {}", self.addr, e);
                return Err(e);
            }
        }

        // Command writes stay bounded by the same budget
        sock.set_write_timeout(Some(self.connect_timeout))?;

        Ok(TlsTransport {
            stream: StreamOwned::new(conn, sock),
        })
    }
}
