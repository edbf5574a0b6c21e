//! Configuration for the client
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ClientError, Result};

/// Main configuration for a client instance
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // -------------------------------------------------------------------------
    // Connection Configuration
    // -------------------------------------------------------------------------
    /// Server address (host:port)
    pub endpoint: String,

    /// Name the server certificate is issued for (TLS only)
    pub server_name: String,

    /// PEM certificate to trust (TLS only)
    pub trust_cert: Option<PathBuf>,

    /// Connect timeout (milliseconds)
    pub connect_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Response Assembly Configuration
    // -------------------------------------------------------------------------
    /// Deadline for the first complete response, measured from the moment
    /// the command was sent (milliseconds)
    pub response_timeout_ms: u64,

    /// Window granted after every partial read (milliseconds)
    pub rolling_timeout_ms: u64,

    /// Hard ceiling on one response, however steadily it trickles in
    /// (milliseconds)
    pub max_total_timeout_ms: u64,

    /// Bytes requested from the transport per read
    pub read_chunk_size: usize,

    /// Upper bound on the accumulated response size
    pub max_response_bytes: usize,

    // -------------------------------------------------------------------------
    // Decode Configuration
    // -------------------------------------------------------------------------
    /// Unit RFC3339 timestamps are normalized to
    pub timestamp_unit: TimestampUnit,
}

/// Integer epoch unit used for textual timestamps
///
/// Integer timestamps from the wire are kept as sent; only RFC3339 text is
/// converted, using this unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampUnit {
    #[default]
    Seconds,
    Nanoseconds,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "127.0.0.1:9443".to_string(),
            server_name: "localhost".to_string(),
            trust_cert: None,
            connect_timeout_ms: 5000,
            response_timeout_ms: 10_000,
            rolling_timeout_ms: 2000,
            max_total_timeout_ms: 30_000,
            read_chunk_size: 4096,
            max_response_bytes: 64 * 1024 * 1024, // 64 MB
            timestamp_unit: TimestampUnit::Seconds,
        }
    }
}

impl ClientConfig {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn rolling_timeout(&self) -> Duration {
        Duration::from_millis(self.rolling_timeout_ms)
    }

    pub fn max_total_timeout(&self) -> Duration {
        Duration::from_millis(self.max_total_timeout_ms)
    }

    /// Check that the settings can drive a request
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.is_empty() {
            return Err(ClientError::Config("endpoint must not be empty".to_string()));
        }
        if self.connect_timeout_ms == 0 || self.response_timeout_ms == 0 || self.rolling_timeout_ms == 0 {
            return Err(ClientError::Config(
                "connect, response and rolling timeouts must be non-zero".to_string(),
            ));
        }
        if self.rolling_timeout_ms > self.response_timeout_ms {
            return Err(ClientError::Config(format!(
                "rolling timeout ({}ms) must not exceed the response timeout ({}ms)",
                self.rolling_timeout_ms, self.response_timeout_ms
            )));
        }
        if self.max_total_timeout_ms < self.response_timeout_ms {
            return Err(ClientError::Config(format!(
                "total timeout ({}ms) must not be shorter than the response timeout ({}ms)",
                self.max_total_timeout_ms, self.response_timeout_ms
            )));
        }
        if self.read_chunk_size == 0 {
            return Err(ClientError::Config("read chunk size must be non-zero".to_string()));
        }
        if self.max_response_bytes < self.read_chunk_size {
            return Err(ClientError::Config(format!(
                "max response size ({}) is smaller than one read chunk ({})",
                self.max_response_bytes, self.read_chunk_size
            )));
        }
        Ok(())
    }
}

/// Builder for ClientConfig
#[derive(Default)]
pub struct ConfigBuilder {
    config: ClientConfig,
}

impl ConfigBuilder {
    /// Set the server address (host:port)
    pub fn endpoint(mut self, addr: impl Into<String>) -> Self {
        self.config.endpoint = addr.into();
        self
    }

    /// Set the TLS server name
    pub fn server_name(mut self, name: impl Into<String>) -> Self {
        self.config.server_name = name.into();
        self
    }

    /// Trust the PEM certificate at this path
    pub fn trust_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.trust_cert = Some(path.into());
        self
    }

    /// Set the connect timeout (in milliseconds)
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    /// Set the overall response deadline (in milliseconds)
    pub fn response_timeout_ms(mut self, ms: u64) -> Self {
        self.config.response_timeout_ms = ms;
        self
    }

    /// Set the rolling deadline applied after each partial read (in milliseconds)
    pub fn rolling_timeout_ms(mut self, ms: u64) -> Self {
        self.config.rolling_timeout_ms = ms;
        self
    }

    /// Set the hard ceiling on one response (in milliseconds)
    pub fn max_total_timeout_ms(mut self, ms: u64) -> Self {
        self.config.max_total_timeout_ms = ms;
        self
    }

    /// Set the per-read chunk size (in bytes)
    pub fn read_chunk_size(mut self, size: usize) -> Self {
        self.config.read_chunk_size = size;
        self
    }

    /// Set the response size cap (in bytes)
    pub fn max_response_bytes(mut self, size: usize) -> Self {
        self.config.max_response_bytes = size;
        self
    }

    /// Set the unit RFC3339 timestamps are converted to
    pub fn timestamp_unit(mut self, unit: TimestampUnit) -> Self {
        self.config.timestamp_unit = unit;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}
