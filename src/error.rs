//! Error types for the client
//!
//! One error type covers every failure a request can hit. Variants are
//! grouped by where the failure happened so callers can decide on retries
//! without string matching.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;

/// Result type alias using ClientError
pub type Result<T> = std::result::Result<T, ClientError>;

/// Stage of a request at which a transport failure occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Connect,
    Write,
    Read,
    Close,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Connect => "connect",
            Phase::Write => "write",
            Phase::Read => "read",
            Phase::Close => "close",
        };
        f.write_str(name)
    }
}

/// Unified error type for client operations
#[derive(Debug, Error)]
pub enum ClientError {
    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    #[error("transport error during {phase}: {source}")]
    Transport {
        phase: Phase,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Assembly Errors
    // -------------------------------------------------------------------------
    #[error("timed out after {elapsed:?} waiting for a complete response ({received} bytes received)")]
    Timeout { elapsed: Duration, received: usize },

    #[error("incomplete response: connection closed after {} bytes", raw.len())]
    Incomplete { raw: Bytes },

    #[error("response exceeded {limit} bytes without completing")]
    ResponseTooLarge { limit: usize, raw: Bytes },

    // -------------------------------------------------------------------------
    // Decode Errors
    // -------------------------------------------------------------------------
    #[error("failed to decode response: {reason}")]
    Decode { reason: String, raw: Bytes },

    // -------------------------------------------------------------------------
    // Request / Server Errors
    // -------------------------------------------------------------------------
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("server error: {0}")]
    Server(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Wrap an I/O error with the phase it happened in
    pub fn transport(phase: Phase, source: std::io::Error) -> Self {
        ClientError::Transport { phase, source }
    }

    /// Build a decode error carrying the raw response bytes
    pub fn decode(reason: impl Into<String>, raw: impl Into<Bytes>) -> Self {
        ClientError::Decode {
            reason: reason.into(),
            raw: raw.into(),
        }
    }

    /// Whether a caller may reasonably retry the request.
    ///
    /// Timeouts and failures to connect are retryable; a stream that closed
    /// mid-response or a malformed response is not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::Timeout { .. }
                | ClientError::Transport {
                    phase: Phase::Connect,
                    ..
                }
        )
    }

    /// Raw bytes received before the failure, if any were kept
    pub fn raw_response(&self) -> Option<&[u8]> {
        match self {
            ClientError::Incomplete { raw }
            | ClientError::ResponseTooLarge { raw, .. }
            | ClientError::Decode { raw, .. } => Some(&raw[..]),
            _ => None,
        }
    }
}
