//! Response assembler
//!
//! The server writes one JSON value per response with no length prefix or
//! delimiter. The assembler reads until the accumulated bytes parse as one
//! complete value, then stops reading.
//!
//! ## States
//! ```text
//!                ┌── parses ─────────▶ Complete
//!                ├── deadline passes ─▶ TimedOut
//! Accumulating ──┼── end of stream ───▶ TransportClosed
//!                └── byte cap passed ─▶ TooLarge
//! ```
//!
//! The first deadline is the overall response timeout counted from when the
//! command was sent. Each partial read that does not complete the value
//! moves the deadline to `now + rolling_timeout`, but never past
//! `sent_at + max_total`.
//!
//! ## Known limitations
//! - A bare scalar (`"OK"`, `42`) completes on the first read that parses,
//!   so a number split across reads (`12` then `3`) completes early.
//! - A response is complete as soon as a prefix parses; a server that sends
//!   a value followed by more data for the same response is misread.

use std::io;
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use serde::de::IgnoredAny;

use crate::config::ClientConfig;
use crate::error::{ClientError, Phase, Result};
use crate::transport::{is_timeout, Transport};

/// Assembler states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyState {
    Accumulating,
    Complete,
    TimedOut,
    TransportClosed,
    TooLarge,
}

/// Deadlines and limits for one assembly
#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    /// Deadline for the whole response, from the moment the command was sent
    pub response_timeout: Duration,

    /// Deadline granted after each partial read
    pub rolling_timeout: Duration,

    /// Hard ceiling from the moment the command was sent; rolling
    /// extensions never reach past it
    pub max_total: Duration,

    /// Bytes requested per read
    pub read_chunk_size: usize,

    /// Give up once this many bytes accumulate without completing
    pub max_response_bytes: usize,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        AssemblerConfig::from(&ClientConfig::default())
    }
}

impl From<&ClientConfig> for AssemblerConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            response_timeout: config.response_timeout(),
            rolling_timeout: config.rolling_timeout(),
            max_total: config.max_total_timeout(),
            read_chunk_size: config.read_chunk_size,
            max_response_bytes: config.max_response_bytes,
        }
    }
}

/// A complete response
#[derive(Debug, Clone)]
pub struct AssembledResponse {
    pub bytes: Bytes,

    /// Reads that returned data
    pub reads: usize,

    /// Time from sending the command to completion
    pub elapsed: Duration,
}

/// Collects one response from an unframed stream
///
/// An assembler serves exactly one request; `assemble` consumes it.
pub struct ResponseAssembler {
    config: AssemblerConfig,
    buffer: BytesMut,
    probe: CompletionProbe,
    state: AssemblyState,
    reads: usize,
    sent_at: Instant,
    deadline: Instant,
    hard_deadline: Instant,
}

impl ResponseAssembler {
    /// Create an assembler for a command sent at `sent_at`
    pub fn new(config: AssemblerConfig, sent_at: Instant) -> Self {
        let hard_deadline = sent_at + config.max_total.max(config.response_timeout);
        let deadline = sent_at + config.response_timeout;
        Self {
            buffer: BytesMut::with_capacity(config.read_chunk_size),
            config,
            probe: CompletionProbe::default(),
            state: AssemblyState::Accumulating,
            reads: 0,
            sent_at,
            deadline,
            hard_deadline,
        }
    }

    pub fn state(&self) -> AssemblyState {
        self.state
    }

    /// Reads fed so far
    pub fn reads(&self) -> usize {
        self.reads
    }

    /// Bytes accumulated so far
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Current read deadline
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Feed the bytes of one read. Returns `true` once the buffer holds a
    /// complete value.
    ///
    /// Bytes pushed once the assembler has left `Accumulating` are ignored.
    pub fn push(&mut self, chunk: &[u8]) -> Result<bool> {
        if self.state != AssemblyState::Accumulating {
            return Ok(self.state == AssemblyState::Complete);
        }

        self.reads += 1;
        self.buffer.extend_from_slice(chunk);

        if self.probe.is_complete(&self.buffer) {
            self.state = AssemblyState::Complete;
            tracing::trace!(
                reads = self.reads,
                bytes = self.buffer.len(),
                "response complete"
            );
            return Ok(true);
        }

        if self.buffer.len() > self.config.max_response_bytes {
            self.state = AssemblyState::TooLarge;
            return Err(ClientError::ResponseTooLarge {
                limit: self.config.max_response_bytes,
                raw: self.buffer.split().freeze(),
            });
        }

        tracing::trace!(
            chunk = chunk.len(),
            total = self.buffer.len(),
            "partial response, waiting for more"
        );
        Ok(false)
    }

    /// Read from `transport` until the response is complete, the deadline
    /// passes, or the stream ends.
    pub fn assemble<T: Transport + ?Sized>(mut self, transport: &mut T) -> Result<AssembledResponse> {
        let mut chunk = vec![0u8; self.config.read_chunk_size];

        transport
            .set_read_deadline(self.deadline)
            .map_err(|e| ClientError::transport(Phase::Read, e))?;

        loop {
            if Instant::now() >= self.deadline {
                return Err(self.timed_out());
            }

            let n = match transport.read(&mut chunk) {
                Ok(0) => return Err(self.closed()),
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if is_timeout(&e) => return Err(self.timed_out()),
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Err(self.closed()),
                Err(e) => return Err(ClientError::transport(Phase::Read, e)),
            };

            if self.push(&chunk[..n])? {
                return Ok(AssembledResponse {
                    elapsed: self.sent_at.elapsed(),
                    reads: self.reads,
                    bytes: self.buffer.freeze(),
                });
            }

            self.deadline = (Instant::now() + self.config.rolling_timeout).min(self.hard_deadline);
            transport
                .set_read_deadline(self.deadline)
                .map_err(|e| ClientError::transport(Phase::Read, e))?;
        }
    }

    fn timed_out(&mut self) -> ClientError {
        self.state = AssemblyState::TimedOut;
        tracing::debug!(
            received = self.buffer.len(),
            reads = self.reads,
            "response deadline passed"
        );
        ClientError::Timeout {
            elapsed: self.sent_at.elapsed(),
            received: self.buffer.len(),
        }
    }

    fn closed(&mut self) -> ClientError {
        self.state = AssemblyState::TransportClosed;
        tracing::debug!(
            received = self.buffer.len(),
            reads = self.reads,
            "stream closed before response completed"
        );
        ClientError::Incomplete {
            raw: self.buffer.split().freeze(),
        }
    }
}

// =============================================================================
// Completion Probe
// =============================================================================

/// Decides whether a buffer holds one complete JSON value.
///
/// For objects and arrays it tracks nesting over newly appended bytes only
/// and runs the trial parse when the outermost container closes. Anything
/// else (scalars, malformed input) falls back to a trial parse per push.
#[derive(Debug, Default)]
struct CompletionProbe {
    scanned: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
    started: bool,
    fallback: bool,
}

impl CompletionProbe {
    fn is_complete(&mut self, buf: &[u8]) -> bool {
        if !self.fallback && !self.scan(buf) {
            return false;
        }

        let complete = serde_json::from_slice::<IgnoredAny>(buf).is_ok();
        if !complete && self.depth == 0 {
            self.fallback = true;
        }
        complete
    }

    /// Scan bytes not seen before; true if the outermost container closed
    /// or structural tracking gave up
    fn scan(&mut self, buf: &[u8]) -> bool {
        let mut closed_top = false;
        let start = self.scanned;
        self.scanned = buf.len();

        for &b in &buf[start..] {
            if !self.started {
                if b.is_ascii_whitespace() {
                    continue;
                }
                self.started = true;
                if b == b'{' || b == b'[' {
                    self.depth = 1;
                    continue;
                }
                self.fallback = true;
                return true;
            }

            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if b == b'\\' {
                    self.escaped = true;
                } else if b == b'"' {
                    self.in_string = false;
                }
                continue;
            }

            match b {
                b'"' => self.in_string = true,
                b'{' | b'[' => self.depth += 1,
                b'}' | b']' => {
                    if self.depth == 0 {
                        self.fallback = true;
                        return true;
                    }
                    self.depth -= 1;
                    if self.depth == 0 {
                        closed_top = true;
                    }
                }
                _ => {}
            }
        }

        closed_top
    }
}
