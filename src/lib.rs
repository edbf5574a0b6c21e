//! # litetable-client
//!
//! Client library for a column-family key-value store:
//! - Text commands over plain TCP or TLS, or structured calls over a typed RPC transport
//! - Response assembly on an unframed stream (complete = parses as one JSON value)
//! - Multi-version rows: family → qualifier → timestamped values, newest first
//! - Tolerant of historical value/timestamp encodings
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Caller (CLI, dashboard, ...)                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ ReadRequest / WriteRequest / ...
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                   Command Encoder                            │
//! │          (text line  |  typed RpcCall)                       │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  Transport  │          │ RowService  │
//!   │ (TCP / TLS) │          │   (typed)   │
//!   └──────┬──────┘          └──────┬──────┘
//!          ▼                        │
//!   ┌─────────────┐                 │
//!   │  Response   │                 │
//!   │  Assembler  │                 │
//!   └──────┬──────┘                 │
//!          └────────────┬───────────┘
//!                       ▼
//!                ┌─────────────┐
//!                │ Row Decoder │ ──▶ Row / ResultSet
//!                └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod transport;
pub mod row;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ClientError, Phase, Result};
pub use config::{ClientConfig, TimestampUnit};
pub use client::{Client, RowStore, RpcClient};
pub use row::{ReadResult, ResultSet, Row, TimestampedValue};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of the client
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
