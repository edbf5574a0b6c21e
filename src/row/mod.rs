//! Row Module
//!
//! In-memory representation of rows returned by the server.
//!
//! ## Shape
//! ```text
//! Row
//!  ├── key
//!  └── families: family → qualifier → [TimestampedValue] (newest first)
//! ```
//!
//! Version lists keep the order the server sent them in; nothing here
//! re-sorts. Payloads are raw bytes, decoded from their wire form once in
//! [`decode`].

use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::protocol::QueryMode;

pub mod decode;
mod display;

pub use decode::{
    decode_response, decode_result_set, decode_row, decode_rpc_reply, DecodeOptions,
};
pub use display::display_value;

/// One historical version of a cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampedValue {
    /// Stored value, raw bytes
    pub payload: Vec<u8>,

    /// Integer epoch; see [`TimestampUnit`](crate::config::TimestampUnit)
    pub timestamp: i64,
}

impl TimestampedValue {
    pub fn new(payload: impl Into<Vec<u8>>, timestamp: i64) -> Self {
        Self {
            payload: payload.into(),
            timestamp,
        }
    }

    /// Payload as text, replacing invalid UTF-8
    pub fn as_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// qualifier → versions, newest first
pub type Qualifiers = BTreeMap<String, Vec<TimestampedValue>>;

/// family → qualifiers
pub type Families = BTreeMap<String, Qualifiers>;

/// Rows of a multi-row query, keyed by row key
pub type ResultSet = BTreeMap<String, Row>;

/// One addressable record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    pub key: String,
    pub families: Families,
}

impl Row {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            families: Families::new(),
        }
    }

    /// Whether the row carries no families at all
    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    pub fn family(&self, family: &str) -> Option<&Qualifiers> {
        self.families.get(family)
    }

    /// All versions of one cell, newest first
    pub fn versions(&self, family: &str, qualifier: &str) -> Option<&[TimestampedValue]> {
        self.families
            .get(family)
            .and_then(|q| q.get(qualifier))
            .map(Vec::as_slice)
    }

    /// The newest version of one cell
    pub fn latest(&self, family: &str, qualifier: &str) -> Option<&TimestampedValue> {
        self.versions(family, qualifier).and_then(|v| v.first())
    }

    /// Append a version after any already present for the cell
    pub fn push_version(&mut self, family: &str, qualifier: &str, value: TimestampedValue) {
        self.families
            .entry(family.to_string())
            .or_default()
            .entry(qualifier.to_string())
            .or_default()
            .push(value);
    }

    /// Ensure a family exists, even with no qualifiers
    pub fn ensure_family(&mut self, family: &str) -> &mut Qualifiers {
        self.families.entry(family.to_string()).or_default()
    }

    /// Total number of versions across every cell
    pub fn version_count(&self) -> usize {
        self.families
            .values()
            .flat_map(|q| q.values())
            .map(Vec::len)
            .sum()
    }
}

/// Envelope a response is expected to arrive in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// One row object
    SingleRow,

    /// An object mapping row key → row object
    MultiRow,
}

impl From<QueryMode> for ResponseShape {
    fn from(mode: QueryMode) -> Self {
        match mode {
            QueryMode::Exact => ResponseShape::SingleRow,
            QueryMode::Prefix | QueryMode::Regex => ResponseShape::MultiRow,
        }
    }
}

/// Outcome of a read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadResult {
    /// Exact-key read hit
    Row(Row),

    /// Prefix or regex read; may be empty
    Rows(ResultSet),

    /// Exact-key read matched nothing
    NotFound,
}

impl ReadResult {
    /// Number of rows returned
    pub fn len(&self) -> usize {
        match self {
            ReadResult::Row(_) => 1,
            ReadResult::Rows(rows) => rows.len(),
            ReadResult::NotFound => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over the returned rows
    pub fn rows(&self) -> Box<dyn Iterator<Item = &Row> + '_> {
        match self {
            ReadResult::Row(row) => Box::new(std::iter::once(row)),
            ReadResult::Rows(rows) => Box::new(rows.values()),
            ReadResult::NotFound => Box::new(std::iter::empty()),
        }
    }
}
