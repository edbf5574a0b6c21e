//! Typed remote-call transport
//!
//! Some deployments expose the store through a typed RPC service instead of
//! the text protocol. Requests go in as structured calls and rows come back
//! as structured values; no response assembly is needed.

use std::collections::BTreeMap;

use crate::error::Result;

/// Query type of a typed read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcQueryType {
    Exact,
    Prefix,
    Regex,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadCall {
    pub row_key: String,
    pub query_type: RpcQueryType,
    /// Empty means every family
    pub family: String,
    pub qualifiers: Vec<String>,
    /// Zero means every version
    pub latest: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteCell {
    pub name: String,
    pub value: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteCall {
    pub row_key: String,
    pub family: String,
    pub qualifiers: Vec<WriteCell>,
    /// Zero means no expiry
    pub ttl: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteCall {
    pub row_key: String,
    pub family: String,
    pub qualifiers: Vec<String>,
    /// Zero means no lower bound
    pub timestamp_unix: i64,
    pub ttl: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateFamilyCall {
    pub families: Vec<String>,
}

/// A structured call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcCall {
    Read(ReadCall),
    Write(WriteCall),
    Delete(DeleteCall),
    CreateFamily(CreateFamilyCall),
}

/// Timestamp of a typed value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcTimestamp {
    Unix(i64),
    Rfc3339(String),
}

/// One version of a cell as returned by the service; the payload is
/// already raw bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcValue {
    pub value: Vec<u8>,
    pub timestamp: RpcTimestamp,
}

/// family → qualifier → versions (newest first)
pub type RpcColumns = BTreeMap<String, BTreeMap<String, Vec<RpcValue>>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RpcRow {
    pub cols: RpcColumns,
}

/// Result of a call: matching rows keyed by row key
///
/// A service reporting "row not found" answers with an empty reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RpcReply {
    pub rows: BTreeMap<String, RpcRow>,
}

/// A typed connection to the store
pub trait RowService {
    /// Issue one call and wait for its result
    fn call(&mut self, call: &RpcCall) -> Result<RpcReply>;

    /// Release the connection
    fn close(&mut self) -> Result<()>;
}
