//! Row decoder
//!
//! Turns an assembled response (or a typed reply) into rows.
//!
//! ## Wire Format
//! ```text
//! single row: {"key": "k", "cols": {family: {qualifier: [cell, ...]}}}
//! multi row:  {"k1": <single row>, "k2": <single row>, ...}
//! ```
//!
//! A cell has appeared in two shapes across server versions:
//! ```text
//! {"value": <base64>, "timestamp": 1700000000}                 integer epoch
//! {"value": <base64>, "timestamp": "2023-11-14T22:13:20Z"}     RFC3339 text
//! ```
//! Older servers also name the integer field `timestamp_unix`. Typed
//! replies carry raw bytes instead of base64. Every shape is normalized by
//! [`normalize`] into one `TimestampedValue`.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;
use chrono::DateTime;
use serde::Deserialize;

use super::{ReadResult, ResponseShape, ResultSet, Row, TimestampedValue};
use crate::config::TimestampUnit;
use crate::error::{ClientError, Result};
use crate::transport::typed::{RpcReply, RpcRow, RpcTimestamp, RpcValue};

/// Knobs for decoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    pub timestamp_unit: TimestampUnit,
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct WireRow {
    #[serde(default)]
    key: Option<String>,

    #[serde(default)]
    cols: Option<BTreeMap<String, Option<BTreeMap<String, Option<Vec<WireCell>>>>>>,
}

#[derive(Debug, Deserialize)]
struct WireCell {
    #[serde(default)]
    value: Option<String>,

    #[serde(default)]
    timestamp: Option<serde_json::Value>,

    #[serde(default)]
    timestamp_unix: Option<i64>,
}

/// Payload as it appeared on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
enum WirePayload {
    Base64(String),
    Raw(Vec<u8>),
}

/// Timestamp as it appeared on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
enum WireTimestamp {
    Epoch(i64),
    Rfc3339(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct WireValue {
    payload: WirePayload,
    timestamp: WireTimestamp,
}

// =============================================================================
// Shape Detection & Normalization
// =============================================================================

/// Work out which historical cell shape a JSON cell uses
fn detect_shape(cell: WireCell) -> std::result::Result<WireValue, String> {
    let payload = match cell.value {
        Some(v) => WirePayload::Base64(v),
        None => return Err("cell has no value field".to_string()),
    };

    let timestamp = match (cell.timestamp_unix, cell.timestamp) {
        (Some(epoch), _) => WireTimestamp::Epoch(epoch),
        (None, Some(serde_json::Value::Number(n))) => match n.as_i64() {
            Some(epoch) => WireTimestamp::Epoch(epoch),
            None => return Err(format!("timestamp {} is not a 64-bit integer", n)),
        },
        (None, Some(serde_json::Value::String(s))) => match s.parse::<i64>() {
            Ok(epoch) => WireTimestamp::Epoch(epoch),
            Err(_) => WireTimestamp::Rfc3339(s),
        },
        (None, Some(other)) => return Err(format!("unsupported timestamp {}", other)),
        (None, None) => return Err("cell has no timestamp field".to_string()),
    };

    Ok(WireValue { payload, timestamp })
}

fn from_rpc(value: RpcValue) -> WireValue {
    WireValue {
        payload: WirePayload::Raw(value.value),
        timestamp: match value.timestamp {
            RpcTimestamp::Unix(epoch) => WireTimestamp::Epoch(epoch),
            RpcTimestamp::Rfc3339(text) => WireTimestamp::Rfc3339(text),
        },
    }
}

/// Decode payload and timestamp into their canonical form
fn normalize(value: WireValue, opts: &DecodeOptions) -> std::result::Result<TimestampedValue, String> {
    let payload = match value.payload {
        WirePayload::Base64(text) => STANDARD
            .decode(text.as_bytes())
            .map_err(|e| format!("invalid base64 value {:?}: {}", text, e))?,
        WirePayload::Raw(bytes) => bytes,
    };

    let timestamp = match value.timestamp {
        WireTimestamp::Epoch(epoch) => epoch,
        WireTimestamp::Rfc3339(text) => parse_rfc3339(&text, opts.timestamp_unit)?,
    };

    Ok(TimestampedValue { payload, timestamp })
}

fn parse_rfc3339(text: &str, unit: TimestampUnit) -> std::result::Result<i64, String> {
    let parsed = DateTime::parse_from_rfc3339(text)
        .map_err(|e| format!("unparseable timestamp {:?}: {}", text, e))?;

    match unit {
        TimestampUnit::Seconds => Ok(parsed.timestamp()),
        TimestampUnit::Nanoseconds => parsed
            .timestamp_nanos_opt()
            .ok_or_else(|| format!("timestamp {:?} does not fit in nanoseconds", text)),
    }
}

// =============================================================================
// Row Assembly
// =============================================================================

fn build_row(
    fallback_key: Option<&str>,
    wire: WireRow,
    opts: &DecodeOptions,
) -> std::result::Result<Row, String> {
    let key = match (wire.key, fallback_key) {
        (Some(inner), Some(outer)) if !inner.is_empty() && inner != outer => {
            tracing::warn!("Row key {:?} differs from envelope key {:?}", inner, outer);
            outer.to_string()
        }
        (_, Some(outer)) => outer.to_string(),
        (Some(inner), None) => inner,
        (None, None) => String::new(),
    };

    let mut row = Row::new(key);
    for (family, qualifiers) in wire.cols.unwrap_or_default() {
        row.ensure_family(&family);
        for (qualifier, cells) in qualifiers.unwrap_or_default() {
            let versions = row.ensure_family(&family).entry(qualifier.clone()).or_default();
            for (i, cell) in cells.unwrap_or_default().into_iter().enumerate() {
                let value = detect_shape(cell)
                    .and_then(|v| normalize(v, opts))
                    .map_err(|e| format!("{}/{}[{}]: {}", family, qualifier, i, e))?;
                versions.push(value);
            }
        }
    }

    Ok(row)
}

/// Decode a single-row envelope
///
/// Returns `None` when the server answered `null` or an empty object,
/// meaning the key matched nothing. Any other value must be an object with
/// a non-empty `key`; error objects, keyed envelopes and arrays are decode
/// errors.
pub fn decode_row(raw: &[u8], opts: &DecodeOptions) -> Result<Option<Row>> {
    let malformed = |reason: String| ClientError::decode(reason, Bytes::copy_from_slice(raw));

    let object: Option<serde_json::Map<String, serde_json::Value>> =
        serde_json::from_slice(raw).map_err(|e| malformed(format!("malformed row: {}", e)))?;

    let object = match object {
        Some(object) if !object.is_empty() => object,
        _ => return Ok(None),
    };

    if !object.contains_key("key") {
        let fields: Vec<&str> = object.keys().map(String::as_str).take(4).collect();
        return Err(malformed(format!("not a row envelope (fields: {})", fields.join(", "))));
    }

    let wire = WireRow::deserialize(serde_json::Value::Object(object))
        .map_err(|e| malformed(format!("malformed row: {}", e)))?;

    match wire.key.as_deref() {
        Some(key) if !key.is_empty() => {}
        _ => return Err(malformed("row envelope has an empty key".to_string())),
    }

    build_row(None, wire, opts).map(Some).map_err(malformed)
}

/// Decode a multi-row envelope
pub fn decode_result_set(raw: &[u8], opts: &DecodeOptions) -> Result<ResultSet> {
    let wire: Option<BTreeMap<String, Option<WireRow>>> = serde_json::from_slice(raw).map_err(|e| {
        ClientError::decode(format!("malformed result set: {}", e), Bytes::copy_from_slice(raw))
    })?;

    let mut rows = ResultSet::new();
    for (key, wire_row) in wire.unwrap_or_default() {
        let wire_row = wire_row.unwrap_or(WireRow { key: None, cols: None });
        let row = build_row(Some(&key), wire_row, opts)
            .map_err(|e| ClientError::decode(format!("row {:?}: {}", key, e), Bytes::copy_from_slice(raw)))?;
        rows.insert(key, row);
    }
    Ok(rows)
}

/// Decode a read response in the envelope the caller expects
pub fn decode_response(raw: &[u8], shape: ResponseShape, opts: &DecodeOptions) -> Result<ReadResult> {
    match shape {
        ResponseShape::SingleRow => Ok(match decode_row(raw, opts)? {
            Some(row) => ReadResult::Row(row),
            None => ReadResult::NotFound,
        }),
        ResponseShape::MultiRow => decode_result_set(raw, opts).map(ReadResult::Rows),
    }
}

// =============================================================================
// Typed Replies
// =============================================================================

fn build_rpc_row(key: &str, rpc: RpcRow, opts: &DecodeOptions) -> std::result::Result<Row, String> {
    let mut row = Row::new(key);
    for (family, qualifiers) in rpc.cols {
        let family_entry = row.ensure_family(&family);
        for (qualifier, values) in qualifiers {
            let versions = family_entry.entry(qualifier.clone()).or_default();
            for (i, value) in values.into_iter().enumerate() {
                let value = normalize(from_rpc(value), opts)
                    .map_err(|e| format!("{}/{}[{}]: {}", family, qualifier, i, e))?;
                versions.push(value);
            }
        }
    }
    Ok(row)
}

/// Decode the rows of a typed reply
pub fn decode_rpc_reply(reply: RpcReply, opts: &DecodeOptions) -> Result<ResultSet> {
    let mut rows = ResultSet::new();
    for (key, rpc_row) in reply.rows {
        let row = build_rpc_row(&key, rpc_row, opts).map_err(|e| {
            ClientError::decode(format!("row {:?}: {}", key, e), Bytes::new())
        })?;
        rows.insert(key, row);
    }
    Ok(rows)
}
