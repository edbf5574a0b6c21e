//! Protocol codec
//!
//! Encoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request (Command) Format
//! ```text
//! VERB key1=value1 key2=value2 ...
//! ```
//! A single line with no terminator. The server answers with one JSON
//! value and the client detects its end by parsing, see
//! [`ResponseAssembler`](super::ResponseAssembler).
//!
//! ### Tokens by Verb
//! - READ:   key= | prefix= | regex=, family=, qualifier=*, latest=N
//! - WRITE:  key=, family=, (qualifier= value=)+, ttl=N
//! - DELETE: key=, family=, qualifier=*, timestamp=N, ttl=N
//! - CREATE: family=a,b,c

use std::borrow::Cow;
use std::fmt::Write as _;

use super::command::{
    CreateFamilyRequest, DeleteRequest, ReadRequest, Request, Selector, WriteRequest,
};
use crate::transport::typed::{
    CreateFamilyCall, DeleteCall, ReadCall, RpcCall, RpcQueryType, WriteCall, WriteCell,
};

/// Characters that mark a search pattern as an intentional regex
pub const REGEX_METACHARACTERS: &str = ".*+?^$[](){}|\\";

// =============================================================================
// Selector Helpers
// =============================================================================

/// Turn a regex-mode search string into the pattern sent to the server.
///
/// Input that already contains a regex metacharacter is passed through as
/// is; anything else becomes a substring match `.*input.*`.
pub fn regex_pattern(input: &str) -> Cow<'_, str> {
    if input.chars().any(|c| REGEX_METACHARACTERS.contains(c)) {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(format!(".*{}.*", input))
    }
}

/// Selector text as sent on the wire (regex wrapping applied)
fn selector_value(selector: &Selector) -> Cow<'_, str> {
    match selector {
        Selector::Key(k) => Cow::Borrowed(k.as_str()),
        Selector::Prefix(p) => Cow::Borrowed(p.as_str()),
        Selector::Regex(r) => regex_pattern(r),
    }
}

/// Percent-encode a value so it cannot break the command line
pub fn encode_value(value: &[u8]) -> String {
    urlencoding::encode_binary(value).into_owned()
}

// =============================================================================
// Text Command Encoding
// =============================================================================

/// Encode a request as a single command line
///
/// The request is expected to have passed `validate()`.
pub fn encode_command(request: &Request) -> Vec<u8> {
    let line = match request {
        Request::Read(r) => encode_read(r),
        Request::Write(w) => encode_write(w),
        Request::Delete(d) => encode_delete(d),
        Request::CreateFamily(c) => encode_create(c),
    };
    line.into_bytes()
}

fn encode_read(r: &ReadRequest) -> String {
    let token = match r.selector {
        Selector::Key(_) => "key",
        Selector::Prefix(_) => "prefix",
        Selector::Regex(_) => "regex",
    };
    let mut line = format!("READ {}={}", token, selector_value(&r.selector));

    if let Some(family) = &r.family {
        let _ = write!(line, " family={}", family);
    }
    for q in &r.qualifiers {
        let _ = write!(line, " qualifier={}", q);
    }
    if let Some(n) = r.latest.filter(|n| *n > 0) {
        let _ = write!(line, " latest={}", n);
    }
    line
}

fn encode_write(w: &WriteRequest) -> String {
    let mut line = format!("WRITE key={} family={}", w.key, w.family);
    for (q, v) in &w.cells {
        let _ = write!(line, " qualifier={} value={}", q, encode_value(v));
    }
    if let Some(ttl) = w.ttl.filter(|t| *t > 0) {
        let _ = write!(line, " ttl={}", ttl);
    }
    line
}

fn encode_delete(d: &DeleteRequest) -> String {
    let mut line = format!("DELETE key={}", d.key);
    if let Some(family) = &d.family {
        let _ = write!(line, " family={}", family);
    }
    for q in &d.qualifiers {
        let _ = write!(line, " qualifier={}", q);
    }
    if let Some(from) = d.from {
        let _ = write!(line, " timestamp={}", from);
    }
    if let Some(ttl) = d.ttl.filter(|t| *t > 0) {
        let _ = write!(line, " ttl={}", ttl);
    }
    line
}

fn encode_create(c: &CreateFamilyRequest) -> String {
    let families: Vec<String> = c
        .families
        .iter()
        .map(|f| urlencoding::encode(f.trim()).into_owned())
        .collect();
    format!("CREATE family={}", families.join(","))
}

// =============================================================================
// Typed Call Encoding
// =============================================================================

/// Encode a request as a structured call for a typed transport
///
/// Field values match the text encoding: regex wrapping and value
/// percent-encoding are applied the same way.
pub fn encode_call(request: &Request) -> RpcCall {
    match request {
        Request::Read(r) => RpcCall::Read(ReadCall {
            row_key: selector_value(&r.selector).into_owned(),
            query_type: match r.selector {
                Selector::Key(_) => RpcQueryType::Exact,
                Selector::Prefix(_) => RpcQueryType::Prefix,
                Selector::Regex(_) => RpcQueryType::Regex,
            },
            family: r.family.clone().unwrap_or_default(),
            qualifiers: r.qualifiers.clone(),
            latest: r.latest.unwrap_or(0),
        }),
        Request::Write(w) => RpcCall::Write(WriteCall {
            row_key: w.key.clone(),
            family: w.family.clone(),
            qualifiers: w
                .cells
                .iter()
                .map(|(name, value)| WriteCell {
                    name: name.clone(),
                    value: encode_value(value).into_bytes(),
                })
                .collect(),
            ttl: w.ttl.unwrap_or(0),
        }),
        Request::Delete(d) => RpcCall::Delete(DeleteCall {
            row_key: d.key.clone(),
            family: d.family.clone().unwrap_or_default(),
            qualifiers: d.qualifiers.clone(),
            timestamp_unix: d.from.unwrap_or(0),
            ttl: d.ttl.unwrap_or(0),
        }),
        Request::CreateFamily(c) => RpcCall::CreateFamily(CreateFamilyCall {
            families: c.families.iter().map(|f| f.trim().to_string()).collect(),
        }),
    }
}
