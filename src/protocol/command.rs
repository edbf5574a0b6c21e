//! Command definitions
//!
//! Immutable request values built once per call. Preconditions are checked
//! by `validate` before encoding, so the encoder never sees an invalid one.

use crate::error::{ClientError, Result};

/// Command verbs understood by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Read,
    Write,
    Delete,
    Create,
}

impl Verb {
    /// Verb as it appears at the start of a command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Read => "READ",
            Verb::Write => "WRITE",
            Verb::Delete => "DELETE",
            Verb::Create => "CREATE",
        }
    }
}

/// Query mode of a read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    Exact,
    Prefix,
    Regex,
}

/// Which rows a read addresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// A single row key
    Key(String),

    /// Every row key starting with this prefix
    Prefix(String),

    /// Every row key matching this pattern
    Regex(String),
}

impl Selector {
    /// Build a selector from three optional inputs, exactly one of which
    /// must be non-empty.
    pub fn from_flags(key: Option<&str>, prefix: Option<&str>, regex: Option<&str>) -> Result<Self> {
        let given = |v: Option<&str>| v.filter(|s| !s.is_empty()).map(str::to_string);

        match (given(key), given(prefix), given(regex)) {
            (Some(k), None, None) => Ok(Selector::Key(k)),
            (None, Some(p), None) => Ok(Selector::Prefix(p)),
            (None, None, Some(r)) => Ok(Selector::Regex(r)),
            _ => Err(ClientError::InvalidRequest(
                "exactly one of key, prefix or regex must be provided".to_string(),
            )),
        }
    }

    pub fn mode(&self) -> QueryMode {
        match self {
            Selector::Key(_) => QueryMode::Exact,
            Selector::Prefix(_) => QueryMode::Prefix,
            Selector::Regex(_) => QueryMode::Regex,
        }
    }

    /// The raw selector text, before any regex wrapping
    pub fn text(&self) -> &str {
        match self {
            Selector::Key(s) | Selector::Prefix(s) | Selector::Regex(s) => s,
        }
    }
}

/// Read one row or a set of rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRequest {
    pub selector: Selector,
    pub family: Option<String>,
    pub qualifiers: Vec<String>,
    /// Return at most this many versions per qualifier
    pub latest: Option<u32>,
}

impl ReadRequest {
    pub fn new(selector: Selector) -> Self {
        Self {
            selector,
            family: None,
            qualifiers: Vec::new(),
            latest: None,
        }
    }

    pub fn family(mut self, family: impl Into<String>) -> Self {
        self.family = Some(family.into());
        self
    }

    pub fn qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifiers.push(qualifier.into());
        self
    }

    pub fn latest(mut self, n: u32) -> Self {
        self.latest = Some(n);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.selector.text().is_empty() {
            return Err(ClientError::InvalidRequest("read selector is empty".to_string()));
        }
        check_token("selector", self.selector.text())?;
        if let Some(family) = &self.family {
            check_token("family", family)?;
        }
        for q in &self.qualifiers {
            check_token("qualifier", q)?;
        }
        Ok(())
    }
}

/// Write qualifier/value pairs into one family of a row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    pub key: String,
    pub family: String,
    /// Qualifier name and raw value, in the order given
    pub cells: Vec<(String, Vec<u8>)>,
    /// Time-to-live in seconds
    pub ttl: Option<u64>,
}

impl WriteRequest {
    pub fn new(key: impl Into<String>, family: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            family: family.into(),
            cells: Vec::new(),
            ttl: None,
        }
    }

    pub fn cell(mut self, qualifier: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.cells.push((qualifier.into(), value.into()));
        self
    }

    pub fn ttl(mut self, seconds: u64) -> Self {
        self.ttl = Some(seconds);
        self
    }

    /// Pair up qualifiers and values given as two parallel lists
    pub fn from_pairs(
        key: impl Into<String>,
        family: impl Into<String>,
        qualifiers: &[String],
        values: &[String],
    ) -> Result<Self> {
        if qualifiers.len() != values.len() {
            return Err(ClientError::InvalidRequest(format!(
                "number of qualifiers ({}) must match number of values ({})",
                qualifiers.len(),
                values.len()
            )));
        }
        let mut request = Self::new(key, family);
        for (q, v) in qualifiers.iter().zip(values) {
            request = request.cell(q.as_str(), v.as_bytes());
        }
        Ok(request)
    }

    pub fn validate(&self) -> Result<()> {
        if self.key.is_empty() {
            return Err(ClientError::InvalidRequest("key is required".to_string()));
        }
        if self.family.is_empty() {
            return Err(ClientError::InvalidRequest("family is required".to_string()));
        }
        if self.cells.is_empty() {
            return Err(ClientError::InvalidRequest(
                "at least one qualifier/value pair is required".to_string(),
            ));
        }
        check_token("key", &self.key)?;
        check_token("family", &self.family)?;
        for (q, _) in &self.cells {
            check_token("qualifier", q)?;
        }
        Ok(())
    }
}

/// Delete a row, a family, or specific qualifiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequest {
    pub key: String,
    pub family: Option<String>,
    pub qualifiers: Vec<String>,
    /// Only delete versions at or after this timestamp
    pub from: Option<i64>,
    /// Tombstone time-to-live in seconds
    pub ttl: Option<u64>,
}

impl DeleteRequest {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            family: None,
            qualifiers: Vec::new(),
            from: None,
            ttl: None,
        }
    }

    pub fn family(mut self, family: impl Into<String>) -> Self {
        self.family = Some(family.into());
        self
    }

    pub fn qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifiers.push(qualifier.into());
        self
    }

    pub fn from_timestamp(mut self, timestamp: i64) -> Self {
        self.from = Some(timestamp);
        self
    }

    pub fn ttl(mut self, seconds: u64) -> Self {
        self.ttl = Some(seconds);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.key.is_empty() {
            return Err(ClientError::InvalidRequest("key is required".to_string()));
        }
        check_token("key", &self.key)?;
        if let Some(family) = &self.family {
            check_token("family", family)?;
        }
        for q in &self.qualifiers {
            check_token("qualifier", q)?;
        }
        Ok(())
    }
}

/// Create column families
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateFamilyRequest {
    pub families: Vec<String>,
}

impl CreateFamilyRequest {
    pub fn new<I, S>(families: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            families: families.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a comma-separated family list, trimming whitespace and
    /// dropping empty entries
    pub fn parse(list: &str) -> Result<Self> {
        let request = Self::new(list.split(',').map(str::trim).filter(|f| !f.is_empty()));
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<()> {
        if self.families.is_empty() {
            return Err(ClientError::InvalidRequest(
                "no valid family names provided".to_string(),
            ));
        }
        if self.families.iter().any(|f| f.trim().is_empty()) {
            return Err(ClientError::InvalidRequest("family names must not be blank".to_string()));
        }
        Ok(())
    }
}

/// A request of any kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Read(ReadRequest),
    Write(WriteRequest),
    Delete(DeleteRequest),
    CreateFamily(CreateFamilyRequest),
}

impl Request {
    pub fn verb(&self) -> Verb {
        match self {
            Request::Read(_) => Verb::Read,
            Request::Write(_) => Verb::Write,
            Request::Delete(_) => Verb::Delete,
            Request::CreateFamily(_) => Verb::Create,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Request::Read(r) => r.validate(),
            Request::Write(r) => r.validate(),
            Request::Delete(r) => r.validate(),
            Request::CreateFamily(r) => r.validate(),
        }
    }
}

impl From<ReadRequest> for Request {
    fn from(r: ReadRequest) -> Self {
        Request::Read(r)
    }
}

impl From<WriteRequest> for Request {
    fn from(r: WriteRequest) -> Self {
        Request::Write(r)
    }
}

impl From<DeleteRequest> for Request {
    fn from(r: DeleteRequest) -> Self {
        Request::Delete(r)
    }
}

impl From<CreateFamilyRequest> for Request {
    fn from(r: CreateFamilyRequest) -> Self {
        Request::CreateFamily(r)
    }
}

/// Names are inserted into the command line unencoded, so they may not
/// contain whitespace.
fn check_token(field: &str, value: &str) -> Result<()> {
    if value.chars().any(char::is_whitespace) {
        return Err(ClientError::InvalidRequest(format!(
            "{} must not contain whitespace: {:?}",
            field, value
        )));
    }
    Ok(())
}
