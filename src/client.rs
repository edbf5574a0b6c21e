//! Client Module
//!
//! Runs request/response cycles against the store.
//!
//! ## Responsibilities
//! - Validate and encode requests
//! - Open one transport per request and close it on every exit path
//! - Assemble the unframed response and decode it into rows
//!
//! Both clients implement [`RowStore`], so callers can stay agnostic of
//! whether they talk over the text protocol or a typed RPC service.

use std::time::Instant;

use crate::config::ClientConfig;
use crate::error::{ClientError, Phase, Result};
use crate::protocol::{
    encode_call, encode_command, AssembledResponse, AssemblerConfig, CreateFamilyRequest,
    DeleteRequest, ReadRequest, Request, ResponseAssembler, WriteRequest,
};
use crate::row::{
    decode_response, decode_row, decode_rpc_reply, DecodeOptions, ReadResult, ResponseShape,
    ResultSet,
};
use crate::transport::typed::RowService;
use crate::transport::{Dialer, TcpDialer, Transport};

/// Operations offered by the store
pub trait RowStore {
    /// Read one row (exact key) or a set of rows (prefix / regex)
    fn read(&mut self, request: &ReadRequest) -> Result<ReadResult>;

    /// Write cells; returns the rows the server echoed back
    fn write(&mut self, request: &WriteRequest) -> Result<ResultSet>;

    /// Delete cells; returns the rows the server echoed back
    fn delete(&mut self, request: &DeleteRequest) -> Result<ResultSet>;

    /// Create column families
    fn create_families(&mut self, request: &CreateFamilyRequest) -> Result<()>;
}

// =============================================================================
// Text Protocol Client
// =============================================================================

/// Client speaking the text protocol over a byte stream
///
/// Holds no connection between calls, so one client may be shared by
/// concurrent callers; each call dials its own transport.
pub struct Client<D: Dialer> {
    dialer: D,
    assembler: AssemblerConfig,
    decode: DecodeOptions,
}

impl Client<TcpDialer> {
    /// Client dialing plain TCP to `config.endpoint`
    pub fn tcp(config: &ClientConfig) -> Result<Self> {
        let dialer = TcpDialer::new(config.endpoint.clone(), config.connect_timeout());
        Self::with_dialer(dialer, config)
    }
}

#[cfg(feature = "tls")]
impl Client<crate::transport::TlsDialer> {
    /// Client dialing TLS to `config.endpoint`, trusting `config.trust_cert`
    pub fn tls(config: &ClientConfig) -> Result<Self> {
        let cert = config
            .trust_cert
            .as_deref()
            .ok_or_else(|| ClientError::Config("TLS requires a trusted certificate".to_string()))?;
        let dialer = crate::transport::TlsDialer::from_pem_file(
            config.endpoint.clone(),
            &config.server_name,
            cert,
            config.connect_timeout(),
        )?;
        Self::with_dialer(dialer, config)
    }
}

impl<D: Dialer> Client<D> {
    /// Client using any dialer
    pub fn with_dialer(dialer: D, config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            dialer,
            assembler: AssemblerConfig::from(config),
            decode: DecodeOptions {
                timestamp_unit: config.timestamp_unit,
            },
        })
    }

    pub fn dialer(&self) -> &D {
        &self.dialer
    }

    /// Read one row or a set of rows
    pub fn read(&self, request: &ReadRequest) -> Result<ReadResult> {
        let shape = ResponseShape::from(request.selector.mode());
        let response = self.round_trip(&Request::Read(request.clone()))?;
        decode_response(&response.bytes, shape, &self.decode)
    }

    /// Write cells into one family of a row
    pub fn write(&self, request: &WriteRequest) -> Result<ResultSet> {
        let response = self.round_trip(&Request::Write(request.clone()))?;
        self.decode_acknowledgement(&response)
    }

    /// Delete a row, family or qualifiers
    pub fn delete(&self, request: &DeleteRequest) -> Result<ResultSet> {
        let response = self.round_trip(&Request::Delete(request.clone()))?;
        self.decode_acknowledgement(&response)
    }

    /// Create column families
    ///
    /// Any complete JSON value counts as success.
    pub fn create_families(&self, request: &CreateFamilyRequest) -> Result<()> {
        self.round_trip(&Request::CreateFamily(request.clone()))?;
        Ok(())
    }

    /// Send one request and collect its raw response
    ///
    /// The transport is closed before returning, whatever the outcome.
    pub fn round_trip(&self, request: &Request) -> Result<AssembledResponse> {
        request.validate()?;
        let command = encode_command(request);

        let mut transport = self
            .dialer
            .dial()
            .map_err(|e| ClientError::transport(Phase::Connect, e))?;

        let result = self.exchange(&mut transport, &command);

        if let Err(e) = transport.close() {
            tracing::warn!("Failed to close connection: {}", e);
        }

        match &result {
            Ok(response) => tracing::debug!(
                verb = request.verb().as_str(),
                bytes = response.bytes.len(),
                reads = response.reads,
                elapsed_ms = response.elapsed.as_secs_f64() * 1000.0,
                "request complete"
            ),
            Err(e) => tracing::debug!(verb = request.verb().as_str(), "request failed: {}", e),
        }
        result
    }

    fn exchange<T: Transport>(&self, transport: &mut T, command: &[u8]) -> Result<AssembledResponse> {
        transport
            .write_all(command)
            .map_err(|e| ClientError::transport(Phase::Write, e))?;

        let sent_at = Instant::now();
        ResponseAssembler::new(self.assembler.clone(), sent_at).assemble(transport)
    }

    /// Write and delete answer with a single row, possibly without families
    fn decode_acknowledgement(&self, response: &AssembledResponse) -> Result<ResultSet> {
        let mut rows = ResultSet::new();
        if let Some(row) = decode_row(&response.bytes, &self.decode)? {
            rows.insert(row.key.clone(), row);
        }
        Ok(rows)
    }
}

impl<D: Dialer> RowStore for Client<D> {
    fn read(&mut self, request: &ReadRequest) -> Result<ReadResult> {
        Client::read(self, request)
    }

    fn write(&mut self, request: &WriteRequest) -> Result<ResultSet> {
        Client::write(self, request)
    }

    fn delete(&mut self, request: &DeleteRequest) -> Result<ResultSet> {
        Client::delete(self, request)
    }

    fn create_families(&mut self, request: &CreateFamilyRequest) -> Result<()> {
        Client::create_families(self, request)
    }
}

// =============================================================================
// Typed Transport Client
// =============================================================================

/// Client issuing structured calls to a typed RPC service
pub struct RpcClient<S: RowService> {
    service: S,
    decode: DecodeOptions,
}

impl<S: RowService> RpcClient<S> {
    pub fn new(service: S, config: &ClientConfig) -> Self {
        Self {
            service,
            decode: DecodeOptions {
                timestamp_unit: config.timestamp_unit,
            },
        }
    }

    /// Close the underlying service connection
    pub fn close(mut self) -> Result<()> {
        self.service.close()
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    fn call(&mut self, request: &Request) -> Result<ResultSet> {
        request.validate()?;
        let started = Instant::now();
        let reply = self.service.call(&encode_call(request))?;
        let rows = decode_rpc_reply(reply, &self.decode)?;

        tracing::debug!(
            verb = request.verb().as_str(),
            rows = rows.len(),
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "call complete"
        );
        Ok(rows)
    }
}

impl<S: RowService> RowStore for RpcClient<S> {
    fn read(&mut self, request: &ReadRequest) -> Result<ReadResult> {
        let mut rows = self.call(&Request::Read(request.clone()))?;

        match ResponseShape::from(request.selector.mode()) {
            ResponseShape::MultiRow => Ok(ReadResult::Rows(rows)),
            ResponseShape::SingleRow => {
                let key = request.selector.text();
                match rows.remove(key) {
                    Some(row) => Ok(ReadResult::Row(row)),
                    None => {
                        if !rows.is_empty() {
                            tracing::warn!(
                                "Reply for key {:?} carried only other rows ({}); treating as not found",
                                key,
                                rows.len()
                            );
                        }
                        Ok(ReadResult::NotFound)
                    }
                }
            }
        }
    }

    fn write(&mut self, request: &WriteRequest) -> Result<ResultSet> {
        self.call(&Request::Write(request.clone()))
    }

    fn delete(&mut self, request: &DeleteRequest) -> Result<ResultSet> {
        self.call(&Request::Delete(request.clone()))
    }

    fn create_families(&mut self, request: &CreateFamilyRequest) -> Result<()> {
        self.call(&Request::CreateFamily(request.clone()))?;
        Ok(())
    }
}
