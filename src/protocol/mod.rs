//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Protocol Format (Text)
//!
//! ### Request Format
//! ```text
//! VERB key=value key=value ...
//! ```
//!
//! ### Verbs
//! - READ:   read one row (`key=`) or many (`prefix=` / `regex=`)
//! - WRITE:  write qualifier/value pairs into one family
//! - DELETE: delete a row, family or qualifiers
//! - CREATE: create column families
//!
//! ### Response Format
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │   one JSON value, no length, no delimiter   │
//! └─────────────────────────────────────────────┘
//! ```
//! The end of a response is found by parsing; see [`ResponseAssembler`].

mod assembler;
mod codec;
mod command;

pub use assembler::{AssembledResponse, AssemblerConfig, AssemblyState, ResponseAssembler};
pub use codec::{encode_call, encode_command, encode_value, regex_pattern, REGEX_METACHARACTERS};
pub use command::{
    CreateFamilyRequest, DeleteRequest, QueryMode, ReadRequest, Request, Selector, Verb,
    WriteRequest,
};
