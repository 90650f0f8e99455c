//! Core protocol types of the adaptation layer.
//!
//! This module holds the values that cross the boundary between an
//! invocation-style caller and a streaming HTTP handler.
//!
//! # Architecture
//!
//! - **Event** ([`event`]): the flat descriptor an invocation starts from
//!   - [`Event`]: method, path, query, headers, body and caller address
//!   - [`Values`]: single or repeated header/query values
//!
//! - **Request Synthesis** ([`request`], [`body`]): what the handler reads
//!   - [`RequestHeader`]: request head built from an event
//!   - [`ReqBody`](body::ReqBody): the event body exposed as `http_body::Body`
//!
//! - **Result** ([`result`]): what the invocation settles with
//!   - [`InvocationResult`]: status, headers, body and encoding flag
//!
//! - **Context** ([`context`]): the opaque caller value passed through
//!
//! - **Error Handling** ([`error`]):
//!   - [`InvokeError`]: top-level error an invocation settles with
//!   - [`EventError`]: malformed event descriptors
//!   - [`SinkError`]: misuse of the response sink
//!   - [`StatusError`]: handler errors that carry a status code

mod event;
pub use event::Event;
pub use event::EventBody;
pub use event::Values;
pub(crate) use event::append;

mod request;
pub use request::RequestHeader;
pub use request::SourceIp;

mod result;
pub use result::InvocationResult;

mod context;
pub use context::InvocationContext;

mod error;
pub use error::BoxError;
pub use error::EventError;
pub use error::InvokeError;
pub use error::SinkError;
pub use error::StatusError;

pub(crate) mod header;

pub mod body;

/// What an invocation settles with.
pub type InvokeResult = Result<InvocationResult, InvokeError>;
