//! Invocation orchestration.
//!
//! This module runs one handler per event: it builds the request the handler
//! reads and the sink it writes to, drives the handler, and waits for the
//! first completion signal.
//!
//! # Components
//!
//! - [`Invoker`]: owns a handler and its [`Options`](crate::options::Options) and
//!   turns events into results:
//!   - [`Invoker::invoke`] for callers that await a result
//!   - [`Invoker::invoke_with`] for callers that expect a callback
//!   - [`Invoker::invoke_json`] for raw API Gateway payloads

mod invoker;

pub use invoker::Invoker;
