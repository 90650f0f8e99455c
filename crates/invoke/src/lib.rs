//! Run streaming HTTP handlers behind request/response-per-invocation events
//!
//! This crate adapts handlers written against a streaming request/response
//! model (a request whose body arrives as a stream, a response written
//! piece by piece) to an execution model where the whole request arrives as
//! one event value and one result value is expected back, with no socket in
//! between.
//!
//! # Features
//!
//! - Request synthesis: an [`Event`](protocol::Event) becomes an
//!   `http::Request<ReqBody>` whose body implements `http_body::Body`
//! - Response capture: handlers write status, headers and body chunks to a
//!   [`ResponseSink`](sink::ResponseSink)
//! - Binary classification: non-text bodies are base64 encoded according to
//!   [`BinaryConfig`](binary::BinaryConfig)
//! - Settle-once completion: whichever of the sink, the handler future or the
//!   [`Done`](completion::Done) callback signals first wins
//! - API Gateway REST (v1) and HTTP API (v2) payload formats
//! - Request and response interceptors
//! - Handler panics are caught and reported as errors
//!
//! # Example
//!
//! ```no_run
//! use http::{Request, StatusCode};
//! use micro_invoke::format::EventFormat;
//! use micro_invoke::handler::stream_fn;
//! use micro_invoke::invoke::Invoker;
//! use micro_invoke::options::Options;
//! use micro_invoke::protocol::body::ReqBody;
//! use micro_invoke::protocol::{InvocationContext, SinkError};
//! use micro_invoke::sink::ResponseSink;
//! use tracing::{Level, info};
//! use tracing_subscriber::FmtSubscriber;
//!
//! #[tokio::main]
//! async fn main() {
//!     // Initialize logging
//!     let subscriber = FmtSubscriber::builder()
//!         .with_max_level(Level::INFO)
//!         .finish();
//!     tracing::subscriber::set_global_default(subscriber)
//!         .expect("setting default subscriber failed");
//!
//!     let options = Options::builder().binary_from_env().build();
//!     let invoker = Invoker::new(stream_fn(hello_world), options);
//!
//!     let payload = serde_json::json!({
//!         "httpMethod": "GET",
//!         "path": "/hello",
//!         "headers": { "accept": "text/plain" }
//!     });
//!     let response = invoker.invoke_json(EventFormat::detect(&payload), payload, InvocationContext::empty()).await;
//!     info!(%response, "invocation finished");
//! }
//!
//! async fn hello_world(request: Request<ReqBody>, response: ResponseSink) -> Result<(), SinkError> {
//!     info!(path = request.uri().path(), "request path");
//!
//!     response.set_status(StatusCode::OK)?;
//!     response.set_header("x-powered-by", "micro-invoke")?;
//!     response.send_text("Hello World!\r\n")
//! }
//! ```
//!
//! # Architecture
//!
//! The crate is organized into several key modules:
//!
//! - [`protocol`]: event, request, result, context and error types
//! - [`binary`]: text or binary classification of response bodies
//! - [`sink`]: the response side handed to handlers
//! - [`completion`]: the settle-once completion signal
//! - [`handler`]: handler trait and adapters for the entry point styles
//! - [`interceptor`]: request and response hooks
//! - [`options`]: invoker configuration
//! - [`invoke`]: invocation orchestration
//! - [`format`]: API Gateway payload formats
//!
//! # Core Components
//!
//! ## Invocation
//!
//! The [`invoke::Invoker`] type is the main entry point. For each event it
//! builds a fresh request body and response sink, runs the request
//! interceptors, drives the handler on the caller's task and returns the first
//! completion outcome after the response interceptors have seen it.
//!
//! ## Request Body
//!
//! [`ReqBody`](protocol::body::ReqBody) never hands out data before it is
//! polled. The first poll yields one scheduling turn, the next delivers the
//! whole decoded body as a single frame, and every poll after that reports the
//! end of the stream.
//!
//! ## Completion
//!
//! A handler is done when it ends the sink, when its future resolves, or when
//! it calls [`Done`](completion::Done). The first of these settles the
//! invocation and the rest are ignored. Errors and panics settle the error
//! channel instead of a partial result.
//!
//! ## Error Handling
//!
//! The crate uses custom error types that implement `std::error::Error`:
//!
//! - [`protocol::InvokeError`]: Top-level error type
//! - [`protocol::EventError`]: Malformed event descriptors
//! - [`protocol::SinkError`]: Response sink misuse
//! - [`protocol::StatusError`]: Handler errors carrying a status code
//!
//! # Limitations
//!
//! - Request bodies are delivered in one piece, not incrementally
//! - No invocation deadline is imposed, callers race their own timer
//! - No HTTP semantics are applied, bytes and metadata are carried as they are

pub mod binary;
pub mod completion;
pub mod format;
pub mod handler;
pub mod interceptor;
pub mod invoke;
pub mod options;
pub mod protocol;
pub mod sink;

mod utils;
pub(crate) use utils::ensure;
