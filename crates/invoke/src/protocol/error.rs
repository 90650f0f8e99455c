use std::any::Any;
use std::error::Error;

use http::StatusCode;
use thiserror::Error;

/// The error type handlers hand back to the invoker.
pub type BoxError = Box<dyn Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("invalid event: {source}")]
    Event {
        #[from]
        source: EventError,
    },

    #[error("handler error: {source}")]
    Handler { source: BoxError },

    #[error("handler responded with status error: {source}")]
    Status {
        #[from]
        source: StatusError,
    },

    #[error("handler panicked: {message}")]
    Panic { message: String },

    #[error("completion signal dropped before the invocation settled")]
    Abandoned,
}

impl InvokeError {
    /// Wraps a handler error, unwrapping a [`StatusError`] into its own variant.
    pub fn handler<E: Into<BoxError>>(error: E) -> Self {
        match error.into().downcast::<StatusError>() {
            Ok(status_error) => Self::Status { source: *status_error },
            Err(source) => Self::Handler { source },
        }
    }

    pub fn panic(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self::Panic { message }
    }

    /// The status code a collaborator should use when turning this error into a response.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Event { .. } => StatusCode::BAD_REQUEST,
            Self::Status { source } => source.status(),
            Self::Handler { .. } | Self::Panic { .. } | Self::Abandoned => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Error, Debug)]
pub enum EventError {
    #[error("invalid http method")]
    InvalidMethod,

    #[error("invalid uri: {reason}")]
    InvalidUri { reason: String },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("invalid event format: {reason}")]
    InvalidFormat { reason: String },
}

impl EventError {
    pub fn invalid_uri<S: ToString>(str: S) -> Self {
        Self::InvalidUri { reason: str.to_string() }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn invalid_format<S: ToString>(str: S) -> Self {
        Self::InvalidFormat { reason: str.to_string() }
    }
}

/// Misuse of a [`ResponseSink`](crate::sink::ResponseSink).
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("{operation} called after the response was finalized")]
    Finalized { operation: &'static str },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },
}

impl SinkError {
    pub fn finalized(operation: &'static str) -> Self {
        Self::Finalized { operation }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }
}

/// A handler error that carries the status the response should have.
///
/// Returning this from a handler settles the invocation with
/// [`InvokeError::Status`]; [`InvokeError::into_result`] turns it into a
/// response with that status and the message as body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{status}: {message}")]
pub struct StatusError {
    status: StatusCode,
    message: String,
}

impl StatusError {
    pub fn new<S: Into<String>>(status: StatusCode, message: S) -> Self {
        Self { status, message: message.into() }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
