//! The flat value an invocation settles with.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, StatusCode};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::error;

use crate::protocol::{InvokeError, header};

/// Status, headers and body of a finished invocation.
///
/// Binary bodies are carried base64 encoded with `is_base64_encoded` set; text
/// bodies are carried as they are. Serializes to
/// `{"statusCode", "headers", "body", "isBase64Encoded"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
    is_base64_encoded: bool,
}

impl InvocationResult {
    pub fn new(status: StatusCode, headers: HeaderMap, body: String, is_base64_encoded: bool) -> Self {
        Self { status, headers, body, is_base64_encoded }
    }

    /// Builds a result from raw body bytes, base64 encoding them when `binary` is set.
    ///
    /// Text bodies that are not valid UTF-8 are decoded lossily.
    pub fn from_bytes(status: StatusCode, headers: HeaderMap, body: &Bytes, binary: bool) -> Self {
        let body = if binary { STANDARD.encode(body) } else { String::from_utf8_lossy(body).into_owned() };
        Self::new(status, headers, body, binary)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// The body as carried: plain text, or base64 when [`is_base64_encoded`](Self::is_base64_encoded).
    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn is_base64_encoded(&self) -> bool {
        self.is_base64_encoded
    }

    /// The raw body bytes, decoding base64 when needed.
    pub fn body_bytes(&self) -> Result<Bytes, base64::DecodeError> {
        if self.is_base64_encoded {
            STANDARD.decode(&self.body).map(Bytes::from)
        } else {
            Ok(Bytes::copy_from_slice(self.body.as_bytes()))
        }
    }
}

impl Serialize for InvocationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("statusCode", &self.status.as_u16())?;
        map.serialize_entry("headers", &header::compact(&self.headers))?;
        map.serialize_entry("body", &self.body)?;
        map.serialize_entry("isBase64Encoded", &self.is_base64_encoded)?;
        map.end()
    }
}

impl InvokeError {
    /// Translates the error into the response a caller should send back.
    ///
    /// Status errors keep their status and message; every other error becomes
    /// an empty response with [`status_code`](Self::status_code).
    pub fn into_result(self) -> InvocationResult {
        error!(cause = %self, "translate invocation error into response");
        let status = self.status_code();
        let mut headers = HeaderMap::new();

        let body = match self {
            InvokeError::Status { source } => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
                source.message().to_string()
            }
            _ => String::new(),
        };

        InvocationResult::new(status, headers, body, false)
    }
}
