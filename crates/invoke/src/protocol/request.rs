//! HTTP request header synthesis.
//!
//! This module builds the request head a handler sees out of an [`Event`].
//! It wraps the standard `http::Request` type the same way a parsed wire
//! request would be wrapped, so handlers cannot tell the two apart.

use std::borrow::Cow;
use std::fmt::Write;
use std::net::IpAddr;

use http::header::CONTENT_LENGTH;
use http::request::Parts;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Request, Uri, Version};
use tracing::warn;

use crate::protocol::{Event, EventError};

/// The caller's network address, as reported by the event.
///
/// Inserted into the request extensions when the event carries a parseable
/// source ip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceIp(pub IpAddr);

/// Represents an HTTP request header.
///
/// This struct wraps a `http::Request<()>` to provide:
/// - Access to standard HTTP header fields
/// - Construction from an event descriptor
/// - Body attachment capabilities
#[derive(Debug)]
pub struct RequestHeader {
    inner: Request<()>,
}

impl AsRef<Request<()>> for RequestHeader {
    fn as_ref(&self) -> &Request<()> {
        &self.inner
    }
}

impl AsMut<Request<()>> for RequestHeader {
    fn as_mut(&mut self) -> &mut Request<()> {
        &mut self.inner
    }
}

impl RequestHeader {
    /// Builds the request head for `event`.
    ///
    /// - the method defaults to `GET` and the path to `/`
    /// - `base_path`, when it prefixes the path, is stripped first
    /// - query parameters are rendered into the uri
    /// - header keys become case-insensitive, repeated values are kept in order
    /// - `content-length` is set from `body_len` unless the event already has one
    pub fn from_event(event: &Event, base_path: Option<&str>, body_len: usize) -> Result<Self, EventError> {
        let method = Method::from_bytes(event.method_or_default().as_bytes()).map_err(|_| EventError::InvalidMethod)?;

        let path = encode_path(strip_base_path(event.path_or_default(), base_path));
        let uri = match event.query_string()? {
            Some(query) => format!("{path}?{query}"),
            None => path.into_owned(),
        };
        let uri = Uri::try_from(uri).map_err(EventError::invalid_uri)?;

        let mut inner = Request::new(());
        *inner.method_mut() = method;
        *inner.uri_mut() = uri;
        *inner.version_mut() = Version::HTTP_11;

        let headers = inner.headers_mut();
        headers.reserve(event.headers.len() + 1);
        for (name, values) in &event.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(EventError::invalid_header)?;
            for value in values.iter() {
                let value = HeaderValue::from_str(value).map_err(EventError::invalid_header)?;
                headers.append(&name, value);
            }
        }

        if !headers.contains_key(CONTENT_LENGTH) {
            headers.insert(CONTENT_LENGTH, HeaderValue::from(body_len));
        }

        if let Some(source_ip) = event.source_ip.as_deref() {
            match source_ip.parse::<IpAddr>() {
                Ok(ip) => {
                    inner.extensions_mut().insert(SourceIp(ip));
                }
                Err(e) => warn!(source_ip, cause = %e, "ignore unparseable source ip"),
            }
        }

        Ok(Self { inner })
    }

    /// Consumes the header and returns the inner `Request<()>`.
    pub fn into_inner(self) -> Request<()> {
        self.inner
    }

    /// Attaches a body to this header, converting it into a full `Request<T>`.
    pub fn body<T>(self, body: T) -> Request<T> {
        self.inner.map(|()| body)
    }

    /// Returns a reference to the request's HTTP method.
    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    /// Returns a reference to the request's URI.
    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    /// Returns the request's HTTP version.
    pub fn version(&self) -> Version {
        self.inner.version()
    }

    /// Returns a reference to the request's headers.
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Returns the caller's address, if the event carried one.
    pub fn source_ip(&self) -> Option<IpAddr> {
        self.inner.extensions().get::<SourceIp>().map(|source_ip| source_ip.0)
    }
}

/// Converts request parts into a RequestHeader.
impl From<Parts> for RequestHeader {
    #[inline]
    fn from(parts: Parts) -> Self {
        Self { inner: Request::from_parts(parts, ()) }
    }
}

/// Converts a bodyless request into a RequestHeader.
impl From<Request<()>> for RequestHeader {
    #[inline]
    fn from(inner: Request<()>) -> Self {
        Self { inner }
    }
}

fn strip_base_path<'a>(path: &'a str, base_path: Option<&str>) -> &'a str {
    let Some(base_path) = base_path.map(|base| base.trim_end_matches('/')).filter(|base| !base.is_empty()) else {
        return path;
    };

    match path.strip_prefix(base_path) {
        Some("") => "/",
        Some(rest) if rest.starts_with('/') => rest,
        _ => path,
    }
}

/// Percent-encodes the bytes a uri path may not carry literally.
///
/// Event paths are usually already decoded, so spaces and non-ascii characters
/// show up raw. Existing `%` escapes are left alone.
fn encode_path(path: &str) -> Cow<'_, str> {
    let needs_slash = !path.starts_with('/');
    let needs_encoding = path.bytes().any(|byte| !is_path_byte(byte));

    if !needs_slash && !needs_encoding {
        return Cow::Borrowed(path);
    }

    let mut encoded = String::with_capacity(path.len() + 8);
    if needs_slash {
        encoded.push('/');
    }
    for byte in path.bytes() {
        if is_path_byte(byte) {
            encoded.push(char::from(byte));
        } else {
            let _ = write!(encoded, "%{byte:02X}");
        }
    }
    Cow::Owned(encoded)
}

fn is_path_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || b"-._~!$&'()*+,;=:@/%".contains(&byte)
}
