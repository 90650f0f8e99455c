//! The response side handed to handlers.
//!
//! [`ResponseSink`] plays the part of a streaming response: handlers set the
//! status, set or append headers, write body chunks and finally end it. Nothing
//! is sent anywhere; the writes accumulate until [`end`](ResponseSink::end)
//! freezes them into an [`InvocationResult`] and settles the invocation.
//!
//! # States
//!
//! - `Open`: status, header and body writes are accepted
//! - `Finalized`: status and header writes fail with [`SinkError::Finalized`],
//!   body writes are dropped, further `end` calls do nothing

use std::fmt::{self, Display};
use std::sync::{Arc, Mutex};

use bytes::{Bytes, BytesMut};
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::Serialize;
use tracing::{debug, trace};

use crate::binary::classify;
use crate::completion::Completion;
use crate::options::Options;
use crate::protocol::{BoxError, InvocationResult, InvokeError, InvokeResult, SinkError};
use crate::utils::{ensure, lock};

/// A clonable handle to the response of one invocation.
///
/// Clones share the same state, so a handler can move one into a spawned task
/// and end the response from there.
#[derive(Clone)]
pub struct ResponseSink {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<SinkState>,
    options: Arc<Options>,
    completion: Completion,
}

#[derive(Debug)]
struct SinkState {
    status: StatusCode,
    headers: HeaderMap,
    chunks: Vec<Bytes>,
    finalized: bool,
}

impl ResponseSink {
    pub(crate) fn new(options: Arc<Options>, completion: Completion) -> Self {
        let state = SinkState { status: StatusCode::OK, headers: HeaderMap::new(), chunks: Vec::new(), finalized: false };
        Self { inner: Arc::new(Inner { state: Mutex::new(state), options, completion }) }
    }

    pub fn status(&self) -> StatusCode {
        lock(&self.inner.state).status
    }

    /// Sets the status, the last call before the response ends wins.
    pub fn set_status(&self, status: StatusCode) -> Result<(), SinkError> {
        let mut state = lock(&self.inner.state);
        ensure!(!state.finalized, SinkError::finalized("set_status"));
        state.status = status;
        Ok(())
    }

    /// Returns the first value of the header `name`.
    pub fn header<K: AsRef<str>>(&self, name: K) -> Option<HeaderValue> {
        lock(&self.inner.state).headers.get(name.as_ref()).cloned()
    }

    /// Returns a copy of the headers written so far.
    pub fn headers(&self) -> HeaderMap {
        lock(&self.inner.state).headers.clone()
    }

    /// Sets a header, replacing every value it had.
    pub fn set_header<K, V>(&self, name: K, value: V) -> Result<(), SinkError>
    where
        K: TryInto<HeaderName>,
        K::Error: Display,
        V: TryInto<HeaderValue>,
        V::Error: Display,
    {
        let mut state = lock(&self.inner.state);
        ensure!(!state.finalized, SinkError::finalized("set_header"));
        let (name, value) = header_pair(name, value)?;
        state.headers.insert(name, value);
        Ok(())
    }

    /// Appends a header value, keeping the values already set (`set-cookie`).
    pub fn append_header<K, V>(&self, name: K, value: V) -> Result<(), SinkError>
    where
        K: TryInto<HeaderName>,
        K::Error: Display,
        V: TryInto<HeaderValue>,
        V::Error: Display,
    {
        let mut state = lock(&self.inner.state);
        ensure!(!state.finalized, SinkError::finalized("append_header"));
        let (name, value) = header_pair(name, value)?;
        state.headers.append(name, value);
        Ok(())
    }

    pub fn remove_header<K: AsRef<str>>(&self, name: K) -> Result<(), SinkError> {
        let mut state = lock(&self.inner.state);
        ensure!(!state.finalized, SinkError::finalized("remove_header"));
        state.headers.remove(name.as_ref());
        Ok(())
    }

    /// Appends a body chunk. Chunks written after the response ended are dropped.
    pub fn write<B: Into<Bytes>>(&self, chunk: B) {
        let chunk = chunk.into();
        let mut state = lock(&self.inner.state);
        if state.finalized {
            trace!(size = chunk.len(), "drop body write after response finalized");
            return;
        }
        if !chunk.is_empty() {
            state.chunks.push(chunk);
        }
    }

    /// Finalizes the response and settles the invocation with it.
    ///
    /// Ending an already finalized response does nothing.
    pub fn end(&self) {
        let (status, headers, body) = {
            let mut state = lock(&self.inner.state);
            if state.finalized {
                trace!("ignore end, response already finalized");
                return;
            }
            state.finalized = true;
            (state.status, state.headers.clone(), concat(std::mem::take(&mut state.chunks)))
        };

        let binary = classify(&headers, &self.inner.options);
        debug!(status = status.as_u16(), size = body.len(), binary, "response finalized");

        let result = InvocationResult::from_bytes(status, headers, &body, binary);
        self.inner.completion.settle(Ok(result));
    }

    /// Writes a last chunk and ends the response.
    pub fn end_with<B: Into<Bytes>>(&self, chunk: B) {
        self.write(chunk);
        self.end();
    }

    /// Abandons the response and settles the invocation with `error`.
    pub fn fail<E: Into<BoxError>>(&self, error: E) {
        {
            let mut state = lock(&self.inner.state);
            state.finalized = true;
            state.chunks.clear();
        }
        self.inner.completion.settle(Err(InvokeError::handler(error)));
    }

    pub(crate) fn settle(&self, outcome: InvokeResult) -> bool {
        self.inner.completion.settle(outcome)
    }

    pub fn is_finished(&self) -> bool {
        lock(&self.inner.state).finalized
    }

    /// Sends `text` as `text/plain; charset=utf-8` and ends the response.
    pub fn send_text<S: Into<String>>(&self, text: S) -> Result<(), SinkError> {
        let text = text.into();
        self.set_header(CONTENT_TYPE, mime::TEXT_PLAIN_UTF_8.as_ref())?;
        self.set_header(CONTENT_LENGTH, text.len())?;
        self.end_with(text);
        Ok(())
    }

    /// Serializes `value` as `application/json; charset=utf-8` and ends the response.
    pub fn send_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), SinkError> {
        let body = serde_json::to_vec(value).map_err(SinkError::invalid_body)?;
        let content_type = format!("{}; charset=utf-8", mime::APPLICATION_JSON);
        self.set_header(CONTENT_TYPE, content_type)?;
        self.set_header(CONTENT_LENGTH, body.len())?;
        self.end_with(body);
        Ok(())
    }

    /// Sets `status` and ends the response with its reason phrase as body.
    pub fn send_status(&self, status: StatusCode) -> Result<(), SinkError> {
        self.set_status(status)?;
        self.send_text(status.canonical_reason().unwrap_or_else(|| status.as_str()))
    }
}

impl fmt::Debug for ResponseSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.inner.state);
        f.debug_struct("ResponseSink").field("status", &state.status).field("finalized", &state.finalized).finish()
    }
}

fn header_pair<K, V>(name: K, value: V) -> Result<(HeaderName, HeaderValue), SinkError>
where
    K: TryInto<HeaderName>,
    K::Error: Display,
    V: TryInto<HeaderValue>,
    V::Error: Display,
{
    let name = name.try_into().map_err(SinkError::invalid_header)?;
    let value = value.try_into().map_err(SinkError::invalid_header)?;
    Ok((name, value))
}

fn concat(mut chunks: Vec<Bytes>) -> Bytes {
    match chunks.len() {
        0 => Bytes::new(),
        1 => chunks.remove(0),
        _ => {
            let mut buf = BytesMut::with_capacity(chunks.iter().map(Bytes::len).sum());
            for chunk in chunks {
                buf.extend_from_slice(&chunk);
            }
            buf.freeze()
        }
    }
}
