use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use http_body::{Body, Frame, SizeHint};
use tracing::trace;

use crate::protocol::{Event, EventBody, EventError};

/// ReqBody is the request body handed to handlers, synthesized from an [`Event`].
///
/// The whole body is known up front, but it is released the way a socket would
/// release it: nothing is delivered until the body is engaged, and engagement
/// only schedules delivery for the next turn of the executor.
///
/// # Lifecycle
///
/// 1. `Idle`: created by the invoker, nothing has been polled yet
/// 2. `Engaged`: the first poll wakes the task and returns `Pending`, so any
///    setup the handler does on that same turn happens before data arrives
/// 3. the next poll delivers the full body as a single data frame
/// 4. `Delivered`: every further poll reports end of stream
///
/// An empty body skips the data frame and goes straight to end of stream.
#[derive(Debug)]
pub struct ReqBody {
    state: State,
}

#[derive(Debug)]
enum State {
    Idle(Bytes),
    Engaged(Bytes),
    Delivered,
}

impl ReqBody {
    pub fn new(bytes: Bytes) -> Self {
        Self { state: State::Idle(bytes) }
    }

    pub fn empty() -> Self {
        Self::new(Bytes::new())
    }

    /// Decodes the event body, base64 first when the event says it is encoded.
    pub fn from_event(event: &Event) -> Result<Self, EventError> {
        let bytes = match &event.body {
            None => Bytes::new(),
            Some(body) if event.is_base64_encoded => {
                STANDARD.decode(body.as_bytes().trim_ascii()).map(Bytes::from).map_err(EventError::invalid_body)?
            }
            Some(EventBody::Text(text)) => Bytes::copy_from_slice(text.as_bytes()),
            Some(EventBody::Binary(raw)) => Bytes::copy_from_slice(raw),
        };

        Ok(Self::new(bytes))
    }

    /// Length of the decoded body in bytes, zero once delivered.
    pub fn len(&self) -> usize {
        match &self.state {
            State::Idle(bytes) | State::Engaged(bytes) => bytes.len(),
            State::Delivered => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true once the first poll has happened.
    pub fn is_engaged(&self) -> bool {
        !matches!(self.state, State::Idle(_))
    }
}

impl Default for ReqBody {
    fn default() -> Self {
        Self::empty()
    }
}

impl Body for ReqBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();

        match std::mem::replace(&mut this.state, State::Delivered) {
            State::Idle(bytes) => {
                this.state = State::Engaged(bytes);
                cx.waker().wake_by_ref();
                Poll::Pending
            }
            State::Engaged(bytes) if bytes.is_empty() => Poll::Ready(None),
            State::Engaged(bytes) => {
                trace!(size = bytes.len(), "deliver request body");
                Poll::Ready(Some(Ok(Frame::data(bytes))))
            }
            State::Delivered => Poll::Ready(None),
        }
    }

    fn is_end_stream(&self) -> bool {
        matches!(self.state, State::Delivered)
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(self.len() as u64)
    }
}
