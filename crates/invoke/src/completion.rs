//! Settle-once completion of an invocation.
//!
//! A handler can say it is done in several ways: ending the response sink,
//! resolving the future it returned, calling the [`Done`] callback, or failing
//! through any of those. [`Completion`] collapses them into one outcome: the
//! first signal settles the invocation, every later one is ignored.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::channel::oneshot;
use tracing::debug;

use crate::protocol::{BoxError, InvokeError, InvokeResult};
use crate::sink::ResponseSink;
use crate::utils::lock;

/// The writing side of a settle-once cell.
///
/// Cloning is cheap, every clone settles the same cell.
#[derive(Debug, Clone)]
pub struct Completion {
    sender: Arc<Mutex<Option<oneshot::Sender<InvokeResult>>>>,
}

/// The reading side of a settle-once cell, resolves with the first outcome.
#[derive(Debug)]
pub struct Settled {
    receiver: oneshot::Receiver<InvokeResult>,
}

impl Completion {
    pub fn channel() -> (Completion, Settled) {
        let (sender, receiver) = oneshot::channel();
        (Completion { sender: Arc::new(Mutex::new(Some(sender))) }, Settled { receiver })
    }

    /// Settles the cell with `outcome`.
    ///
    /// Returns false, dropping `outcome`, when the cell was already settled.
    pub fn settle(&self, outcome: InvokeResult) -> bool {
        let Some(sender) = lock(&self.sender).take() else {
            debug!(is_ok = outcome.is_ok(), "ignore completion signal, invocation already settled");
            return false;
        };

        if sender.send(outcome).is_err() {
            debug!("settled after the invoker stopped waiting");
        }
        true
    }

    pub fn is_settled(&self) -> bool {
        lock(&self.sender).is_none()
    }
}

impl Future for Settled {
    type Output = InvokeResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.receiver.poll_unpin(cx).map(|received| received.unwrap_or_else(|_canceled| Err(InvokeError::Abandoned)))
    }
}

/// The completion callback handed to callback-style handlers.
///
/// [`succeed`](Self::succeed) finalizes the response like
/// [`ResponseSink::end`]; [`fail`](Self::fail) settles the invocation with an
/// error. Whichever signal comes first wins.
#[derive(Debug, Clone)]
pub struct Done {
    sink: ResponseSink,
}

impl Done {
    pub(crate) fn new(sink: ResponseSink) -> Self {
        Self { sink }
    }

    pub fn succeed(self) {
        self.sink.end();
    }

    pub fn fail<E: Into<BoxError>>(self, error: E) {
        self.sink.fail(error);
    }

    /// Succeeds on `Ok`, fails on `Err`.
    pub fn call<E: Into<BoxError>>(self, result: Result<(), E>) {
        match result {
            Ok(()) => self.succeed(),
            Err(e) => self.fail(e),
        }
    }
}
