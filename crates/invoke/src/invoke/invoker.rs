use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;
use tokio::select;
use tracing::{debug, error, info, trace, warn};

use crate::completion::{Completion, Done};
use crate::format::EventFormat;
use crate::handler::Handler;
use crate::interceptor::Interceptor;
use crate::options::Options;
use crate::protocol::body::ReqBody;
use crate::protocol::{Event, InvocationContext, InvokeError, InvokeResult, RequestHeader};
use crate::sink::ResponseSink;

/// Runs a [`Handler`] once per event.
///
/// Every invocation gets its own request body and response sink; nothing is
/// shared between invocations except the handler and the options. The handler
/// future is polled on the caller's task, nothing is spawned.
///
/// Panics raised by the handler, its setup, the binary classifier or an
/// interceptor settle [`InvokeError::Panic`] instead of unwinding into the
/// caller.
///
/// No deadline is imposed: a handler that keeps a response handle but never
/// signals completion keeps the invocation pending. Callers that own a
/// deadline race it, for example with `tokio::time::timeout`. Once every
/// handle is dropped without a signal the invocation settles
/// [`InvokeError::Abandoned`].
#[derive(Debug)]
pub struct Invoker<H> {
    handler: H,
    options: Arc<Options>,
}

impl<H: Handler> Invoker<H> {
    pub fn new(handler: H, options: Options) -> Self {
        Self { handler, options: Arc::new(options) }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Invokes the handler with `event` and returns the first completion outcome.
    ///
    /// Response interceptors see the outcome, error or not, before it is returned.
    pub async fn invoke(&self, event: &Event, ctx: InvocationContext) -> InvokeResult {
        let mut outcome = self.do_invoke(event, &ctx).await;

        let intercepted = AssertUnwindSafe(self.options.interceptors().on_response(&mut outcome, &ctx)).catch_unwind().await;
        if let Err(payload) = intercepted {
            outcome = Err(panicked("response interceptor", payload));
        }

        match &outcome {
            Ok(result) => debug!(status = result.status_code(), binary = result.is_base64_encoded(), "invocation settled"),
            Err(e) => warn!(cause = %e, "invocation failed"),
        }
        outcome
    }

    /// Invokes the handler and hands the outcome to `callback` instead of returning it.
    ///
    /// This is [`invoke`](Self::invoke) with the outcome delivered through a
    /// callback; the returned future still has to be driven by the caller.
    pub async fn invoke_with<F>(&self, event: &Event, ctx: InvocationContext, callback: F)
    where
        F: FnOnce(InvokeResult),
    {
        callback(self.invoke(event, ctx).await);
    }

    /// Decodes a raw provider payload, invokes the handler and encodes the result.
    ///
    /// Errors are translated with [`InvokeError::into_result`], so the returned
    /// value is always a well formed response payload for `format`.
    pub async fn invoke_json(&self, format: EventFormat, payload: Value, ctx: InvocationContext) -> Value {
        let outcome = match format.decode(payload) {
            Ok(event) => self.invoke(&event, ctx).await,
            Err(e) => {
                warn!(?format, cause = %e, "can't decode event payload");
                Err(e.into())
            }
        };

        let result = outcome.unwrap_or_else(InvokeError::into_result);
        format.encode(&result)
    }

    async fn do_invoke(&self, event: &Event, ctx: &InvocationContext) -> InvokeResult {
        let body = ReqBody::from_event(event)?;
        let header = RequestHeader::from_event(event, self.options.base_path(), body.len())?;
        info!(method = %header.method(), uri = %header.uri(), body_size = body.len(), "invoke handler");

        let mut request = header.body(body);
        request.extensions_mut().insert(ctx.clone());
        AssertUnwindSafe(self.options.interceptors().on_request(&mut request, ctx))
            .catch_unwind()
            .await
            .map_err(|payload| panicked("request interceptor", payload))?;

        let (completion, mut settled) = Completion::channel();
        let sink = ResponseSink::new(Arc::clone(&self.options), completion);
        let done = Done::new(sink.clone());

        // `call` itself runs inside the guard, not only the future it returns
        let handler_sink = sink.clone();
        let handle_future =
            AssertUnwindSafe(async move { self.handler.call(request, handler_sink, done).await }).catch_unwind();
        tokio::pin!(handle_future);

        // released once the handler returned, so only handles the handler kept can settle afterwards
        let mut sink = Some(sink);
        loop {
            select! {
                // biased ensures a settled outcome is taken before the handler is polled again
                biased;

                outcome = &mut settled => {
                    return outcome;
                }

                returned = &mut handle_future, if sink.is_some() => {
                    if let Some(sink) = sink.take() {
                        self.handler_returned(returned, sink);
                    }
                }
            }
        }
    }

    fn handler_returned(&self, returned: std::thread::Result<Result<(), H::Error>>, sink: ResponseSink) {
        match returned {
            Ok(Ok(())) if self.handler.finishes_on_return() => {
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| sink.end())) {
                    sink.settle(Err(panicked("response finalization", payload)));
                }
            }
            Ok(Ok(())) => trace!("handler returned, waiting for a completion signal"),
            Ok(Err(e)) => {
                sink.settle(Err(InvokeError::handler(e)));
            }
            Err(payload) => {
                sink.settle(Err(panicked("handler", payload)));
            }
        }
    }
}

fn panicked(site: &'static str, payload: Box<dyn Any + Send>) -> InvokeError {
    let e = InvokeError::panic(payload.as_ref());
    error!(site, cause = %e, "caught panic");
    e
}
