//! Handler traits and the adapters for the supported entry point styles.
//!
//! Every handler is driven through the same capability interface, [`Handler`]:
//! it receives the synthesized request, the response sink and a [`Done`]
//! callback, and it may signal completion through any of them. Three adapters
//! cover the usual ways handlers are written:
//!
//! - [`stream_fn`]: `async fn(Request<ReqBody>, ResponseSink) -> Result<(), E>`,
//!   the handler writes to the sink and returning `Ok` finishes the response
//! - [`make_handler`]: `async fn(Request<ReqBody>) -> Result<Response<B>, E>`,
//!   the returned response is copied into the sink
//! - [`callback_fn`]: `fn(Request<ReqBody>, ResponseSink, Done) -> Result<(), E>`,
//!   the handler calls `done` (or ends the sink) whenever it is finished

use std::future::Future;

use async_trait::async_trait;
use bytes::Buf;
use http::header::CONTENT_LENGTH;
use http::{Request, Response};
use http_body::Body;
use http_body_util::BodyExt;

use crate::completion::Done;
use crate::protocol::BoxError;
use crate::protocol::body::ReqBody;
use crate::sink::ResponseSink;

/// A streaming HTTP handler.
///
/// Returning `Ok(())` finishes the response if nothing else did; returning an
/// error settles the invocation with that error. A [`StatusError`](crate::protocol::StatusError)
/// keeps its status through [`InvokeError::into_result`](crate::protocol::InvokeError::into_result).
#[async_trait]
pub trait Handler: Send + Sync {
    type Error: Into<BoxError>;

    async fn call(&self, req: Request<ReqBody>, res: ResponseSink, done: Done) -> Result<(), Self::Error>;

    /// Whether returning `Ok(())` from [`call`](Self::call) finishes the response.
    ///
    /// Handlers that signal only through [`Done`] or the sink return false.
    fn finishes_on_return(&self) -> bool {
        true
    }
}

#[derive(Debug)]
pub struct StreamFn<F> {
    f: F,
}

#[async_trait]
impl<F, Fut, Err> Handler for StreamFn<F>
where
    F: Fn(Request<ReqBody>, ResponseSink) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), Err>> + Send,
    Err: Into<BoxError>,
{
    type Error = Err;

    async fn call(&self, req: Request<ReqBody>, res: ResponseSink, _done: Done) -> Result<(), Self::Error> {
        (self.f)(req, res).await
    }
}

/// Wraps an async function that writes its response into the sink.
pub fn stream_fn<F, Fut, Err>(f: F) -> StreamFn<F>
where
    F: Fn(Request<ReqBody>, ResponseSink) -> Fut,
    Fut: Future<Output = Result<(), Err>>,
    Err: Into<BoxError>,
{
    StreamFn { f }
}

#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

#[async_trait]
impl<RespBody, Err, F, Fut> Handler for HandlerFn<F>
where
    RespBody: Body + Send,
    RespBody::Data: Send,
    RespBody::Error: Into<BoxError>,
    F: Fn(Request<ReqBody>) -> Fut + Send + Sync,
    Err: Into<BoxError>,
    Fut: Future<Output = Result<Response<RespBody>, Err>> + Send,
{
    type Error = BoxError;

    async fn call(&self, req: Request<ReqBody>, res: ResponseSink, _done: Done) -> Result<(), Self::Error> {
        let response = (self.f)(req).await.map_err(Into::into)?;
        write_response(response, &res).await?;
        res.end();
        Ok(())
    }
}

/// Wraps an async function returning an `http::Response`.
pub fn make_handler<F, RespBody, Err, Ret>(f: F) -> HandlerFn<F>
where
    RespBody: Body,
    Err: Into<BoxError>,
    Ret: Future<Output = Result<Response<RespBody>, Err>>,
    F: Fn(Request<ReqBody>) -> Ret,
{
    HandlerFn { f }
}

#[derive(Debug)]
pub struct CallbackFn<F> {
    f: F,
}

#[async_trait]
impl<F, Err> Handler for CallbackFn<F>
where
    F: Fn(Request<ReqBody>, ResponseSink, Done) -> Result<(), Err> + Send + Sync,
    Err: Into<BoxError>,
{
    type Error = Err;

    async fn call(&self, req: Request<ReqBody>, res: ResponseSink, done: Done) -> Result<(), Self::Error> {
        (self.f)(req, res, done)
    }

    fn finishes_on_return(&self) -> bool {
        false
    }
}

/// Wraps a synchronous function that signals completion through [`Done`] or the sink.
///
/// An error returned before any signal settles the invocation; afterwards only
/// `done` and the sink can settle it. Once every handle to `done` and the sink
/// is dropped without a signal, the invocation is abandoned.
pub fn callback_fn<F, Err>(f: F) -> CallbackFn<F>
where
    F: Fn(Request<ReqBody>, ResponseSink, Done) -> Result<(), Err>,
    Err: Into<BoxError>,
{
    CallbackFn { f }
}

/// Copies status, headers and body frames of `response` into `res`.
///
/// A `content-length` is added from the body's exact size hint when the
/// response has none. Trailers are dropped.
async fn write_response<B>(response: Response<B>, res: &ResponseSink) -> Result<(), BoxError>
where
    B: Body + Send,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    let (parts, body) = response.into_parts();

    res.set_status(parts.status)?;
    for (name, value) in &parts.headers {
        res.append_header(name.clone(), value.clone())?;
    }

    if !parts.headers.contains_key(CONTENT_LENGTH)
        && let Some(length) = body.size_hint().exact()
    {
        res.set_header(CONTENT_LENGTH, length)?;
    }

    let mut body = std::pin::pin!(body);
    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(Into::into)?;
        if let Ok(mut data) = frame.into_data() {
            res.write(data.copy_to_bytes(data.remaining()));
        }
    }

    Ok(())
}
