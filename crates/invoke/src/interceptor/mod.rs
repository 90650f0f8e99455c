//! Request and response hooks around every invocation.
//!
//! Interceptors see the synthesized request before the handler does and the
//! settled result before the caller does, which is where callers adjust what
//! the outer transport sent (rewrite a header, attach the raw event) or what
//! goes back (add a header, mask an error).

use std::fmt;

use async_trait::async_trait;
use http::Request;

use crate::protocol::body::ReqBody;
use crate::protocol::{InvocationContext, InvokeResult};

#[async_trait]
pub trait Interceptor: Send + Sync {
    async fn on_request(&self, _req: &mut Request<ReqBody>, _ctx: &InvocationContext) {}

    async fn on_response(&self, _result: &mut InvokeResult, _ctx: &InvocationContext) {}
}

#[derive(Default)]
pub struct Interceptors {
    inner: Vec<Box<dyn Interceptor>>,
}

#[async_trait]
impl Interceptor for Interceptors {
    async fn on_request(&self, req: &mut Request<ReqBody>, ctx: &InvocationContext) {
        for interceptor in &self.inner {
            interceptor.on_request(req, ctx).await;
        }
    }

    async fn on_response(&self, result: &mut InvokeResult, ctx: &InvocationContext) {
        for interceptor in &self.inner {
            interceptor.on_response(result, ctx).await;
        }
    }
}

impl Interceptors {
    pub fn builder() -> InterceptorsBuilder {
        InterceptorsBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl fmt::Debug for Interceptors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptors").field("len", &self.inner.len()).finish()
    }
}

pub struct InterceptorsBuilder {
    inner: Vec<Box<dyn Interceptor>>,
}

impl InterceptorsBuilder {
    fn new() -> Self {
        Self { inner: vec![] }
    }

    #[must_use]
    pub fn add_last<I: Interceptor + 'static>(mut self, interceptor: I) -> Self {
        self.inner.push(Box::new(interceptor));
        self
    }

    #[must_use]
    pub fn add_first<I: Interceptor + 'static>(mut self, interceptor: I) -> Self {
        self.inner.insert(0, Box::new(interceptor));
        self
    }

    pub fn build(self) -> Interceptors {
        Interceptors { inner: self.inner }
    }
}
