//! The opaque per-invocation context.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A value the caller hands to an invocation, passed through untouched.
///
/// The invoker inserts it into the request extensions and gives it to every
/// interceptor, so collaborators can recover whatever the outer transport
/// supplied (deadline, request id, credentials) with [`get`](Self::get).
#[derive(Clone, Default)]
pub struct InvocationContext {
    inner: Option<Arc<dyn Any + Send + Sync>>,
}

impl InvocationContext {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self { inner: Some(Arc::new(value)) }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the context value if it is a `T`.
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.inner.as_deref()?.downcast_ref::<T>()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_none()
    }
}

impl fmt::Debug for InvocationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationContext").field("is_empty", &self.is_empty()).finish()
    }
}
