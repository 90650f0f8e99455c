//! Invoker configuration.

use std::sync::Arc;

use tracing::debug;

use crate::binary::BinaryConfig;
use crate::interceptor::{Interceptor, Interceptors, InterceptorsBuilder};

/// Environment variable read by [`OptionsBuilder::binary_from_env`].
pub const BINARY_CONTENT_TYPES_ENV: &str = "BINARY_CONTENT_TYPES";

/// Options shared by every invocation of one [`Invoker`](crate::invoke::Invoker).
#[derive(Debug, Clone, Default)]
pub struct Options {
    binary: BinaryConfig,
    base_path: Option<String>,
    interceptors: Arc<Interceptors>,
}

impl Options {
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::new()
    }

    pub fn binary(&self) -> &BinaryConfig {
        &self.binary
    }

    /// Prefix stripped from request paths before they reach the handler.
    pub fn base_path(&self) -> Option<&str> {
        self.base_path.as_deref()
    }

    pub fn interceptors(&self) -> &Interceptors {
        &self.interceptors
    }
}

pub struct OptionsBuilder {
    binary: BinaryConfig,
    base_path: Option<String>,
    interceptors: InterceptorsBuilder,
}

impl OptionsBuilder {
    fn new() -> Self {
        Self { binary: BinaryConfig::default(), base_path: None, interceptors: Interceptors::builder() }
    }

    /// Sets the binary classification, `false` and `true` convert to never and always.
    #[must_use]
    pub fn binary(mut self, binary: impl Into<BinaryConfig>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Reads binary content type patterns from `BINARY_CONTENT_TYPES`.
    ///
    /// The variable holds a comma separated list such as `image/*,application/pdf`.
    /// When it is unset the current setting is kept.
    #[must_use]
    pub fn binary_from_env(self) -> Self {
        match std::env::var(BINARY_CONTENT_TYPES_ENV) {
            Ok(raw) => {
                let patterns = parse_content_types(&raw);
                debug!(?patterns, "read binary content types from environment");
                self.binary(BinaryConfig::Patterns(patterns))
            }
            Err(_) => self,
        }
    }

    #[must_use]
    pub fn base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    /// Appends an interceptor, it runs after the ones already added.
    #[must_use]
    pub fn interceptor<I: Interceptor + 'static>(mut self, interceptor: I) -> Self {
        self.interceptors = self.interceptors.add_last(interceptor);
        self
    }

    pub fn build(self) -> Options {
        Options { binary: self.binary, base_path: self.base_path, interceptors: Arc::new(self.interceptors.build()) }
    }
}

fn parse_content_types(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|pattern| !pattern.is_empty()).map(str::to_string).collect()
}
