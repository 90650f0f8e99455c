//! Text or binary classification of response bodies.
//!
//! Invocation results carry their body as a string. Bodies that are not text
//! have to be base64 encoded to survive that, and [`classify`] decides which
//! is which from the response headers and the configured [`BinaryConfig`].

use std::fmt;
use std::sync::Arc;

use http::HeaderMap;
use http::header::CONTENT_TYPE;

use crate::options::Options;

type Predicate = dyn Fn(&HeaderMap, &Options) -> bool + Send + Sync;

/// How response bodies are classified as binary.
#[derive(Clone)]
pub enum BinaryConfig {
    /// Content types that are binary, either exact (`application/pdf`) or a
    /// whole primary type (`image/*`). Matching is case-sensitive.
    Patterns(Vec<String>),
    /// Nothing is binary, whatever the content type.
    Never,
    /// Everything is binary.
    Always,
    /// A custom policy, called once per response.
    Predicate(Arc<Predicate>),
}

impl BinaryConfig {
    pub fn patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Patterns(patterns.into_iter().map(Into::into).collect())
    }

    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&HeaderMap, &Options) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(f))
    }
}

/// Defaults to an empty pattern list, so nothing is binary.
impl Default for BinaryConfig {
    fn default() -> Self {
        Self::Patterns(Vec::new())
    }
}

impl From<bool> for BinaryConfig {
    fn from(binary: bool) -> Self {
        if binary { Self::Always } else { Self::Never }
    }
}

impl fmt::Debug for BinaryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Patterns(patterns) => f.debug_tuple("Patterns").field(patterns).finish(),
            Self::Never => f.write_str("Never"),
            Self::Always => f.write_str("Always"),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Returns true when a response with `headers` must be base64 encoded.
///
/// With a pattern list the `content-type` is taken without its parameters, so
/// `application/json; charset=utf-8` is matched as `application/json`. A
/// response without a content type is text.
pub fn classify(headers: &HeaderMap, options: &Options) -> bool {
    match options.binary() {
        BinaryConfig::Never => false,
        BinaryConfig::Always => true,
        BinaryConfig::Predicate(predicate) => predicate(headers, options),
        BinaryConfig::Patterns(patterns) => {
            let Some(content_type) = content_type(headers) else {
                return false;
            };
            patterns.iter().any(|pattern| matches(pattern, content_type))
        }
    }
}

fn content_type(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let essence = value.split(';').next().unwrap_or_default().trim();
    (!essence.is_empty()).then_some(essence)
}

fn matches(pattern: &str, content_type: &str) -> bool {
    if pattern == content_type {
        return true;
    }

    match pattern.strip_suffix("/*") {
        Some(primary) => content_type.split_once('/').is_some_and(|(content_primary, _)| content_primary == primary),
        None => false,
    }
}
