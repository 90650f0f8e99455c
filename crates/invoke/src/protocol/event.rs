//! The flat event descriptor an invocation starts from.
//!
//! An [`Event`] describes one incoming request: method, path, query
//! parameters, headers, body and the caller's address. Every field is
//! optional on the wire; missing fields fall back to defaults instead of
//! failing the invocation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::protocol::EventError;

/// One or many values for a header or query parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Values {
    One(String),
    Many(Vec<String>),
}

impl Values {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let slice = match self {
            Values::One(value) => std::slice::from_ref(value),
            Values::Many(values) => values.as_slice(),
        };
        slice.iter().map(String::as_str)
    }

    pub fn push(&mut self, value: String) {
        match self {
            Values::One(first) => {
                let first = std::mem::take(first);
                *self = Values::Many(vec![first, value]);
            }
            Values::Many(values) => values.push(value),
        }
    }
}

impl From<String> for Values {
    fn from(value: String) -> Self {
        Values::One(value)
    }
}

impl From<&str> for Values {
    fn from(value: &str) -> Self {
        Values::One(value.to_string())
    }
}

impl From<Vec<String>> for Values {
    fn from(values: Vec<String>) -> Self {
        Values::Many(values)
    }
}

/// The event body, either text or raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventBody {
    Text(String),
    Binary(Vec<u8>),
}

impl EventBody {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            EventBody::Text(text) => text.as_bytes(),
            EventBody::Binary(bytes) => bytes,
        }
    }
}

/// Describes one incoming request.
///
/// Header keys are matched case-insensitively once they reach the handler;
/// the descriptor keeps them as given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Event {
    pub method: Option<String>,
    pub path: Option<String>,
    pub query: BTreeMap<String, Values>,
    pub headers: BTreeMap<String, Values>,
    pub body: Option<EventBody>,
    pub is_base64_encoded: bool,
    pub source_ip: Option<String>,
}

impl Event {
    pub fn new<M: Into<String>, P: Into<String>>(method: M, path: P) -> Self {
        Self { method: Some(method.into()), path: Some(path.into()), ..Self::default() }
    }

    /// Adds a header value, keeping any values already present under the same key.
    #[must_use]
    pub fn header<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        append(&mut self.headers, name.into(), value.into());
        self
    }

    /// Adds a query parameter value, keeping earlier values of the same parameter.
    #[must_use]
    pub fn query<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        append(&mut self.query, name.into(), value.into());
        self
    }

    #[must_use]
    pub fn body<B: Into<String>>(mut self, body: B) -> Self {
        self.body = Some(EventBody::Text(body.into()));
        self.is_base64_encoded = false;
        self
    }

    /// Sets a body that is already base64 encoded.
    #[must_use]
    pub fn base64_body<B: Into<String>>(mut self, body: B) -> Self {
        self.body = Some(EventBody::Text(body.into()));
        self.is_base64_encoded = true;
        self
    }

    #[must_use]
    pub fn source_ip<S: Into<String>>(mut self, source_ip: S) -> Self {
        self.source_ip = Some(source_ip.into());
        self
    }

    pub fn method_or_default(&self) -> &str {
        self.method.as_deref().filter(|method| !method.is_empty()).unwrap_or("GET")
    }

    pub fn path_or_default(&self) -> &str {
        self.path.as_deref().filter(|path| !path.is_empty()).unwrap_or("/")
    }

    /// Renders the query parameters as an `application/x-www-form-urlencoded` string.
    ///
    /// Returns `None` when there are no parameters.
    pub fn query_string(&self) -> Result<Option<String>, EventError> {
        if self.query.is_empty() {
            return Ok(None);
        }

        let pairs = self
            .query
            .iter()
            .flat_map(|(name, values)| values.iter().map(move |value| (name.as_str(), value)))
            .collect::<Vec<_>>();

        serde_urlencoded::to_string(pairs).map(Some).map_err(EventError::invalid_uri)
    }
}

pub(crate) fn append(map: &mut BTreeMap<String, Values>, name: String, value: String) {
    match map.get_mut(&name) {
        Some(values) => values.push(value),
        None => {
            map.insert(name, Values::One(value));
        }
    }
}
