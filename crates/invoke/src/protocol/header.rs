//! Header map renderings used by invocation results.
//!
//! `http::HeaderMap` keeps repeated headers as separate values. Results go out
//! as JSON, so these helpers render a map either with multi-value arrays or with
//! the values joined into one string.

use http::HeaderMap;
use serde_json::{Map, Value};

/// Every value of `name`, lossily decoded as UTF-8, in insertion order.
pub(crate) fn values_of(headers: &HeaderMap, name: &http::HeaderName) -> Vec<String> {
    headers.get_all(name).iter().map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned()).collect()
}

/// Single values as strings, repeated values as arrays.
pub(crate) fn compact(headers: &HeaderMap) -> Map<String, Value> {
    headers
        .keys()
        .map(|name| {
            let mut values = values_of(headers, name);
            let value = if values.len() == 1 {
                Value::String(values.remove(0))
            } else {
                Value::Array(values.into_iter().map(Value::String).collect())
            };
            (name.as_str().to_string(), value)
        })
        .collect()
}

/// Every header as an array, even when it has a single value.
pub(crate) fn multi_value(headers: &HeaderMap) -> Map<String, Value> {
    headers
        .keys()
        .map(|name| {
            let values = values_of(headers, name).into_iter().map(Value::String).collect();
            (name.as_str().to_string(), Value::Array(values))
        })
        .collect()
}

/// Repeated values joined with `", "`, skipping the headers in `exclude`.
pub(crate) fn joined(headers: &HeaderMap, exclude: &[http::HeaderName]) -> Map<String, Value> {
    headers
        .keys()
        .filter(|name| !exclude.contains(name))
        .map(|name| (name.as_str().to_string(), Value::String(values_of(headers, name).join(", "))))
        .collect()
}
