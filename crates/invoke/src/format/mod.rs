//! Provider payload formats.
//!
//! Invocations usually arrive as JSON shaped by the gateway in front of the
//! function. This module turns those payloads into an [`Event`] and turns an
//! [`InvocationResult`] back into the payload the gateway expects.
//!
//! - [`EventFormat::ApiGatewayV1`]: REST API proxy integration (payload 1.0)
//! - [`EventFormat::ApiGatewayV2`]: HTTP API proxy integration (payload 2.0)

use std::collections::BTreeMap;

use serde_json::Value;

use crate::protocol::{Event, EventError, InvocationResult, Values};

mod api_gateway_v1;
mod api_gateway_v2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventFormat {
    #[default]
    ApiGatewayV1,
    ApiGatewayV2,
}

impl EventFormat {
    /// Guesses the format of `payload` from its `version` field, `"2.0"` is v2.
    pub fn detect(payload: &Value) -> Self {
        match payload.get("version").and_then(Value::as_str) {
            Some("2.0") => Self::ApiGatewayV2,
            _ => Self::ApiGatewayV1,
        }
    }

    pub fn decode(self, payload: Value) -> Result<Event, EventError> {
        match self {
            Self::ApiGatewayV1 => api_gateway_v1::decode(payload),
            Self::ApiGatewayV2 => api_gateway_v2::decode(payload),
        }
    }

    pub fn encode(self, result: &InvocationResult) -> Value {
        match self {
            Self::ApiGatewayV1 => api_gateway_v1::encode(result),
            Self::ApiGatewayV2 => api_gateway_v2::encode(result),
        }
    }
}

/// Merges single and multi value maps, the multi value entry wins for a key present in both.
fn merge_values(
    single: Option<BTreeMap<String, String>>,
    multi: Option<BTreeMap<String, Vec<String>>>,
) -> BTreeMap<String, Values> {
    let mut merged = multi
        .unwrap_or_default()
        .into_iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(name, values)| (name, Values::Many(values)))
        .collect::<BTreeMap<_, _>>();

    for (name, value) in single.unwrap_or_default() {
        merged.entry(name).or_insert(Values::One(value));
    }
    merged
}
