use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Value, json};

use crate::format::merge_values;
use crate::protocol::{Event, EventBody, EventError, InvocationResult, header};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ProxyRequest {
    http_method: Option<String>,
    path: Option<String>,
    query_string_parameters: Option<BTreeMap<String, String>>,
    multi_value_query_string_parameters: Option<BTreeMap<String, Vec<String>>>,
    headers: Option<BTreeMap<String, String>>,
    multi_value_headers: Option<BTreeMap<String, Vec<String>>>,
    body: Option<String>,
    is_base64_encoded: bool,
    request_context: Option<RequestContext>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RequestContext {
    identity: Option<Identity>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Identity {
    source_ip: Option<String>,
}

pub(crate) fn decode(payload: Value) -> Result<Event, EventError> {
    let request: ProxyRequest = serde_json::from_value(payload).map_err(EventError::invalid_format)?;

    Ok(Event {
        method: request.http_method,
        path: request.path,
        query: merge_values(request.query_string_parameters, request.multi_value_query_string_parameters),
        headers: merge_values(request.headers, request.multi_value_headers),
        body: request.body.map(EventBody::Text),
        is_base64_encoded: request.is_base64_encoded,
        source_ip: request.request_context.and_then(|ctx| ctx.identity).and_then(|identity| identity.source_ip),
    })
}

pub(crate) fn encode(result: &InvocationResult) -> Value {
    json!({
        "statusCode": result.status_code(),
        "multiValueHeaders": header::multi_value(result.headers()),
        "body": result.body(),
        "isBase64Encoded": result.is_base64_encoded(),
    })
}
