use std::collections::BTreeMap;

use http::header::SET_COOKIE;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::protocol::{Event, EventBody, EventError, InvocationResult, Values, append, header};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct HttpApiRequest {
    raw_path: Option<String>,
    raw_query_string: Option<String>,
    cookies: Option<Vec<String>>,
    headers: Option<BTreeMap<String, String>>,
    body: Option<String>,
    is_base64_encoded: bool,
    request_context: Option<RequestContext>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RequestContext {
    http: Option<HttpDescription>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct HttpDescription {
    method: Option<String>,
    path: Option<String>,
    source_ip: Option<String>,
}

pub(crate) fn decode(payload: Value) -> Result<Event, EventError> {
    let request: HttpApiRequest = serde_json::from_value(payload).map_err(EventError::invalid_format)?;
    let http = request.request_context.and_then(|ctx| ctx.http).unwrap_or_default();

    let mut query = BTreeMap::new();
    if let Some(raw_query) = request.raw_query_string.as_deref().filter(|raw| !raw.is_empty()) {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(raw_query).map_err(EventError::invalid_format)?;
        for (name, value) in pairs {
            append(&mut query, name, value);
        }
    }

    let mut headers: BTreeMap<String, Values> =
        request.headers.unwrap_or_default().into_iter().map(|(name, value)| (name, Values::One(value))).collect();
    if let Some(cookies) = request.cookies.filter(|cookies| !cookies.is_empty()) {
        append(&mut headers, "cookie".to_string(), cookies.join("; "));
    }

    Ok(Event {
        method: http.method,
        path: request.raw_path.or(http.path),
        query,
        headers,
        body: request.body.map(EventBody::Text),
        is_base64_encoded: request.is_base64_encoded,
        source_ip: http.source_ip,
    })
}

pub(crate) fn encode(result: &InvocationResult) -> Value {
    json!({
        "statusCode": result.status_code(),
        "headers": header::joined(result.headers(), &[SET_COOKIE]),
        "cookies": header::values_of(result.headers(), &SET_COOKIE),
        "body": result.body(),
        "isBase64Encoded": result.is_base64_encoded(),
    })
}
