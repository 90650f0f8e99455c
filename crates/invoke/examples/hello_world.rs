//! Reads an API Gateway event from stdin, invokes a handler with it and prints
//! the response payload.
//!
//! ```text
//! echo '{"httpMethod":"POST","path":"/hello","body":"micro"}' | cargo run --example hello_world
//! ```

use http::{Request, StatusCode};
use http_body_util::BodyExt;
use micro_invoke::format::EventFormat;
use micro_invoke::handler::stream_fn;
use micro_invoke::invoke::Invoker;
use micro_invoke::options::Options;
use micro_invoke::protocol::body::ReqBody;
use micro_invoke::protocol::{BoxError, InvocationContext, StatusError};
use micro_invoke::sink::ResponseSink;
use tokio::io::AsyncReadExt;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() {
    // Initialize logging
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).with_writer(std::io::stderr).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let mut input = String::new();
    if let Err(e) = tokio::io::stdin().read_to_string(&mut input).await {
        error!(cause = %e, "can't read event from stdin");
        return;
    }

    let payload: serde_json::Value = match serde_json::from_str(&input) {
        Ok(payload) => payload,
        Err(e) => {
            error!(cause = %e, "stdin is not a json event");
            return;
        }
    };

    let options = Options::builder().binary_from_env().build();
    let invoker = Invoker::new(stream_fn(hello_world), options);

    let format = EventFormat::detect(&payload);
    info!(?format, "invoke with event from stdin");
    let response = invoker.invoke_json(format, payload, InvocationContext::empty()).await;
    println!("{response}");
}

async fn hello_world(request: Request<ReqBody>, response: ResponseSink) -> Result<(), BoxError> {
    let path = request.uri().path().to_string();
    info!(path = %path, "request path");

    if path != "/hello" {
        return Err(StatusError::new(StatusCode::NOT_FOUND, format!("no route for {path}")).into());
    }

    let body = request.into_body().collect().await?.to_bytes();
    let name = std::str::from_utf8(&body)?.trim();
    let name = if name.is_empty() { "world" } else { name };

    response.set_header("x-powered-by", "micro-invoke")?;
    response.send_text(format!("Hello {name}!\r\n"))?;
    Ok(())
}
