use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::Poll;

use bytes::Bytes;
use futures::FutureExt;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{Request, Response, StatusCode};
use http_body::Body;
use http_body_util::{BodyExt, Full};
use indoc::indoc;
use micro_invoke::binary::BinaryConfig;
use micro_invoke::completion::Done;
use micro_invoke::format::EventFormat;
use micro_invoke::handler::{Handler, callback_fn, make_handler, stream_fn};
use micro_invoke::invoke::Invoker;
use micro_invoke::options::Options;
use micro_invoke::protocol::body::ReqBody;
use micro_invoke::protocol::{BoxError, Event, InvocationContext, InvokeError, SinkError};
use micro_invoke::sink::ResponseSink;
use serde_json::{Value, json};

fn event() -> Event {
    Event::new("GET", "/")
}

#[tokio::test]
async fn teapot_status() {
    let invoker = Invoker::new(
        stream_fn(|_req: Request<ReqBody>, res: ResponseSink| async move { res.send_status(StatusCode::IM_A_TEAPOT) }),
        Options::default(),
    );

    let result = invoker.invoke(&event(), InvocationContext::empty()).await.unwrap();

    assert_eq!(result.status_code(), 418);
    assert_eq!(result.body(), "I'm a teapot");
    assert!(!result.is_base64_encoded());
}

#[tokio::test]
async fn json_response_headers() {
    let invoker = Invoker::new(
        stream_fn(|_req: Request<ReqBody>, res: ResponseSink| async move {
            res.set_header("X-Test-Header", "foo")?;
            res.send_json(&json!({ "test": "foo" }))
        }),
        Options::default(),
    );

    let result = invoker.invoke(&event(), InvocationContext::empty()).await.unwrap();

    assert_eq!(result.status(), StatusCode::OK);
    assert_eq!(result.body(), r#"{"test":"foo"}"#);
    assert_eq!(result.headers().get(CONTENT_TYPE).unwrap(), "application/json; charset=utf-8");
    assert_eq!(result.headers().get(CONTENT_LENGTH).unwrap(), "14");
    assert_eq!(result.headers().get("x-test-header").unwrap(), "foo");

    let payload = serde_json::to_value(&result).unwrap();
    assert_eq!(
        payload,
        json!({
            "statusCode": 200,
            "headers": {
                "content-length": "14",
                "content-type": "application/json; charset=utf-8",
                "x-test-header": "foo"
            },
            "body": "{\"test\":\"foo\"}",
            "isBase64Encoded": false
        })
    );
}

#[tokio::test]
async fn handler_error_is_reported() {
    let invoker = Invoker::new(
        make_handler(|_req: Request<ReqBody>| async {
            Err::<Response<Full<Bytes>>, _>(std::io::Error::other("database unavailable"))
        }),
        Options::default(),
    );

    let error = invoker.invoke(&event(), InvocationContext::empty()).await.unwrap_err();
    assert!(matches!(error, InvokeError::Handler { .. }));
    assert!(error.to_string().contains("database unavailable"));

    let result = error.into_result();
    assert_eq!(result.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(result.body(), "");

    // the invoker keeps serving after a failed invocation
    let invoker = Invoker::new(
        stream_fn(|_req: Request<ReqBody>, res: ResponseSink| async move { res.send_text("still alive") }),
        Options::default(),
    );
    assert_eq!(invoker.invoke(&event(), InvocationContext::empty()).await.unwrap().body(), "still alive");
}

#[tokio::test]
async fn header_lookup_is_case_insensitive() {
    let invoker = Invoker::new(
        stream_fn(|req: Request<ReqBody>, res: ResponseSink| async move {
            let request_id = req.headers().get("x-request-id").and_then(|value| value.to_str().ok()).unwrap_or_default();
            res.send_text(request_id.to_string())
        }),
        Options::default(),
    );

    let event = Event::new("GET", "/").header("X-Request-Id", "req-42");
    let result = invoker.invoke(&event, InvocationContext::empty()).await.unwrap();

    assert_eq!(result.body(), "req-42");
}

#[tokio::test]
async fn body_delivered_once() {
    let invoker = Invoker::new(
        stream_fn(|req: Request<ReqBody>, res: ResponseSink| async move {
            let mut body = req.into_body();
            let mut frames = 0;
            let mut received = Vec::new();
            while let Some(frame) = body.frame().await {
                frames += 1;
                received.extend_from_slice(&frame?.into_data().unwrap_or_default());
            }
            assert!(body.frame().await.is_none());
            assert!(body.is_end_stream());

            res.set_header("x-frames", frames)?;
            res.end_with(received);
            Ok::<_, BoxError>(())
        }),
        Options::default(),
    );

    let event = Event::new("POST", "/upload").body("chunked? never");
    let result = invoker.invoke(&event, InvocationContext::empty()).await.unwrap();

    assert_eq!(result.body(), "chunked? never");
    assert_eq!(result.headers().get("x-frames").unwrap(), "1");
}

#[test]
fn body_waits_for_first_poll() {
    let mut body = ReqBody::new(Bytes::from_static(b"payload"));
    assert!(!body.is_engaged());
    assert_eq!(body.size_hint().exact(), Some(7));

    let waker = futures::task::noop_waker_ref();
    let mut cx = std::task::Context::from_waker(waker);

    assert!(Pin::new(&mut body).poll_frame(&mut cx).is_pending());
    assert!(body.is_engaged());

    let Poll::Ready(Some(Ok(frame))) = Pin::new(&mut body).poll_frame(&mut cx) else {
        panic!("body should deliver its data on the second poll");
    };
    assert_eq!(frame.into_data().unwrap(), Bytes::from_static(b"payload"));
    assert!(matches!(Pin::new(&mut body).poll_frame(&mut cx), Poll::Ready(None)));
    assert!(matches!(Pin::new(&mut body).poll_frame(&mut cx), Poll::Ready(None)));
}

#[tokio::test]
async fn invocations_are_isolated() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let invoker = Invoker::new(
        stream_fn(move |req: Request<ReqBody>, res: ResponseSink| {
            let call = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if call == 0 {
                    res.set_status(StatusCode::CREATED)?;
                    res.set_header("x-first", "1")?;
                }
                let body = req.into_body().collect().await?.to_bytes();
                res.end_with(body);
                Ok::<_, BoxError>(())
            }
        }),
        Options::default(),
    );

    let first = invoker.invoke(&Event::new("POST", "/").body("one"), InvocationContext::empty()).await.unwrap();
    let second = invoker.invoke(&Event::new("POST", "/").body("two"), InvocationContext::empty()).await.unwrap();

    assert_eq!(first.status(), StatusCode::CREATED);
    assert_eq!(first.body(), "one");
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(second.body(), "two");
    assert!(second.headers().get("x-first").is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn concurrent_invocations_do_not_mix() {
    let invoker = Arc::new(Invoker::new(
        stream_fn(|req: Request<ReqBody>, res: ResponseSink| async move {
            let body = req.into_body().collect().await?.to_bytes();
            tokio::task::yield_now().await;
            res.end_with(body);
            Ok::<_, BoxError>(())
        }),
        Options::default(),
    ));

    let tasks = (0..16)
        .map(|i| {
            let invoker = Arc::clone(&invoker);
            tokio::spawn(async move {
                let event = Event::new("POST", "/").body(format!("body-{i}"));
                let result = invoker.invoke(&event, InvocationContext::empty()).await.unwrap();
                (i, result)
            })
        })
        .collect::<Vec<_>>();

    for task in tasks {
        let (i, result) = task.await.unwrap();
        assert_eq!(result.body(), format!("body-{i}"));
    }
}

#[tokio::test]
async fn late_writes_are_ignored() {
    let invoker = Invoker::new(
        stream_fn(|_req: Request<ReqBody>, res: ResponseSink| async move {
            res.set_status(StatusCode::ACCEPTED)?;
            res.end_with("final");

            res.write("late");
            assert!(matches!(res.set_status(StatusCode::GONE), Err(SinkError::Finalized { .. })));
            assert!(matches!(res.set_header("x-late", "1"), Err(SinkError::Finalized { .. })));
            res.end();
            Ok::<_, BoxError>(())
        }),
        Options::default(),
    );

    let result = invoker.invoke(&event(), InvocationContext::empty()).await.unwrap();
    assert_eq!(result.status(), StatusCode::ACCEPTED);
    assert_eq!(result.body(), "final");
    assert!(result.headers().get("x-late").is_none());
}

#[tokio::test]
async fn first_completion_signal_wins() {
    let invoker = Invoker::new(
        callback_fn(|_req: Request<ReqBody>, res: ResponseSink, done: Done| {
            let other = done.clone();
            res.end_with("ended by sink");
            done.fail("too late");
            other.succeed();
            Ok::<_, Infallible>(())
        }),
        Options::default(),
    );

    let result = invoker.invoke(&event(), InvocationContext::empty()).await.unwrap();
    assert_eq!(result.body(), "ended by sink");
}

#[tokio::test]
async fn error_before_end_wins() {
    let invoker = Invoker::new(
        callback_fn(|_req: Request<ReqBody>, res: ResponseSink, done: Done| {
            res.write("partial");
            done.fail("validation failed");
            res.end();
            Ok::<_, Infallible>(())
        }),
        Options::default(),
    );

    let error = invoker.invoke(&event(), InvocationContext::empty()).await.unwrap_err();
    assert!(error.to_string().contains("validation failed"));
}

#[tokio::test]
async fn handler_can_finish_after_await() {
    let invoker = Invoker::new(
        callback_fn(|req: Request<ReqBody>, res: ResponseSink, done: Done| {
            tokio::spawn(async move {
                let body = req.into_body().collect().await.map(|collected| collected.to_bytes()).unwrap_or_default();
                res.set_header(CONTENT_TYPE, "text/plain").unwrap();
                res.write(body);
                done.succeed();
            });
            Ok::<_, Infallible>(())
        }),
        Options::default(),
    );

    let event = Event::new("PUT", "/echo").body("from a spawned task");
    let result = invoker.invoke(&event, InvocationContext::empty()).await.unwrap();
    assert_eq!(result.body(), "from a spawned task");
}

#[tokio::test]
async fn binary_classification_from_options() {
    let handler = || {
        make_handler(|req: Request<ReqBody>| async move {
            let content_type = req.headers().get("x-respond-with").cloned();
            let mut response = Response::new(Full::new(Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef])));
            if let Some(content_type) = content_type {
                response.headers_mut().insert(CONTENT_TYPE, content_type);
            }
            Ok::<_, Infallible>(response)
        })
    };
    let image = Event::new("GET", "/").header("x-respond-with", "image/png");
    let text = Event::new("GET", "/").header("x-respond-with", "text/plain; charset=utf-8");

    let invoker = Invoker::new(handler(), Options::builder().binary(BinaryConfig::patterns(["image/*"])).build());
    let result = invoker.invoke(&image, InvocationContext::empty()).await.unwrap();
    assert!(result.is_base64_encoded());
    assert_eq!(result.body(), "3q2+7w==");
    assert!(!invoker.invoke(&text, InvocationContext::empty()).await.unwrap().is_base64_encoded());

    let invoker = Invoker::new(handler(), Options::builder().binary(false).build());
    assert!(!invoker.invoke(&image, InvocationContext::empty()).await.unwrap().is_base64_encoded());

    let invoker = Invoker::new(handler(), Options::builder().binary(true).build());
    assert!(invoker.invoke(&text, InvocationContext::empty()).await.unwrap().is_base64_encoded());
}

#[tokio::test]
async fn api_gateway_v1_round_trip() {
    let invoker = Invoker::new(
        stream_fn(|req: Request<ReqBody>, res: ResponseSink| async move {
            let uri = req.uri().to_string();
            res.append_header("set-cookie", "a=1")?;
            res.append_header("set-cookie", "b=2")?;
            res.send_text(uri)?;
            Ok::<_, SinkError>(())
        }),
        Options::default(),
    );

    let payload: Value = serde_json::from_str(indoc! {r#"
        {
            "httpMethod": "GET",
            "path": "/items",
            "queryStringParameters": { "id": "7" },
            "headers": { "Host": "example.com" },
            "body": null,
            "isBase64Encoded": false
        }
    "#})
    .unwrap();

    let format = EventFormat::detect(&payload);
    let response = invoker.invoke_json(format, payload, InvocationContext::empty()).await;

    assert_eq!(response["statusCode"], 200);
    assert_eq!(response["body"], "/items?id=7");
    assert_eq!(response["multiValueHeaders"]["set-cookie"], json!(["a=1", "b=2"]));
    assert_eq!(response["isBase64Encoded"], false);
}

#[tokio::test]
async fn api_gateway_v2_round_trip() {
    let invoker = Invoker::new(
        stream_fn(|req: Request<ReqBody>, res: ResponseSink| async move {
            let cookie = req.headers().get("cookie").cloned();
            if let Some(cookie) = cookie {
                res.set_header("x-cookie", cookie)?;
            }
            res.append_header("set-cookie", "session=2")?;
            let body = req.into_body().collect().await?.to_bytes();
            res.end_with(body);
            Ok::<_, BoxError>(())
        }),
        Options::default(),
    );

    let payload: Value = serde_json::from_str(indoc! {r#"
        {
            "version": "2.0",
            "rawPath": "/echo",
            "rawQueryString": "",
            "cookies": ["session=1"],
            "headers": { "content-type": "text/plain" },
            "requestContext": { "http": { "method": "POST", "sourceIp": "192.0.2.1" } },
            "body": "aGVsbG8=",
            "isBase64Encoded": true
        }
    "#})
    .unwrap();

    let format = EventFormat::detect(&payload);
    assert_eq!(format, EventFormat::ApiGatewayV2);
    let response = invoker.invoke_json(format, payload, InvocationContext::empty()).await;

    assert_eq!(response["statusCode"], 200);
    assert_eq!(response["body"], "hello");
    assert_eq!(response["headers"]["x-cookie"], "session=1");
    assert_eq!(response["cookies"], json!(["session=2"]));
}

#[tokio::test]
async fn malformed_payload_becomes_bad_request() {
    let invoker = Invoker::new(
        stream_fn(|_req: Request<ReqBody>, res: ResponseSink| async move { res.send_text("unreachable") }),
        Options::default(),
    );

    let response = invoker.invoke_json(EventFormat::ApiGatewayV1, json!({ "httpMethod": ["GET"] }), InvocationContext::empty()).await;
    assert_eq!(response["statusCode"], 400);
    assert_eq!(response["body"], "");

    let payload = json!({ "httpMethod": "POST", "path": "/", "body": "%%%", "isBase64Encoded": true });
    let response = invoker.invoke_json(EventFormat::ApiGatewayV1, payload, InvocationContext::empty()).await;
    assert_eq!(response["statusCode"], 400);
}

#[test]
fn invocation_polls_on_caller_task() {
    let invoker = Invoker::new(
        stream_fn(|req: Request<ReqBody>, res: ResponseSink| async move {
            let body = req.into_body().collect().await?.to_bytes();
            res.end_with(body);
            Ok::<_, BoxError>(())
        }),
        Options::default(),
    );

    let event = Event::new("POST", "/").body("no runtime needed");
    let result = futures::executor::block_on(invoker.invoke(&event, InvocationContext::empty())).unwrap();
    assert_eq!(result.body(), "no runtime needed");

    // a handler that keeps the sink but never signals keeps the invocation pending
    let parked = Arc::new(std::sync::Mutex::new(Vec::new()));
    let parking = Arc::clone(&parked);
    let silent = Invoker::new(
        callback_fn(move |_req: Request<ReqBody>, res: ResponseSink, _done: Done| {
            parking.lock().unwrap().push(res);
            Ok::<_, Infallible>(())
        }),
        Options::default(),
    );
    let event = Event::new("GET", "/");
    assert!(silent.invoke(&event, InvocationContext::empty()).now_or_never().is_none());
    assert_eq!(parked.lock().unwrap().len(), 1);

    // dropping every handle without a signal abandons it
    let forgetful = Invoker::new(
        callback_fn(|_req: Request<ReqBody>, _res: ResponseSink, _done: Done| Ok::<_, Infallible>(())),
        Options::default(),
    );
    let outcome = futures::executor::block_on(forgetful.invoke(&event, InvocationContext::empty()));
    assert!(matches!(outcome, Err(InvokeError::Abandoned)));
}

struct PanicsDuringSetup;

impl Handler for PanicsDuringSetup {
    type Error = Infallible;

    fn call<'life0, 'async_trait>(
        &'life0 self,
        _req: Request<ReqBody>,
        _res: ResponseSink,
        _done: Done,
    ) -> Pin<Box<dyn Future<Output = Result<(), Self::Error>> + Send + 'async_trait>>
    where
        'life0: 'async_trait,
        Self: 'async_trait,
    {
        panic!("setup failure")
    }
}

#[tokio::test]
async fn panic_before_handler_future_is_caught() {
    let invoker = Invoker::new(PanicsDuringSetup, Options::default());

    let outcome = tokio::spawn(async move { invoker.invoke(&event(), InvocationContext::empty()).await }).await;

    let error = outcome.expect("invocation task should not panic").unwrap_err();
    assert!(matches!(&error, InvokeError::Panic { message } if message == "setup failure"));
    assert_eq!(error.into_result().status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn panicking_binary_predicate_is_caught() {
    let invoker = Invoker::new(
        stream_fn(|_req: Request<ReqBody>, res: ResponseSink| async move {
            res.write("x");
            Ok::<_, Infallible>(())
        }),
        Options::builder().binary(BinaryConfig::predicate(|_, _| panic!("policy bug"))).build(),
    );

    let outcome = tokio::spawn(async move { invoker.invoke(&event(), InvocationContext::empty()).await }).await;

    let error = outcome.expect("invocation task should not panic").unwrap_err();
    assert!(matches!(&error, InvokeError::Panic { message } if message == "policy bug"));
}

