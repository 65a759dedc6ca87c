use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::time::Duration;

use bytes::Bytes;
use rith_http::{
    header, user_agent, BodyError, Client, Dispatch, Error, HeaderMap, HeaderValue, Method, Query,
    Request, Resolution, Response, StatusCode, Transport, DEFAULT_TIMEOUT,
};
use serde::{Deserialize, Serialize};

// Snapshot of a request as the transport saw it.
#[derive(Debug)]
struct Seen {
    method: Method,
    uri: String,
    headers: HeaderMap,
    body: Bytes,
}

#[derive(Clone, Default)]
struct Recorder {
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl Recorder {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last(&self) -> Seen {
        self.seen.lock().unwrap().pop().expect("no request reached the transport")
    }
}

type Respond = Box<dyn Fn(&Request) -> Result<Response, Error> + Send + Sync>;

struct Mock {
    recorder: Recorder,
    respond: Respond,
    delay: Option<Duration>,
}

impl Transport for Mock {
    type Error = Error;

    async fn execute(&self, request: Request) -> Result<Response, Self::Error> {
        self.recorder.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let outcome = (self.respond)(&request);
        self.recorder.seen.lock().unwrap().push(Seen {
            method: request.method().clone(),
            uri: request.uri().to_string(),
            headers: request.headers().clone(),
            body: request.body().to_bytes().unwrap_or_default(),
        });
        outcome
    }
}

fn mock_client<F>(respond: F) -> (Client<Mock>, Recorder)
where
    F: Fn(&Request) -> Result<Response, Error> + Send + Sync + 'static,
{
    slow_client(None, respond)
}

fn slow_client<F>(delay: Option<Duration>, respond: F) -> (Client<Mock>, Recorder)
where
    F: Fn(&Request) -> Result<Response, Error> + Send + Sync + 'static,
{
    let recorder = Recorder::default();
    let shared = recorder.clone();
    let client = Client::with_transport(move |_timeout| Mock {
        recorder: shared,
        respond: Box::new(respond),
        delay,
    });
    (client, recorder)
}

fn ok(_: &Request) -> Result<Response, Error> {
    Ok(Response::new(StatusCode::OK, "ok"))
}

fn boom(_: &Request) -> Result<Response, Error> {
    Err(Error::Transport(Box::new(std::io::Error::other("boom"))))
}

#[test]
fn test_dispatch_sends_once() {
    let (client, recorder) = mock_client(ok);
    let holder = client
        .request("GET", "http://svc/items", Dispatch::Deferred)
        .unwrap();
    assert!(!holder.is_dispatched());

    holder.dispatch().dispatch().dispatch();
    let first = holder.get_response();
    let second = holder.get_response();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(recorder.calls(), 1);
    assert!(first.is_successful());
}

#[test]
fn test_immediate_dispatch() {
    let (client, recorder) = mock_client(ok);
    let holder = client
        .request("DELETE", "http://svc/items/1", Dispatch::Immediate)
        .unwrap();
    assert!(holder.is_dispatched());
    assert!(holder.get_response().is_successful());
    assert_eq!(recorder.last().method, Method::DELETE);
}

#[test]
fn test_continuations_fire_at_most_once() {
    let (client, _) = mock_client(ok);
    let holder = client
        .request("GET", "http://svc/", Dispatch::Deferred)
        .unwrap();
    let thens = AtomicUsize::new(0);
    let catches = AtomicUsize::new(0);

    holder
        .then(|_| {
            thens.fetch_add(1, Ordering::SeqCst);
        })
        .then(|_| {
            thens.fetch_add(1, Ordering::SeqCst);
        })
        .catch(|_| {
            catches.fetch_add(1, Ordering::SeqCst);
        })
        .catch(|_| {
            catches.fetch_add(1, Ordering::SeqCst);
        });

    assert_eq!(thens.load(Ordering::SeqCst), 1);
    assert_eq!(catches.load(Ordering::SeqCst), 0);
    assert_eq!(holder.then_state(), Resolution::Resolved);
    // Nothing to catch: claimed but never resolved.
    assert_eq!(holder.catch_state(), Resolution::Resolving);
}

#[test]
fn test_then_and_catch_race_on_failure() {
    let (client, recorder) = mock_client(boom);
    let holder = client
        .request("GET", "http://svc/", Dispatch::Deferred)
        .unwrap();
    let thens = AtomicUsize::new(0);
    let catches = AtomicUsize::new(0);

    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                holder.then(|outcome| {
                    assert!(outcome.error().is_some());
                    thens.fetch_add(1, Ordering::SeqCst);
                });
                holder.catch(|error| {
                    assert!(error.is_transport());
                    catches.fetch_add(1, Ordering::SeqCst);
                });
            });
        }
    });

    assert_eq!(thens.load(Ordering::SeqCst), 1);
    assert_eq!(catches.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.calls(), 1);
    assert_eq!(holder.catch_state(), Resolution::Resolved);
}

#[test]
fn test_catch_dispatches_pending_request() {
    let (client, recorder) = mock_client(boom);
    let holder = client
        .request("GET", "http://svc/", Dispatch::Deferred)
        .unwrap();
    let mut caught = None;
    holder.catch(|error| caught = Some(error.to_string()));
    assert_eq!(caught.as_deref(), Some("transport error: boom"));
    assert_eq!(recorder.calls(), 1);
}

#[test]
fn test_get_with_query_merges_additively() {
    let (client, recorder) = mock_client(ok);
    let extra = Query::from([("a", "2"), ("a", "3"), ("b", "4")]);
    let outcome = client
        .get_with_query("http://svc/items?a=1", &extra)
        .unwrap();

    assert!(outcome.is_successful());
    let seen = recorder.last();
    assert_eq!(seen.method, Method::GET);
    assert_eq!(seen.uri, "http://svc/items?a=1&a=2&a=3&b=4");
}

#[test]
fn test_query_edit_keeps_raw_bytes() {
    let (client, recorder) = mock_client(ok);
    let holder = client
        .request("GET", "http://svc/x?sig=%FF%00", Dispatch::Deferred)
        .unwrap();
    holder.chain().set_query("page", "2");
    holder.get_response();

    assert_eq!(recorder.last().uri, "http://svc/x?page=2&sig=%FF%00");

    let extra = Query::from([("sig", "more")]);
    client
        .get_with_query("http://svc/x?sig=%FF%00", &extra)
        .unwrap();
    assert_eq!(recorder.last().uri, "http://svc/x?sig=%FF%00&sig=more");
}

#[test]
fn test_set_query_replaces_and_add_header_accumulates() {
    let (client, recorder) = mock_client(ok);
    let holder = client
        .request("GET", "http://svc/search?k=v", Dispatch::Deferred)
        .unwrap();
    holder
        .chain()
        .set_query("k", "w")
        .add_query("tag", "x")
        .add_query("tag", "y")
        .add_header("x-h", "1")
        .add_header("x-h", "2")
        .set_header("x-single", "a")
        .set_header("x-single", "b");
    holder.get_response();

    let seen = recorder.last();
    assert_eq!(seen.uri, "http://svc/search?k=w&tag=x&tag=y");
    let values: Vec<_> = seen.headers.get_all("x-h").iter().collect();
    assert_eq!(values, ["1", "2"]);
    let values: Vec<_> = seen.headers.get_all("x-single").iter().collect();
    assert_eq!(values, ["b"]);
}

#[test]
fn test_edits_after_dispatch_are_ignored() {
    let (client, recorder) = mock_client(ok);
    let holder = client
        .request("GET", "http://svc/", Dispatch::Deferred)
        .unwrap();
    holder.get_response();
    holder.chain().set_header("x-late", "1");
    holder.dispatch();

    assert_eq!(recorder.calls(), 1);
    assert!(recorder.last().headers.get("x-late").is_none());
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Payload {
    name: String,
    tags: Vec<String>,
}

#[test]
fn test_json_body_round_trip() {
    let (client, recorder) = mock_client(|request| {
        let echoed = request.body().to_bytes().unwrap();
        Ok(Response::new(StatusCode::OK, echoed).header(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        ))
    });
    let payload = Payload {
        name: "Ada".into(),
        tags: vec!["admin".into()],
    };

    let holder = client
        .request("POST", "http://svc/users", Dispatch::Deferred)
        .unwrap();
    holder.before(|request| {
        request.json(&payload);
    });
    let outcome = holder.get_response();

    let seen = recorder.last();
    assert_eq!(seen.headers[header::CONTENT_TYPE], "application/json");
    assert_eq!(
        seen.headers[header::CONTENT_LENGTH],
        seen.body.len().to_string().as_str()
    );
    assert_eq!(outcome.unmarshal_json::<Payload>().unwrap(), payload);
}

#[test]
fn test_form_body() {
    let (client, recorder) = mock_client(ok);
    let holder = client
        .request("POST", "http://svc/login", Dispatch::Deferred)
        .unwrap();
    holder.chain().form([("user", "ada"), ("pass", "a&b")]);
    holder.get_response();

    let seen = recorder.last();
    assert_eq!(
        seen.headers[header::CONTENT_TYPE],
        "application/x-www-form-urlencoded"
    );
    assert_eq!(seen.body.as_ref(), b"user=ada&pass=a%26b");
}

#[test]
fn test_success_means_exactly_200() {
    for (status, successful) in [
        (StatusCode::OK, true),
        (StatusCode::CREATED, false),
        (StatusCode::NOT_FOUND, false),
    ] {
        let (client, _) = mock_client(move |_| Ok(Response::new(status, "")));
        let outcome = client.get("http://svc/").unwrap();
        assert!(outcome.error().is_none());
        assert_eq!(outcome.status(), Some(status));
        assert_eq!(outcome.is_successful(), successful, "{status}");
    }
}

#[test]
fn test_serialization_error_reaches_catch() {
    let (client, recorder) = mock_client(ok);
    let holder = client
        .request("POST", "http://svc/", Dispatch::Deferred)
        .unwrap();
    // JSON object keys must be strings.
    let mut invalid = BTreeMap::new();
    invalid.insert((1, 2), "pair");
    holder.chain().json(&invalid);

    let mut caught = false;
    holder.catch(|error| {
        caught = matches!(error, Error::Body(BodyError::JsonError(_)));
    });
    assert!(caught);
    assert_eq!(recorder.calls(), 0);
}

#[test]
fn test_cancel_before_dispatch() {
    let (client, recorder) = mock_client(ok);
    let holder = client
        .request("GET", "http://svc/", Dispatch::Deferred)
        .unwrap();
    holder.cancel();

    let outcome = holder.get_response();
    assert!(matches!(outcome.error(), Some(Error::Canceled(_))));
    assert!(holder.is_dispatched());
    assert_eq!(recorder.calls(), 0);
}

#[test]
fn test_cancel_in_flight() {
    let (client, _) = slow_client(Some(Duration::from_secs(30)), ok);
    let holder = client
        .request("GET", "http://svc/slow", Dispatch::Immediate)
        .unwrap();
    holder.cancel();

    let outcome = holder.get_response();
    assert!(matches!(outcome.error(), Some(Error::Canceled(_))));
}

#[test]
fn test_cancel_wins_against_concurrent_dispatch() {
    let (client, _) = slow_client(Some(Duration::from_secs(60)), ok);
    for _ in 0..64 {
        let holder = client
            .request("GET", "http://svc/slow", Dispatch::Deferred)
            .unwrap();
        let start = Barrier::new(2);
        std::thread::scope(|scope| {
            scope.spawn(|| {
                start.wait();
                holder.dispatch();
            });
            scope.spawn(|| {
                start.wait();
                holder.cancel();
            });
        });

        let outcome = holder.get_response();
        assert!(matches!(outcome.error(), Some(Error::Canceled(_))));
    }
}

#[test]
fn test_request_interceptor_runs_before_user_agent() {
    let (client, recorder) = mock_client(ok);
    client.on_request(|request: &mut Request| {
        request.insert_header(header::USER_AGENT, HeaderValue::from_static("spoofed/1.0"));
        request.insert_header(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer token"),
        );
    });
    client.get("http://svc/").unwrap();

    let seen = recorder.last();
    assert_eq!(seen.headers[header::USER_AGENT], user_agent());
    assert_eq!(seen.headers[header::AUTHORIZATION], "Bearer token");
}

#[test]
fn test_config_interceptor_runs_once_under_contention() {
    let builds = Arc::new(AtomicUsize::new(0));
    let configs = Arc::new(AtomicUsize::new(0));
    let recorder = Recorder::default();

    let client = {
        let builds = builds.clone();
        let recorder = recorder.clone();
        Client::with_transport(move |timeout| {
            assert_eq!(timeout, DEFAULT_TIMEOUT);
            builds.fetch_add(1, Ordering::SeqCst);
            Mock {
                recorder,
                respond: Box::new(ok),
                delay: None,
            }
        })
    };
    {
        let configs = configs.clone();
        client.on_config(move |transport: &mut Mock| {
            configs.fetch_add(1, Ordering::SeqCst);
            transport.delay = Some(Duration::from_millis(1));
        });
    }
    assert!(!client.is_initialized());

    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                assert!(client.get("http://svc/").unwrap().is_successful());
            });
        }
    });

    assert!(client.is_initialized());
    assert_eq!(builds.load(Ordering::SeqCst), 1);
    assert_eq!(configs.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.calls(), 8);

    // Too late: the transport already exists.
    {
        let configs = configs.clone();
        client.on_config(move |_: &mut Mock| {
            configs.fetch_add(1, Ordering::SeqCst);
        });
    }
    client.get("http://svc/").unwrap();
    assert_eq!(configs.load(Ordering::SeqCst), 1);
}

#[test]
fn test_construction_errors() {
    let (client, recorder) = mock_client(ok);

    let err = client
        .request("BAD METHOD", "http://svc/", Dispatch::Immediate)
        .unwrap_err();
    assert!(err.is_construction());

    let err = client.get("http://bad host/").unwrap_err();
    assert!(matches!(err, Error::Http(_)));

    assert_eq!(recorder.calls(), 0);
    assert!(!client.is_initialized());
}

#[test]
fn test_text_and_body_of_failed_outcome() {
    let (client, _) = mock_client(boom);
    let outcome = client.get("http://svc/").unwrap();
    assert!(!outcome.is_successful());
    assert!(outcome.status().is_none());
    assert!(matches!(outcome.text(), Err(Error::NoResponse)));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_inside_runtime() {
    let (client, recorder) = mock_client(|_| Ok(Response::new(StatusCode::OK, "async")));

    let outcome = client
        .fetch(Request::get("http://svc/async").unwrap())
        .await;
    assert_eq!(outcome.text().unwrap(), "async");

    let holder = client.send_async(
        Request::put("http://svc/async").unwrap(),
        Dispatch::Deferred,
    );
    let first = holder.response_async().await;
    let second = holder.response_async().await;
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(recorder.calls(), 2);
}

#[test]
fn test_client_outlives_the_runtime_it_was_first_used_in() {
    let (client, recorder) = mock_client(ok);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    let outcome = runtime.block_on(client.fetch(Request::get("http://svc/a").unwrap()));
    assert!(outcome.is_successful());
    drop(runtime);

    let outcome = client.get("http://svc/b").unwrap();
    assert!(outcome.is_successful(), "{:?}", outcome.error());
    assert_eq!(recorder.calls(), 2);
}
