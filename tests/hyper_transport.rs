use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use rith_http::{Client, Dispatch, Error, HyperTransport, TransportError};

// Serves a single connection: captures the request head, then writes `reply`.
fn serve_once(reply: &'static str) -> (SocketAddr, mpsc::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut head = String::new();
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                break;
            }
            head.push_str(&line);
        }
        let mut stream = stream;
        stream.write_all(reply.as_bytes()).unwrap();
        stream.flush().unwrap();
        let _ = tx.send(head);
    });
    (addr, rx)
}

#[test]
fn test_get_over_loopback() {
    let (addr, head) = serve_once(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
    );
    let client = Client::new();
    let outcome = client
        .get(format!("http://{addr}/greeting?lang=en"))
        .unwrap();

    assert!(outcome.is_successful(), "{:?}", outcome.error());
    assert_eq!(outcome.text().unwrap(), "hello");
    let mime = outcome.response().unwrap().body().mime().cloned().unwrap();
    assert_eq!(mime, mime::TEXT_PLAIN);

    let head = head.recv_timeout(Duration::from_secs(5)).unwrap().to_lowercase();
    assert!(head.starts_with("get /greeting?lang=en http/1.1\r\n"), "{head}");
    assert!(head.contains(&format!("user-agent: {}", rith_http::user_agent().to_lowercase())));
}

#[test]
fn test_non_200_is_not_successful() {
    let (addr, _head) = serve_once(
        "HTTP/1.1 404 Not Found\r\nContent-Length: 7\r\nConnection: close\r\n\r\nmissing",
    );
    let outcome = Client::new().get(format!("http://{addr}/")).unwrap();

    assert!(outcome.error().is_none());
    assert_eq!(outcome.status(), Some(rith_http::StatusCode::NOT_FOUND));
    assert!(!outcome.is_successful());
    assert_eq!(outcome.read_body().unwrap().as_ref(), b"missing");
}

#[test]
fn test_timeout_from_config_interceptor() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        // Accept and never answer.
        let (_stream, _) = listener.accept().unwrap();
        thread::sleep(Duration::from_secs(5));
    });

    let client = Client::new();
    client.on_config(|transport: &mut HyperTransport| {
        transport.set_timeout(Duration::from_millis(200));
    });
    let holder = client
        .request("GET", format!("http://{addr}/hang"), Dispatch::Deferred)
        .unwrap();

    let mut timed_out = None;
    holder.catch(|error| {
        timed_out = error
            .downcast_transport_ref::<TransportError>()
            .map(|error| matches!(error, TransportError::Timeout(_)));
    });
    assert_eq!(timed_out, Some(true));
}

#[test]
fn test_connection_refused() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let outcome = Client::new().get(format!("http://{addr}/")).unwrap();

    assert!(!outcome.is_successful());
    assert!(matches!(outcome.error(), Some(Error::Transport(_))));
}
