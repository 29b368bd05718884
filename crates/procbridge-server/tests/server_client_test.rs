//! End-to-end tests: a real server and client exchanging frames over
//! loopback TCP, one connection per request.

use std::net::TcpStream;
use std::thread;
use std::time::Duration;

use procbridge_client::Client;
use procbridge_common::transport::FrameCodec;
use procbridge_common::{ProcBridgeError, Response};
use procbridge_server::{Dispatcher, Server};
use serde_json::{json, Value};

/// The dispatcher mirrored by every test server: echo, sum, a handler that
/// always fails, and a permissive unknown-method fallback.
fn test_dispatcher() -> Dispatcher {
    Dispatcher::new()
        .handle1("echo", |payload| Ok(payload))
        .handle1("sum", |payload| {
            let total: i64 = payload
                .as_ref()
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(Value::as_i64).sum())
                .unwrap_or(0);
            Ok(Some(json!(total)))
        })
        .handle_n("div", 2, |args| {
            let a = args[0].as_f64().unwrap_or(0.0);
            let b = args[1].as_f64().unwrap_or(0.0);
            Ok(Some(json!(a / b)))
        })
        .handle0("err", || {
            Err(ProcBridgeError::Server("generated error".to_owned()))
        })
        .handle0("slow", || {
            thread::sleep(Duration::from_millis(500));
            Ok(Some(json!("finally")))
        })
}

fn start_server(dispatcher: Dispatcher) -> (Server, Client) {
    let server = Server::new(0, dispatcher);
    server.start().unwrap();
    let port = server.local_addr().unwrap().port();
    (server, Client::new("127.0.0.1", port))
}

#[test]
fn test_echo() {
    let (server, client) = start_server(test_dispatcher());

    assert_eq!(client.request(Some("echo"), Some(json!(123))).unwrap(), Some(json!(123)));
    assert_eq!(client.request(Some("echo"), Some(json!(3.14))).unwrap(), Some(json!(3.14)));
    assert_eq!(
        client.request(Some("echo"), Some(json!("hello"))).unwrap(),
        Some(json!("hello"))
    );
    assert_eq!(
        client.request(Some("echo"), Some(json!([1, 2, 3]))).unwrap(),
        Some(json!([1, 2, 3]))
    );
    assert_eq!(
        client.request(Some("echo"), Some(json!({"key": "value"}))).unwrap(),
        Some(json!({"key": "value"}))
    );

    server.stop().unwrap();
}

#[test]
fn test_echo_preserves_explicit_null() {
    let (server, client) = start_server(test_dispatcher());

    let reply = client.request(Some("echo"), Some(Value::Null)).unwrap();
    assert_eq!(reply, Some(Value::Null));

    server.stop().unwrap();
}

#[test]
fn test_sum() {
    let (server, client) = start_server(test_dispatcher());

    let reply = client.request(Some("sum"), Some(json!([1, 2, 3, 4]))).unwrap();
    assert_eq!(reply, Some(json!(10)));

    server.stop().unwrap();
}

#[test]
fn test_positional_arguments() {
    let (server, client) = start_server(test_dispatcher());

    let reply = client.request(Some("div"), Some(json!([9.0, 2.0]))).unwrap();
    assert_eq!(reply, Some(json!(4.5)));

    server.stop().unwrap();
}

#[test]
fn test_arity_mismatch_reaches_client_as_server_error() {
    let (server, client) = start_server(test_dispatcher());

    let err = client.request(Some("div"), Some(json!([1, 2, 3]))).unwrap_err();
    match err {
        ProcBridgeError::Server(message) => assert_eq!(message, "method needs 2 elements"),
        other => panic!("expected server error, got {other}"),
    }

    server.stop().unwrap();
}

#[test]
fn test_handler_error_message_is_relayed_verbatim() {
    let (server, client) = start_server(test_dispatcher());

    let err = client.request(Some("err"), None).unwrap_err();
    match err {
        ProcBridgeError::Server(message) => assert_eq!(message, "generated error"),
        other => panic!("expected server error, got {other}"),
    }

    server.stop().unwrap();
}

#[test]
fn test_unknown_method_with_default_fallback() {
    let (server, client) = start_server(test_dispatcher());

    let err = client.request(Some("missing"), None).unwrap_err();
    match err {
        ProcBridgeError::Server(message) => assert_eq!(message, "unknown method: missing"),
        other => panic!("expected server error, got {other}"),
    }

    server.stop().unwrap();
}

#[test]
fn test_unknown_method_with_permissive_fallback() {
    let (server, client) = start_server(test_dispatcher().on_unknown_method(|_, _| Ok(None)));

    assert_eq!(client.request(None, None).unwrap(), None);
    assert_eq!(client.request(None, Some(json!("hello"))).unwrap(), None);
    assert_eq!(client.request(Some("missing"), None).unwrap(), None);
    // Registered methods still dispatch normally.
    assert_eq!(client.request(Some("echo"), None).unwrap(), None);

    server.stop().unwrap();
}

#[test]
fn test_big_payload_round_trip() {
    let (server, client) = start_server(test_dispatcher());

    // Roughly 100KB of text, echoed back byte-for-byte.
    let blob: String = "Lorem ipsum dolor sit amet, consectetur adipiscing elit. "
        .repeat(1_800);
    assert!(blob.len() > 100_000);

    let reply = client.request(Some("echo"), Some(json!(blob.clone()))).unwrap();
    assert_eq!(reply, Some(json!(blob)));

    server.stop().unwrap();
}

#[test]
fn test_client_timeout_on_slow_handler() {
    let (server, client) = start_server(test_dispatcher());
    let client = client.with_timeout(Duration::from_millis(50));

    let err = client.request(Some("slow"), None).unwrap_err();
    assert!(matches!(err, ProcBridgeError::Timeout(_)));

    // The same handler succeeds when given enough time.
    let client = Client::new("127.0.0.1", server.local_addr().unwrap().port())
        .with_timeout(Duration::from_secs(5));
    assert_eq!(client.request(Some("slow"), None).unwrap(), Some(json!("finally")));

    server.stop().unwrap();
}

#[test]
fn test_concurrent_requests_are_isolated() {
    let (server, client) = start_server(test_dispatcher());
    let port = server.local_addr().unwrap().port();

    // A slow connection must not delay the fast ones.
    let slow = thread::spawn(move || client.request(Some("slow"), None));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            thread::spawn(move || {
                let client = Client::new("127.0.0.1", port);
                client.request(Some("echo"), Some(json!(i)))
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let reply = handle.join().unwrap().unwrap();
        assert_eq!(reply, Some(json!(i)));
    }
    assert_eq!(slow.join().unwrap().unwrap(), Some(json!("finally")));

    server.stop().unwrap();
}

#[test]
fn test_garbage_bytes_get_a_bad_response() {
    let (server, _client) = start_server(test_dispatcher());
    let port = server.local_addr().unwrap().port();

    let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
    std::io::Write::write_all(&mut stream, b"GET / HTTP/1.1\r\n\r\n").unwrap();

    let response = FrameCodec::read_response(&mut stream).unwrap();
    assert_eq!(response, Response::Bad(Some("unrecognized protocol".to_owned())));

    server.stop().unwrap();
}

#[test]
fn test_requests_fail_after_stop() {
    let (server, client) = start_server(test_dispatcher());
    assert_eq!(client.request(Some("echo"), Some(json!(1))).unwrap(), Some(json!(1)));

    server.stop().unwrap();

    let err = client.request(Some("echo"), Some(json!(1))).unwrap_err();
    assert!(matches!(err, ProcBridgeError::Connection(_) | ProcBridgeError::Io(_)));
}
