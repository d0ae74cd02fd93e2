use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

use super::*;
use crate::http::{Method, StatusCode};
use crate::request::Request;
use crate::response::Response;
use crate::router::{HandlerFuture, Phase, Router};

fn hi<'a>(_req: &'a mut Request, res: &'a mut Response) -> HandlerFuture<'a> {
    Box::pin(async move {
        res.set_status(StatusCode::OK);
        res.set_body(&b"hi"[..]);
    })
}

fn echo<'a>(req: &'a mut Request, res: &'a mut Response) -> HandlerFuture<'a> {
    Box::pin(async move {
        let body = bytes::Bytes::copy_from_slice(req.body());
        res.set_status(StatusCode::OK);
        res.set_body(body);
    })
}

fn param_id<'a>(req: &'a mut Request, res: &'a mut Response) -> HandlerFuture<'a> {
    Box::pin(async move {
        let id = req.params().get("id").unwrap_or("?").to_owned();
        res.set_status(StatusCode::OK);
        res.set_body(bytes::Bytes::from(id.into_bytes()));
    })
}

fn no_status<'a>(_req: &'a mut Request, _res: &'a mut Response) -> HandlerFuture<'a> {
    Box::pin(async move {})
}

fn base_router() -> Router {
    let mut router = Router::new();
    router.route(Method::GET, "/", hi).unwrap();
    router.route(Method::POST, "/echo", echo).unwrap();
    router.route(Method::POST, "/u", echo).unwrap();
    router
        .route(Method::GET, r"/users/{id:\d+}", param_id)
        .unwrap();
    router
}

/// Spawn a session over an in-memory stream, returning the client end.
fn spawn_session(router: Router) -> DuplexStream {
    let (client, server) = tokio::io::duplex(256 * 1024);
    let session = Session::new(PlainStream::new(server), Arc::new(router));
    tokio::spawn(session.run());
    client
}

/// Read exactly one response: head, then `Content-Length` body bytes.
async fn read_response(client: &mut DuplexStream) -> String {
    let mut buf = Vec::new();
    let mut scratch = [0u8; 4096];

    let head_end = loop {
        if let Some(at) = find(&buf, b"\r\n\r\n") {
            break at + 4;
        }
        let read = client.read(&mut scratch).await.unwrap();
        assert!(read > 0, "eof before response head");
        buf.extend_from_slice(&scratch[..read]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let content_length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length: "))
        .and_then(|len| len.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < head_end + content_length {
        let read = client.read(&mut scratch).await.unwrap();
        assert!(read > 0, "eof before response body");
        buf.extend_from_slice(&scratch[..read]);
    }

    String::from_utf8_lossy(&buf[..head_end + content_length]).into_owned()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

async fn read_to_eof(client: &mut DuplexStream) -> String {
    let mut buf = Vec::new();
    client.read_to_end(&mut buf).await.unwrap();
    String::from_utf8_lossy(&buf).into_owned()
}

#[tokio::test]
async fn test_minimal_get() {
    let mut client = spawn_session(base_router());
    client
        .write_all(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n")
        .await
        .unwrap();

    let response = read_response(&mut client).await;
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");
    assert!(response.contains("content-length: 2\r\n"));
    assert!(response.ends_with("hi"));
}

#[tokio::test]
async fn test_chunked_echo() {
    let mut client = spawn_session(base_router());
    client
        .write_all(
            b"POST /echo HTTP/1.1\r\nHost: x\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nHello\r\n0\r\n\r\n",
        )
        .await
        .unwrap();

    let response = read_response(&mut client).await;
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.contains("content-length: 5\r\n"));
    assert!(response.ends_with("Hello"));
}

#[tokio::test]
async fn test_payload_too_large_closes() {
    let mut router = base_router();
    // per-route body cap installed from the URI alone
    router.add(Phase::Metadata, |req: &mut Request, _res: &mut Response| {
        if req.uri().path() == "/u" {
            req.policy_mut().max_body_size = 2;
        }
        true
    });

    let mut client = spawn_session(router);
    client
        .write_all(b"POST /u HTTP/1.1\r\nHost: x\r\nContent-Length: 5\r\n\r\nHello")
        .await
        .unwrap();

    let response = read_to_eof(&mut client).await;
    assert!(
        response.starts_with("HTTP/1.1 413 Payload Too Large\r\n"),
        "{response}"
    );
}

#[tokio::test]
async fn test_conflicting_framing_closes() {
    let mut client = spawn_session(base_router());
    client
        .write_all(
            b"POST /u HTTP/1.1\r\nHost: x\r\nTransfer-Encoding: chunked\r\nContent-Length: 5\r\n\r\n",
        )
        .await
        .unwrap();

    let response = read_to_eof(&mut client).await;
    assert!(
        response.starts_with("HTTP/1.1 400 Bad Request\r\n"),
        "{response}"
    );
}

#[tokio::test]
async fn test_route_param_and_constraint() {
    let mut client = spawn_session(base_router());
    client
        .write_all(b"GET /users/42 HTTP/1.1\r\nHost: x\r\n\r\n")
        .await
        .unwrap();
    let response = read_response(&mut client).await;
    assert!(response.ends_with("42"), "{response}");

    let mut client = spawn_session(base_router());
    client
        .write_all(b"GET /users/abc HTTP/1.1\r\nHost: x\r\n\r\n")
        .await
        .unwrap();
    let response = read_to_eof(&mut client).await;
    assert!(
        response.starts_with("HTTP/1.1 404 Not Found\r\n"),
        "{response}"
    );
}

#[tokio::test]
async fn test_pipelined_keep_alive() {
    let mut client = spawn_session(base_router());
    client
        .write_all(
            b"GET / HTTP/1.1\r\nHost: x\r\nConnection: keep-alive\r\n\r\nGET / HTTP/1.1\r\nHost: x\r\nConnection: keep-alive\r\n\r\n",
        )
        .await
        .unwrap();

    let first = read_response(&mut client).await;
    let second = read_response(&mut client).await;
    assert!(first.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(second.starts_with("HTTP/1.1 200 OK\r\n"));

    // the socket is still open: a third request is served
    client
        .write_all(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n")
        .await
        .unwrap();
    let third = read_response(&mut client).await;
    assert!(third.ends_with("hi"));
}

#[tokio::test]
async fn test_connection_close_honored() {
    let mut client = spawn_session(base_router());
    client
        .write_all(b"GET / HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();

    let response = read_to_eof(&mut client).await;
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
}

#[tokio::test]
async fn test_http10_defaults_to_close() {
    let mut client = spawn_session(base_router());
    client
        .write_all(b"GET / HTTP/1.0\r\nHost: x\r\n\r\n")
        .await
        .unwrap();

    let response = read_to_eof(&mut client).await;
    assert!(response.starts_with("HTTP/1.0 200 OK\r\n"), "{response}");
}

#[tokio::test]
async fn test_http10_keep_alive_opt_in() {
    let mut client = spawn_session(base_router());
    client
        .write_all(b"GET / HTTP/1.0\r\nHost: x\r\nConnection: keep-alive\r\n\r\n")
        .await
        .unwrap();
    let first = read_response(&mut client).await;
    assert!(first.starts_with("HTTP/1.0 200 OK\r\n"));

    client
        .write_all(b"GET / HTTP/1.0\r\nHost: x\r\n\r\n")
        .await
        .unwrap();
    let second = read_response(&mut client).await;
    assert!(second.starts_with("HTTP/1.0 200 OK\r\n"));
}

#[tokio::test]
async fn test_method_not_allowed() {
    let mut client = spawn_session(base_router());
    client
        .write_all(b"POST / HTTP/1.1\r\nHost: x\r\nContent-Length: 0\r\n\r\n")
        .await
        .unwrap();

    let response = read_to_eof(&mut client).await;
    assert!(
        response.starts_with("HTTP/1.1 405 Method Not Allowed\r\n"),
        "{response}"
    );
}

#[tokio::test]
async fn test_not_found_html_body() {
    let mut client = spawn_session(base_router());
    client
        .write_all(b"GET /missing HTTP/1.1\r\nHost: x\r\n\r\n")
        .await
        .unwrap();

    let response = read_to_eof(&mut client).await;
    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert!(response.contains("content-type: text/html\r\n"));
    assert!(response.contains("<h1>404 Not Found</h1>"));
}

#[tokio::test]
async fn test_custom_error_handler() {
    fn teapot_404<'a>(_req: &'a mut Request, res: &'a mut Response) -> HandlerFuture<'a> {
        Box::pin(async move {
            res.set_body(&b"nothing here"[..]);
        })
    }

    let mut router = base_router();
    router.error_handler(StatusCode::NOT_FOUND, teapot_404);

    let mut client = spawn_session(router);
    client
        .write_all(b"GET /missing HTTP/1.1\r\nHost: x\r\n\r\n")
        .await
        .unwrap();

    let response = read_to_eof(&mut client).await;
    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert!(response.ends_with("nothing here"));
}

#[tokio::test]
async fn test_handler_without_status_yields_500() {
    let mut router = Router::new();
    router.route(Method::GET, "/oops", no_status).unwrap();

    let mut client = spawn_session(router);
    client
        .write_all(b"GET /oops HTTP/1.1\r\nHost: x\r\n\r\n")
        .await
        .unwrap();

    let response = read_response(&mut client).await;
    assert!(
        response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"),
        "{response}"
    );
}

#[tokio::test]
async fn test_head_suppresses_body() {
    let mut router = Router::new();
    router.route([Method::GET, Method::HEAD], "/page", hi).unwrap();

    let mut client = spawn_session(router);
    client
        .write_all(b"HEAD /page HTTP/1.1\r\nHost: x\r\n\r\n")
        .await
        .unwrap();
    client
        .write_all(b"GET /page HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();

    let all = read_to_eof(&mut client).await;
    let first_end = find(all.as_bytes(), b"\r\n\r\n").unwrap() + 4;
    let head_response = &all[..first_end];
    assert!(head_response.contains("content-length: 2\r\n"));
    // the HEAD response carries no body; the GET body follows immediately
    assert!(all[first_end..].starts_with("HTTP/1.1 200 OK\r\n"), "{all}");
    assert!(all.ends_with("hi"));
}

#[tokio::test]
async fn test_response_phase_middleware() {
    let mut router = base_router();
    router.add(Phase::Response, |_req: &mut Request, res: &mut Response| {
        res.headers_mut().append(
            "x-powered-by".parse().unwrap(),
            crate::headers::HeaderValue::from_static("velo"),
        );
        true
    });

    let mut client = spawn_session(router);
    client
        .write_all(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n")
        .await
        .unwrap();

    let response = read_response(&mut client).await;
    assert!(response.contains("x-powered-by: velo\r\n"), "{response}");
}

#[tokio::test]
async fn test_header_middleware_halt() {
    let mut router = base_router();
    router.add(Phase::Header, |req: &mut Request, res: &mut Response| {
        if req.headers().contains("x-blocked") {
            res.set_status(StatusCode::FORBIDDEN);
            return false;
        }
        true
    });

    let mut client = spawn_session(router);
    client
        .write_all(b"GET / HTTP/1.1\r\nHost: x\r\nX-Blocked: 1\r\n\r\n")
        .await
        .unwrap();

    let response = read_to_eof(&mut client).await;
    assert!(response.starts_with("HTTP/1.1 403 Forbidden\r\n"), "{response}");
}

#[tokio::test]
async fn test_body_middleware_streams_chunks() {
    use std::sync::Mutex;

    let seen: Arc<Mutex<usize>> = Arc::default();
    let counter = Arc::clone(&seen);

    let mut router = base_router();
    router.add(Phase::Body, move |_req: &mut Request, _res: &mut Response| {
        *counter.lock().unwrap() += 1;
        true
    });

    let mut client = spawn_session(router);
    client
        .write_all(
            b"POST /echo HTTP/1.1\r\nHost: x\r\nTransfer-Encoding: chunked\r\n\r\n2\r\nab\r\n2\r\ncd\r\n0\r\n\r\n",
        )
        .await
        .unwrap();

    let response = read_response(&mut client).await;
    assert!(response.ends_with("abcd"));
    assert_eq!(*seen.lock().unwrap(), 2);
}

#[tokio::test]
async fn test_read_timeout_ends_session() {
    let (mut client, server) = tokio::io::duplex(1024);
    let stream = PlainStream::with_timeout(server, Duration::from_millis(50));
    tokio::spawn(Session::new(stream, Arc::new(base_router())).run());

    // half a request, then silence
    client.write_all(b"GET / HTT").await.unwrap();

    let mut buf = Vec::new();
    client.read_to_end(&mut buf).await.unwrap();
    assert!(buf.is_empty());
}

#[tokio::test]
async fn test_length_required() {
    let mut client = spawn_session(base_router());
    client
        .write_all(b"POST /u HTTP/1.1\r\nHost: x\r\n\r\n")
        .await
        .unwrap();

    let response = read_to_eof(&mut client).await;
    assert!(
        response.starts_with("HTTP/1.1 411 Length Required\r\n"),
        "{response}"
    );
}
