//! Full-loop tests: a real listener on a loopback port, driven by the
//! crate's own client.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use velo::client::{Client, Url};
use velo::router::{HandlerFuture, Phase};
use velo::server::Acceptor;
use velo::{
    ListenerConf, Method, Request, Response, Router, Server, ServerConf, StatusCode,
};

fn hello<'a>(_req: &'a mut Request, res: &'a mut Response) -> HandlerFuture<'a> {
    Box::pin(async move {
        res.set_status(StatusCode::OK);
        res.set_body(&b"hello from velo"[..]);
    })
}

fn echo<'a>(req: &'a mut Request, res: &'a mut Response) -> HandlerFuture<'a> {
    Box::pin(async move {
        let body = bytes::Bytes::copy_from_slice(req.body());
        res.set_status(StatusCode::OK);
        res.set_body(body);
    })
}

fn show_params<'a>(req: &'a mut Request, res: &'a mut Response) -> HandlerFuture<'a> {
    Box::pin(async move {
        let user = req.params().get("user").unwrap_or("?");
        let rest = req.params().get("*").unwrap_or("");
        res.set_status(StatusCode::OK);
        res.set_body(bytes::Bytes::from(format!("{user}:{rest}").into_bytes()));
    })
}

fn test_router() -> Router {
    let mut router = Router::new();
    router.route(Method::GET, "/", hello).unwrap();
    router.route(Method::POST, "/echo", echo).unwrap();
    router
        .route(Method::GET, "/files/{user}/*", show_params)
        .unwrap();
    router.add(Phase::Response, |_req: &mut Request, res: &mut Response| {
        res.headers_mut().append(
            "x-powered-by".parse().unwrap(),
            velo::headers::HeaderValue::from_static("velo"),
        );
        true
    });
    router
}

/// Bind a loopback listener on an OS-assigned port, spawn its accept
/// loop, return a URL prefix.
async fn start(router: Router) -> (String, watch::Sender<bool>) {
    let mut conf = ListenerConf::new("127.0.0.1", 0);
    conf.timeout_ms = Some(5_000);
    let acceptor = Acceptor::bind(&conf).unwrap();
    let addr = acceptor.local_addr().unwrap();

    let (shutdown, rx) = watch::channel(false);
    tokio::spawn(acceptor.accept_loop(Arc::new(router), rx));

    (format!("http://{addr}"), shutdown)
}

fn body_text(res: &Response) -> String {
    match res.body() {
        velo::Body::Buffer(buf) => String::from_utf8_lossy(buf).into_owned(),
        other => panic!("expected buffered body, got {other:?}"),
    }
}

#[tokio::test]
async fn test_get_roundtrip() {
    let (base, _shutdown) = start(test_router()).await;

    let url = Url::parse(&base).unwrap();
    let mut client = Client::connect(&url).await.unwrap();

    let mut req = Request::build(Method::GET, "/").unwrap();
    let res = client.send(&mut req).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_text(&res), "hello from velo");
    assert_eq!(
        res.headers().get("x-powered-by").unwrap().as_bytes(),
        b"velo"
    );
    assert_eq!(res.headers().content_length(), Some(15));
}

#[tokio::test]
async fn test_echo_and_connection_reuse() {
    let (base, _shutdown) = start(test_router()).await;

    let url = Url::parse(&base).unwrap();
    let mut client = Client::connect(&url).await.unwrap();

    // several requests over the same connection
    for payload in ["first", "second", "third"] {
        let mut req = Request::build(Method::POST, "/echo").unwrap();
        req.set_body(payload.as_bytes());
        let res = client.send(&mut req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_text(&res), payload);
    }
}

#[tokio::test]
async fn test_wildcard_params_over_wire() {
    let (base, _shutdown) = start(test_router()).await;

    let url = Url::parse(&base).unwrap();
    let mut client = Client::connect(&url).await.unwrap();

    let mut req = Request::build(Method::GET, "/files/ada/docs/notes.txt").unwrap();
    let res = client.send(&mut req).await.unwrap();
    assert_eq!(body_text(&res), "ada:docs/notes.txt");
}

#[tokio::test]
async fn test_not_found_over_wire() {
    let (base, _shutdown) = start(test_router()).await;

    let url = Url::parse(&base).unwrap();
    let mut client = Client::connect(&url).await.unwrap();

    let mut req = Request::build(Method::GET, "/missing").unwrap();
    let res = client.send(&mut req).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(body_text(&res).contains("404 Not Found"));
}

#[tokio::test]
async fn test_server_run_and_stop() {
    let mut conf = ServerConf::default();
    conf.listeners.push(ListenerConf::new("127.0.0.1", 0));

    let server = Server::new(test_router(), conf);
    let handle = server.handle();

    let run = tokio::spawn(async move { server.run().await });

    // give the acceptor a moment to bind, then ask for shutdown
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.stop();

    let result = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("run did not stop")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_server_rejects_tls_listener() {
    let mut listener = ListenerConf::new("127.0.0.1", 0);
    listener.ssl = true;
    let conf = ServerConf {
        listeners: vec![listener],
        threads: 0,
    };

    let server = Server::new(Router::new(), conf);
    let err = server.run().await.unwrap_err();
    assert!(matches!(err, velo::server::ServerError::TlsNotSupported));
}
