use bytes::BytesMut;

use super::*;
use crate::h1::{ParseErrorKind, Serializer};
use crate::headers::standard::HOST;
use crate::headers::HeaderValue;
use crate::http::{Method, StatusCode, Version};
use crate::request::Request;
use crate::response::Response;

fn parse_response(input: &[u8]) -> Result<Response, ParseError> {
    let mut parser = ResponseParser::new();
    let mut res = Response::new();
    let mut buf = BytesMut::from(input);
    loop {
        match parser.advance(&mut buf, &mut res)? {
            Progress::Partial => {
                // simulated EOF
                parser.finish_eof(&mut res)?;
                return Ok(res);
            }
            Progress::Milestone(Milestone::Complete) => return Ok(res),
            Progress::Milestone(_) => {}
        }
    }
}

fn body_bytes(res: &Response) -> &[u8] {
    match res.body() {
        crate::response::Body::Buffer(buf) => buf,
        other => panic!("expected buffered body, got {other:?}"),
    }
}

#[test]
fn test_write_request() {
    let mut req = Request::build(Method::GET, "/search?q=1").unwrap();
    req.headers_mut()
        .insert(HOST, HeaderValue::from_static("example.com"));

    let mut out = BytesMut::new();
    write_request(&req, &mut out);
    let text = String::from_utf8_lossy(&out);
    assert!(text.starts_with("GET /search?q=1 HTTP/1.1\r\n"), "{text}");
    assert!(text.contains("host: example.com\r\n"));
    // a body-less GET gets no content-length
    assert!(!text.contains("content-length"));
    assert!(text.ends_with("\r\n\r\n"));
}

#[test]
fn test_write_request_with_body() {
    let mut req = Request::build(Method::POST, "/u").unwrap();
    req.set_body(b"Hello");

    let mut out = BytesMut::new();
    write_request(&req, &mut out);
    let text = String::from_utf8_lossy(&out);
    assert!(text.starts_with("POST /u HTTP/1.1\r\n"));
    assert!(text.contains("content-length: 5\r\n"));
    assert!(text.ends_with("\r\n\r\nHello"));

    // a POST with an empty body still declares its length
    let req = Request::build(Method::POST, "/u").unwrap();
    let mut out = BytesMut::new();
    write_request(&req, &mut out);
    assert!(String::from_utf8_lossy(&out).contains("content-length: 0\r\n"));
}

#[test]
fn test_parse_response_content_length() {
    let res = parse_response(
        b"HTTP/1.1 200 OK\r\ncontent-length: 5\r\ncontent-type: text/plain\r\n\r\nHello",
    )
    .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.version(), Version::HTTP_11);
    assert_eq!(res.reason(), None);
    assert_eq!(body_bytes(&res), b"Hello");
    assert_eq!(
        res.headers().get("content-type").unwrap().as_bytes(),
        b"text/plain"
    );
}

#[test]
fn test_parse_response_chunked() {
    let res = parse_response(
        b"HTTP/1.1 200 OK\r\ntransfer-encoding: chunked\r\n\r\n5\r\nHello\r\n6\r\n World\r\n0\r\n\r\n",
    )
    .unwrap();
    assert_eq!(body_bytes(&res), b"Hello World");
}

#[test]
fn test_parse_response_eof_framed() {
    let res = parse_response(b"HTTP/1.0 200 OK\r\n\r\nuntil the very end").unwrap();
    assert_eq!(res.version(), Version::HTTP_10);
    assert_eq!(body_bytes(&res), b"until the very end");
}

#[test]
fn test_parse_response_reasons() {
    // custom reason is retained
    let res = parse_response(b"HTTP/1.1 404 Missing In Action\r\ncontent-length: 0\r\n\r\n")
        .unwrap();
    assert_eq!(res.reason(), Some("Missing In Action"));

    // canonical reason is not duplicated
    let res = parse_response(b"HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\n\r\n").unwrap();
    assert_eq!(res.reason(), None);

    // missing reason is accepted
    let res = parse_response(b"HTTP/1.1 200 \r\ncontent-length: 0\r\n\r\n").unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let res = parse_response(b"HTTP/1.1 200\r\ncontent-length: 0\r\n\r\n").unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[test]
fn test_parse_response_bodyless_statuses() {
    let res = parse_response(b"HTTP/1.1 304 Not Modified\r\netag: \"v1\"\r\n\r\n").unwrap();
    assert_eq!(res.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(body_bytes(&res), b"");

    // a declared body on a bodyless status is a framing violation
    let err = parse_response(b"HTTP/1.1 204 No Content\r\ncontent-length: 5\r\n\r\nHello")
        .unwrap_err();
    assert_eq!(err.kind(), ParseErrorKind::PayloadNoBodyAllowed);
}

#[test]
fn test_parse_response_head() {
    let mut parser = ResponseParser::new();
    parser.expect_no_body();

    let mut res = Response::new();
    let mut buf = BytesMut::from(&b"HTTP/1.1 200 OK\r\ncontent-length: 120\r\n\r\n"[..]);
    loop {
        match parser.advance(&mut buf, &mut res).unwrap() {
            Progress::Milestone(Milestone::Complete) => break,
            Progress::Milestone(_) => {}
            Progress::Partial => panic!("head response must complete without a body"),
        }
    }
    assert_eq!(res.headers().content_length(), Some(120));
    assert_eq!(body_bytes(&res), b"");
}

#[test]
fn test_parse_response_rejects() {
    let err = parse_response(b"HTTP/9.9 200 OK\r\n\r\n").unwrap_err();
    assert_eq!(err.kind(), ParseErrorKind::VersionSyntax);

    let err = parse_response(b"HTTP/1.1 abc OK\r\n\r\n").unwrap_err();
    assert_eq!(err.kind(), ParseErrorKind::VersionSyntax);

    let err = parse_response(b"HTTP/1.1 99 OK\r\n\r\n").unwrap_err();
    assert_eq!(err.kind(), ParseErrorKind::VersionSyntax);

    let err = parse_response(
        b"HTTP/1.1 200 OK\r\ntransfer-encoding: chunked\r\ncontent-length: 5\r\n\r\n",
    )
    .unwrap_err();
    assert_eq!(err.kind(), ParseErrorKind::Framing);
}

#[test]
fn test_resumability_every_boundary() {
    let inputs: [&[u8]; 2] = [
        b"HTTP/1.1 200 OK\r\ncontent-length: 5\r\nx-tag: v\r\n\r\nHello",
        b"HTTP/1.1 200 OK\r\ntransfer-encoding: chunked\r\n\r\n5\r\nHello\r\n0\r\n\r\n",
    ];

    for input in inputs {
        let whole = parse_response(input).unwrap();

        for at in 0..=input.len() {
            let mut parser = ResponseParser::new();
            let mut res = Response::new();
            let mut complete = false;

            for part in [&input[..at], &input[at..]] {
                let mut buf = BytesMut::from(part);
                loop {
                    match parser.advance(&mut buf, &mut res).unwrap() {
                        Progress::Partial => break,
                        Progress::Milestone(Milestone::Complete) => {
                            complete = true;
                            break;
                        }
                        Progress::Milestone(_) => {}
                    }
                }
            }

            assert!(complete, "split at {at}");
            assert_eq!(res.status(), whole.status(), "split at {at}");
            assert_eq!(body_bytes(&res), body_bytes(&whole), "split at {at}");
        }
    }
}

#[test]
fn test_roundtrip_serialize_then_parse() {
    let mut source = Response::new();
    source.set_status(StatusCode::CREATED);
    source.set_body(&b"made it"[..]);
    source
        .headers_mut()
        .insert("location".parse().unwrap(), HeaderValue::from_static("/things/9"));

    let mut serializer = Serializer::new();
    let mut wire = BytesMut::new();
    while serializer.pull(&mut source, &mut wire).unwrap() {}

    let parsed = parse_response(&wire).unwrap();
    assert_eq!(parsed.status(), source.status());
    assert_eq!(parsed.version(), source.version());
    assert_eq!(parsed.reason(), None);
    assert_eq!(body_bytes(&parsed), b"made it");
    assert_eq!(
        parsed.headers().get("location").unwrap().as_bytes(),
        b"/things/9"
    );
    assert_eq!(parsed.headers().content_length(), Some(7));
    assert!(parsed.headers().contains("date"));
}

#[test]
fn test_roundtrip_chunked() {
    let mut source = Response::new();
    source.set_status(StatusCode::OK);
    source.set_chunked();
    source.set_body(&b"stream me"[..]);

    let mut serializer = Serializer::new();
    let mut wire = BytesMut::new();
    while serializer.pull(&mut source, &mut wire).unwrap() {}

    let parsed = parse_response(&wire).unwrap();
    assert_eq!(parsed.status(), StatusCode::OK);
    assert_eq!(body_bytes(&parsed), b"stream me");
}
