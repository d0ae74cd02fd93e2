//! The same engine in the client direction.
//!
//! [`Url`] splits an absolute URL, [`write_request`] serializes a request,
//! [`ResponseParser`] parses the response incrementally, and [`Client`]
//! binds them over one kept-alive connection.
mod parser;
mod url;

pub use parser::ResponseParser;
pub use url::{Scheme, Url, UrlError};

#[cfg(test)]
mod test;

use std::io;

use bytes::{BufMut, BytesMut};
use tokio::net::TcpStream;

use crate::h1::{Milestone, ParseError, Progress};
use crate::headers::standard::{CONTENT_LENGTH, HOST};
use crate::headers::HeaderValue;
use crate::http::Method;
use crate::request::Request;
use crate::response::Response;
use crate::server::{PlainStream, StreamHandler};

const READ_CHUNK: usize = 64 * 1024;

/// Serialize a client request: request line, headers, then the body with
/// content-length framing.
///
/// `Content-Length` is added when absent, unless the method is bodyless
/// and no body is set.
pub fn write_request(req: &Request, out: &mut BytesMut) {
    out.put_slice(req.method().as_str().as_bytes());
    out.put_slice(b" ");
    out.put_slice(req.uri().to_string().as_bytes());
    out.put_slice(b" ");
    out.put_slice(req.version().as_str().as_bytes());
    out.put_slice(b"\r\n");

    if !req.headers().contains(CONTENT_LENGTH)
        && (!req.body().is_empty() || !req.method().is_bodyless())
    {
        out.put_slice(b"content-length: ");
        out.put_slice(
            itoa::Buffer::new()
                .format(req.body().len())
                .as_bytes(),
        );
        out.put_slice(b"\r\n");
    }

    req.headers().write_to(out);
    out.put_slice(b"\r\n");
    out.put_slice(req.body());
}

/// Client-side error.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Url(#[from] UrlError),
    #[error("https requires a TLS stream handler, which the core does not ship")]
    TlsNotSupported,
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("connection closed before the response completed")]
    ConnectionClosed,
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A minimal HTTP/1.1 client over one connection.
///
/// Requests are sent serially; the connection is reused across calls
/// until either side opts out of keep-alive.
#[derive(Debug)]
pub struct Client {
    stream: PlainStream<TcpStream>,
    parser: ResponseParser,
    host_header: String,
    read_buf: BytesMut,
    scratch: Vec<u8>,
}

impl Client {
    /// Connect to the authority of `url`.
    ///
    /// # Errors
    ///
    /// Returns an error for `https` URLs (TLS is a drop-in at the byte
    /// layer, not shipped here) or when the TCP connect fails.
    pub async fn connect(url: &Url) -> Result<Client, ClientError> {
        if url.scheme() == Scheme::Https {
            return Err(ClientError::TlsNotSupported);
        }
        let host = url.host().trim_start_matches('[').trim_end_matches(']');
        let stream = TcpStream::connect((host, url.port())).await?;
        Ok(Client {
            stream: PlainStream::new(stream),
            parser: ResponseParser::new(),
            host_header: url.host_header(),
            read_buf: BytesMut::with_capacity(READ_CHUNK),
            scratch: vec![0u8; READ_CHUNK],
        })
    }

    /// Send one request and read its response to completion.
    ///
    /// A `Host` header is added when absent. Responses to HEAD are read as
    /// bodyless.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure, a malformed response, or a
    /// connection that dies mid-message.
    pub async fn send(&mut self, req: &mut Request) -> Result<Response, ClientError> {
        self.parser.reset();
        if req.method() == &Method::HEAD {
            self.parser.expect_no_body();
        }
        if !req.headers().contains(HOST) {
            if let Ok(value) = HeaderValue::try_from(self.host_header.clone()) {
                req.headers_mut().insert(HOST, value);
            }
        }

        let mut out = BytesMut::new();
        write_request(req, &mut out);
        let mut written = 0;
        while written < out.len() {
            let accepted = self.stream.write(&out[written..]).await?;
            if accepted == 0 {
                return Err(ClientError::ConnectionClosed);
            }
            written += accepted;
        }

        let mut res = Response::new();
        loop {
            loop {
                match self.parser.advance(&mut self.read_buf, &mut res)? {
                    Progress::Partial => break,
                    Progress::Milestone(Milestone::Complete) => return Ok(res),
                    Progress::Milestone(_) => {}
                }
            }

            let read = self.stream.read(&mut self.scratch).await?;
            if read == 0 {
                if self.parser.reads_to_eof() {
                    self.parser.finish_eof(&mut res)?;
                    return Ok(res);
                }
                return Err(ClientError::ConnectionClosed);
            }
            self.read_buf.extend_from_slice(&self.scratch[..read]);
        }
    }
}
