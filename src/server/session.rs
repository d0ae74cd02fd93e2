use std::io;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};

use super::stream::StreamHandler;
use crate::h1::{Milestone, ParseError, Parser, Progress, Serializer};
use crate::http::{Method, StatusCode, Version};
use crate::request::Request;
use crate::response::Response;
use crate::router::{MatchOutcome, Phase, RouteId, Router};

const READ_CHUNK: usize = 64 * 1024;

const NOT_FOUND_BODY: &[u8] =
    b"<html><head><title>404 Not Found</title></head>\
      <body><h1>404 Not Found</h1></body></html>";

/// How one request round ended, before the response is written.
enum Outcome {
    /// Parsed to completion, handler dispatched.
    Complete,
    /// The parser rejected the request.
    Failed(ParseError),
    /// No route admitted the request.
    Unrouted(StatusCode),
    /// A middleware function halted its chain mid-request.
    Halted,
    /// Clean EOF between requests.
    Eof,
}

/// Per-connection engine.
///
/// Binds parser, router, middleware, handler and serializer into one
/// strictly serial loop: pipelined requests are parsed and answered in
/// arrival order, and no two requests on the same connection overlap
/// handler execution. Suspension points are stream reads, stream writes
/// and the handler await; the parser and serializer never suspend.
pub struct Session<S> {
    stream: S,
    router: Arc<Router>,
    parser: Parser,
    serializer: Serializer,
    request: Request,
    response: Response,
    route: Option<RouteId>,
    read_buf: BytesMut,
    write_buf: BytesMut,
    scratch: Vec<u8>,
}

impl<S: StreamHandler> Session<S> {
    /// Create a session over an accepted connection.
    pub fn new(stream: S, router: Arc<Router>) -> Session<S> {
        Session {
            stream,
            router,
            parser: Parser::new(),
            serializer: Serializer::new(),
            request: Request::new(),
            response: Response::new(),
            route: None,
            read_buf: BytesMut::with_capacity(READ_CHUNK),
            write_buf: BytesMut::with_capacity(READ_CHUNK),
            scratch: vec![0u8; READ_CHUNK],
        }
    }

    /// Drive the connection until it closes.
    pub async fn run(mut self) {
        if let Err(err) = self.serve().await {
            tracing::debug!("session ended: {err}");
        }
        let _ = self.stream.shutdown().await;
    }

    async fn serve(&mut self) -> io::Result<()> {
        loop {
            let reuse = self.serve_one().await?;
            if !reuse {
                return Ok(());
            }
            self.reset();
        }
    }

    /// One request/response round. Returns `true` when the connection is
    /// reused.
    async fn serve_one(&mut self) -> io::Result<bool> {
        let outcome = self.read_request().await?;

        if let Outcome::Eof = outcome {
            return Ok(false);
        }

        self.dispatch(&outcome).await;
        self.write_response().await?;

        Ok(self.keep_alive(&outcome))
    }

    /// Step through parser milestones, running router and middleware
    /// phases, until the request completes or dies.
    async fn read_request(&mut self) -> io::Result<Outcome> {
        loop {
            loop {
                match self.parser.advance(&mut self.read_buf, &mut self.request) {
                    Ok(Progress::Partial) => break,
                    Ok(Progress::Milestone(Milestone::MetadataDone)) => {
                        match self.router.match_request(&mut self.request) {
                            MatchOutcome::Found(id) => {
                                self.route = Some(id);
                                if !self.run_phase(Phase::Metadata) {
                                    return Ok(Outcome::Halted);
                                }
                            }
                            MatchOutcome::MethodNotAllowed => {
                                return Ok(Outcome::Unrouted(StatusCode::METHOD_NOT_ALLOWED));
                            }
                            MatchOutcome::NotFound => {
                                return Ok(Outcome::Unrouted(StatusCode::NOT_FOUND));
                            }
                        }
                    }
                    Ok(Progress::Milestone(Milestone::HeadersDone)) => {
                        if !self.run_phase(Phase::Header) {
                            return Ok(Outcome::Halted);
                        }
                    }
                    Ok(Progress::Milestone(Milestone::DataChunkDone)) => {
                        if !self.run_phase(Phase::Body) {
                            return Ok(Outcome::Halted);
                        }
                    }
                    Ok(Progress::Milestone(Milestone::Complete)) => {
                        return Ok(Outcome::Complete);
                    }
                    Err(err) => return Ok(Outcome::Failed(err)),
                }
            }

            let read = self.stream.read(&mut self.scratch).await?;
            if read == 0 {
                if self.parser.has_progress() {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "connection closed mid-request",
                    ));
                }
                return Ok(Outcome::Eof);
            }
            self.read_buf.extend_from_slice(&self.scratch[..read]);
        }
    }

    /// Produce the response for the round: run the handler for complete
    /// requests, or map the failure.
    async fn dispatch(&mut self, outcome: &Outcome) {
        self.response.set_version(self.request.version());

        match outcome {
            Outcome::Complete => {
                // a buffered content-length body gets its single Body pass
                if self.request.headers().transfer_chunked() != Some(true)
                    && !self.request.body().is_empty()
                    && !self.run_phase(Phase::Body)
                {
                    if !self.response.status_was_set() {
                        self.response.set_status(StatusCode::BAD_REQUEST);
                    }
                    return;
                }

                if let Some(id) = self.route {
                    let router = Arc::clone(&self.router);
                    router
                        .at(id)
                        .handler()
                        .call(&mut self.request, &mut self.response)
                        .await;
                }

                if !self.response.status_was_set() {
                    self.response.set_status(StatusCode::INTERNAL_SERVER_ERROR);
                }

                self.run_phase(Phase::Response);
            }
            Outcome::Failed(err) => {
                self.response.set_status(err.status());
                if !self.run_error_handler(err.status()).await {
                    self.response.set_body(Bytes::from_static(
                        err.message().as_bytes(),
                    ));
                }
            }
            Outcome::Unrouted(status) => {
                self.response.set_status(*status);
                if !self.run_error_handler(*status).await
                    && *status == StatusCode::NOT_FOUND
                {
                    self.response.set_body(Bytes::from_static(NOT_FOUND_BODY));
                    self.response
                        .headers_mut()
                        .insert(
                            crate::headers::standard::CONTENT_TYPE,
                            crate::headers::HeaderValue::from_static("text/html"),
                        );
                }
            }
            Outcome::Halted => {
                if !self.response.status_was_set() {
                    self.response.set_status(StatusCode::BAD_REQUEST);
                }
            }
            Outcome::Eof => {}
        }
    }

    /// Drain the serializer through the stream; a partial write resumes
    /// from the same offset.
    async fn write_response(&mut self) -> io::Result<()> {
        if self.request.method() == &Method::HEAD {
            self.serializer.suppress_body();
        }

        loop {
            self.write_buf.clear();
            let more = self
                .serializer
                .pull(&mut self.response, &mut self.write_buf)?;

            let mut written = 0;
            while written < self.write_buf.len() {
                let accepted = self.stream.write(&self.write_buf[written..]).await?;
                if accepted == 0 {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "peer gone mid-response",
                    ));
                }
                written += accepted;
            }

            if !more {
                return Ok(());
            }
        }
    }

    /// Connection reuse, decided strictly after the response is written.
    fn keep_alive(&self, outcome: &Outcome) -> bool {
        // anything short of a complete request leaves unread framing on
        // the wire; close
        if !matches!(outcome, Outcome::Complete) || !self.parser.is_complete() {
            return false;
        }

        let req = self.request.headers();
        let res = self.response.headers();
        if self.request.version() == Version::HTTP_11 {
            !req.connection_has("close") && !res.connection_has("close")
        } else {
            req.connection_has("keep-alive") && !res.connection_has("close")
        }
    }

    fn run_phase(&mut self, phase: Phase) -> bool {
        self.router
            .run_phase(self.route, phase, &mut self.request, &mut self.response)
    }

    /// Returns `true` when a registered error handler produced the
    /// response.
    async fn run_error_handler(&mut self, status: StatusCode) -> bool {
        let router = Arc::clone(&self.router);
        match router.find_error_handler(status) {
            Some(handler) => {
                handler.call(&mut self.request, &mut self.response).await;
                true
            }
            None => false,
        }
    }

    /// Reset request, response, parser and matched-route in place for the
    /// next request on this connection.
    fn reset(&mut self) {
        self.parser.reset();
        self.serializer.reset();
        self.request.clear();
        self.response.clear();
        self.route = None;
    }
}

impl<S> std::fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("route", &self.route)
            .field("buffered", &self.read_buf.len())
            .finish_non_exhaustive()
    }
}
