use bytes::{Buf, Bytes, BytesMut};

use super::error::{ParseError, ParseErrorKind};
use super::matches;
use crate::common::{atou_hex, trim_ows};
use crate::headers::standard::CONTENT_LENGTH;
use crate::headers::{HeaderName, HeaderValue, Severity};
use crate::http::{Method, Version};
use crate::request::Request;
use crate::uri::{Uri, UriError};

const VERSION_SIZE: usize = b"HTTP/1.1".len();
const CHUNK_SIZE_DIGITS: usize = 16;

/// A parser position where the session runs a middleware phase or
/// dispatches the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Milestone {
    /// Method, target and version are parsed and immutable.
    MetadataDone,
    /// The header section is parsed and immutable; body framing is decided.
    HeadersDone,
    /// One chunked body segment landed in the request body.
    DataChunkDone,
    /// The request is fully parsed.
    Complete,
}

/// The outcome of one [`Parser::advance`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Input exhausted without reaching a milestone; feed more bytes.
    Partial,
    /// A milestone was reached; unconsumed input stays in the buffer.
    Milestone(Milestone),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Method,
    TargetStart,
    OriginPath,
    OriginQuery,
    Version,
    MetadataLf,
    HeaderKey,
    HeaderValue,
    HeaderLf,
    HeadersLf,
    DataContentLength,
    DataChunkedSize,
    DataChunkedExt,
    DataChunkedSizeLf,
    DataChunkedData,
    DataChunkedDataCr,
    DataChunkedDataLf,
    DataChunkedLastCr,
    DataChunkedLastLf,
    Complete,
    Failed,
}

/// Byte-incremental HTTP/1.x request parser.
///
/// [`advance`][Parser::advance] accepts any slice of input and consumes as
/// many bytes as it can without violating framing, returning at the next
/// [`Milestone`] or when the input runs dry. Resumption picks up at the next
/// byte: feeding a request split at any byte boundary produces the same
/// result as feeding it whole.
///
/// The parser is fully synchronous and never unwinds; every reject
/// transitions it to a permanent failed state carrying a [`ParseError`]
/// with its expected HTTP status.
#[derive(Debug)]
pub struct Parser {
    state: State,
    method: Vec<u8>,
    target: Vec<u8>,
    version: Vec<u8>,
    name: Vec<u8>,
    value: Vec<u8>,
    chunk_line: Vec<u8>,
    pending_version: Option<Version>,
    header_bytes: usize,
    chunk_remaining: u64,
    body_read: u64,
    error: Option<ParseError>,
}

impl Parser {
    /// Create new [`Parser`] positioned at the method token.
    pub fn new() -> Parser {
        Parser {
            state: State::Method,
            method: Vec::new(),
            target: Vec::new(),
            version: Vec::new(),
            name: Vec::new(),
            value: Vec::new(),
            chunk_line: Vec::new(),
            pending_version: None,
            header_bytes: 0,
            chunk_remaining: 0,
            body_read: 0,
            error: None,
        }
    }

    /// Reset in place, keeping allocations, to a state equivalent to a
    /// freshly constructed parser.
    pub fn reset(&mut self) {
        self.state = State::Method;
        self.method.clear();
        self.target.clear();
        self.version.clear();
        self.name.clear();
        self.value.clear();
        self.chunk_line.clear();
        self.pending_version = None;
        self.header_bytes = 0;
        self.chunk_remaining = 0;
        self.body_read = 0;
        self.error = None;
    }

    /// Returns `true` once the request is fully parsed.
    #[inline]
    pub fn is_complete(&self) -> bool {
        matches!(self.state, State::Complete)
    }

    /// Returns `true` once the parser rejected its input.
    #[inline]
    pub fn is_failed(&self) -> bool {
        matches!(self.state, State::Failed)
    }

    /// Returns `true` once any request byte was consumed.
    ///
    /// A session distinguishes clean EOF between requests from EOF inside
    /// one with this.
    #[inline]
    pub fn has_progress(&self) -> bool {
        !(matches!(self.state, State::Method) && self.method.is_empty())
    }

    /// Consume as much of `input` as framing allows, building `req`.
    ///
    /// # Errors
    ///
    /// A reject replaces the parser state with the failed state and returns
    /// the error; repeated calls keep returning it. The session maps the
    /// error's expected status to the response.
    pub fn advance(
        &mut self,
        input: &mut BytesMut,
        req: &mut Request,
    ) -> Result<Progress, ParseError> {
        if let State::Failed = self.state {
            return Err(self
                .error
                .clone()
                .unwrap_or_else(|| ParseErrorKind::Framing.into()));
        }
        match self.run(input, req) {
            Ok(progress) => Ok(progress),
            Err(err) => {
                self.state = State::Failed;
                self.error = Some(err.clone());
                Err(err)
            }
        }
    }

    fn run(
        &mut self,
        input: &mut BytesMut,
        req: &mut Request,
    ) -> Result<Progress, ParseError> {
        loop {
            match self.state {
                State::Method => {
                    let scanned = scan(input, matches::is_tchar);
                    if self.method.len() + scanned > req.policy().max_method_token_size {
                        return Err(ParseError::new(
                            ParseErrorKind::MethodToken,
                            "method token too long",
                        ));
                    }
                    self.method.extend_from_slice(&input[..scanned]);
                    let Some(&delim) = input.get(scanned) else {
                        input.advance(scanned);
                        return Ok(Progress::Partial);
                    };
                    input.advance(scanned + 1);
                    if delim != b' ' || self.method.is_empty() {
                        return Err(ParseErrorKind::MethodToken.into());
                    }
                    self.state = State::TargetStart;
                }
                State::TargetStart => {
                    let Some(&byte) = input.first() else {
                        return Ok(Progress::Partial);
                    };
                    match byte {
                        b'/' => self.state = State::OriginPath,
                        b'*' => {
                            return Err(ParseError::new(
                                ParseErrorKind::UriSyntax,
                                "asterisk-form target not supported",
                            ));
                        }
                        _ => {
                            return Err(ParseError::new(
                                ParseErrorKind::UriSyntax,
                                "only origin-form targets are supported",
                            ));
                        }
                    }
                }
                State::OriginPath | State::OriginQuery => {
                    let table: fn(u8) -> bool = if self.state == State::OriginPath {
                        matches::is_path_char
                    } else {
                        matches::is_query_char
                    };
                    let scanned = scan(input, table);
                    if self.target.len() + scanned > req.policy().max_uri_size {
                        return Err(ParseErrorKind::UriTooLong.into());
                    }
                    self.target.extend_from_slice(&input[..scanned]);
                    let Some(&delim) = input.get(scanned) else {
                        input.advance(scanned);
                        return Ok(Progress::Partial);
                    };
                    input.advance(scanned + 1);
                    match delim {
                        b' ' => self.state = State::Version,
                        b'?' if self.state == State::OriginPath => {
                            if self.target.len() + 1 > req.policy().max_uri_size {
                                return Err(ParseErrorKind::UriTooLong.into());
                            }
                            self.target.push(b'?');
                            self.state = State::OriginQuery;
                        }
                        b'#' => {
                            return Err(ParseError::new(
                                ParseErrorKind::UriSyntax,
                                "fragment in request target",
                            ));
                        }
                        _ => return Err(ParseErrorKind::UriSyntax.into()),
                    }
                }
                State::Version => {
                    let scanned = scan(input, matches::is_version_char);
                    if self.version.len() + scanned > VERSION_SIZE {
                        return Err(ParseErrorKind::VersionSyntax.into());
                    }
                    self.version.extend_from_slice(&input[..scanned]);
                    let Some(&delim) = input.get(scanned) else {
                        input.advance(scanned);
                        return Ok(Progress::Partial);
                    };
                    input.advance(scanned + 1);
                    if delim != b'\r' {
                        return Err(ParseErrorKind::VersionSyntax.into());
                    }
                    match Version::from_bytes(&self.version) {
                        Some(version) => self.pending_version = Some(version),
                        None => return Err(ParseErrorKind::VersionSyntax.into()),
                    }
                    self.state = State::MetadataLf;
                }
                State::MetadataLf => {
                    let Some(&byte) = input.first() else {
                        return Ok(Progress::Partial);
                    };
                    input.advance(1);
                    if byte != b'\n' {
                        return Err(ParseError::new(
                            ParseErrorKind::VersionSyntax,
                            "expected LF after request line CR",
                        ));
                    }

                    let method = Method::from_token(&self.method)
                        .map_err(|_| ParseError::from(ParseErrorKind::MethodToken))?;
                    let uri = Uri::parse_origin(&self.target).map_err(uri_error)?;
                    let version = self
                        .pending_version
                        .take()
                        .unwrap_or(Version::HTTP_11);

                    req.set_metadata(method, uri, version);
                    self.method.clear();
                    self.target.clear();
                    self.version.clear();
                    self.state = State::HeaderKey;
                    return Ok(Progress::Milestone(Milestone::MetadataDone));
                }
                State::HeaderKey => {
                    // an empty line ends the header section
                    if self.name.is_empty() {
                        match input.first() {
                            Some(b'\r') => {
                                input.advance(1);
                                self.bump_header(1, req)?;
                                self.state = State::HeadersLf;
                                continue;
                            }
                            Some(_) => {}
                            None => return Ok(Progress::Partial),
                        }
                    }
                    let scanned = scan(input, matches::is_tchar);
                    self.bump_header(scanned, req)?;
                    self.name.extend_from_slice(&input[..scanned]);
                    let Some(&delim) = input.get(scanned) else {
                        input.advance(scanned);
                        return Ok(Progress::Partial);
                    };
                    input.advance(scanned + 1);
                    self.bump_header(1, req)?;
                    if delim != b':' || self.name.is_empty() {
                        return Err(ParseErrorKind::HeaderName.into());
                    }
                    self.state = State::HeaderValue;
                }
                State::HeaderValue => {
                    let scanned = scan(input, matches::is_field_value);
                    self.bump_header(scanned, req)?;
                    self.value.extend_from_slice(&input[..scanned]);
                    let Some(&delim) = input.get(scanned) else {
                        input.advance(scanned);
                        return Ok(Progress::Partial);
                    };
                    input.advance(scanned + 1);
                    self.bump_header(1, req)?;
                    match delim {
                        b'\r' => self.state = State::HeaderLf,
                        b'\n' => {
                            return Err(ParseError::new(
                                ParseErrorKind::HeaderCrLf,
                                "bare LF in header line",
                            ));
                        }
                        _ => return Err(ParseErrorKind::HeaderValue.into()),
                    }
                }
                State::HeaderLf => {
                    let Some(&byte) = input.first() else {
                        return Ok(Progress::Partial);
                    };
                    input.advance(1);
                    self.bump_header(1, req)?;
                    if byte != b'\n' {
                        return Err(ParseErrorKind::HeaderCrLf.into());
                    }
                    self.commit_header(req)?;
                    self.state = State::HeaderKey;
                }
                State::HeadersLf => {
                    let Some(&byte) = input.first() else {
                        return Ok(Progress::Partial);
                    };
                    input.advance(1);
                    self.bump_header(1, req)?;
                    if byte != b'\n' {
                        return Err(ParseErrorKind::HeaderCrLf.into());
                    }
                    self.state = self.decide_framing(req)?;
                    return Ok(Progress::Milestone(Milestone::HeadersDone));
                }
                State::DataContentLength => {
                    if self.chunk_remaining == 0 {
                        self.state = State::Complete;
                        return Ok(Progress::Milestone(Milestone::Complete));
                    }
                    if input.is_empty() {
                        return Ok(Progress::Partial);
                    }
                    let take = usize::try_from(self.chunk_remaining)
                        .unwrap_or(usize::MAX)
                        .min(input.len());
                    req.extend_body(&input[..take]);
                    input.advance(take);
                    self.chunk_remaining -= take as u64;
                    self.body_read += take as u64;
                }
                State::DataChunkedSize => {
                    let scanned = scan(input, |byte| byte.is_ascii_hexdigit());
                    if self.chunk_line.len() + scanned > CHUNK_SIZE_DIGITS {
                        return Err(ParseErrorKind::ChunkSize.into());
                    }
                    self.chunk_line.extend_from_slice(&input[..scanned]);
                    let Some(&delim) = input.get(scanned) else {
                        input.advance(scanned);
                        return Ok(Progress::Partial);
                    };
                    input.advance(scanned + 1);
                    match delim {
                        b'\r' => {
                            self.parse_chunk_size(req)?;
                            self.state = State::DataChunkedSizeLf;
                        }
                        b';' => self.state = State::DataChunkedExt,
                        _ => return Err(ParseErrorKind::ChunkSize.into()),
                    }
                }
                State::DataChunkedExt => {
                    // chunk extensions are skipped, not interpreted
                    let scanned = scan(input, matches::is_field_value);
                    let Some(&delim) = input.get(scanned) else {
                        input.advance(scanned);
                        return Ok(Progress::Partial);
                    };
                    input.advance(scanned + 1);
                    if delim != b'\r' {
                        return Err(ParseErrorKind::ChunkSize.into());
                    }
                    self.parse_chunk_size(req)?;
                    self.state = State::DataChunkedSizeLf;
                }
                State::DataChunkedSizeLf => {
                    let Some(&byte) = input.first() else {
                        return Ok(Progress::Partial);
                    };
                    input.advance(1);
                    if byte != b'\n' {
                        return Err(ParseErrorKind::ChunkSize.into());
                    }
                    self.state = if self.chunk_remaining == 0 {
                        State::DataChunkedLastCr
                    } else {
                        State::DataChunkedData
                    };
                }
                State::DataChunkedData => {
                    if input.is_empty() {
                        return Ok(Progress::Partial);
                    }
                    let take = usize::try_from(self.chunk_remaining)
                        .unwrap_or(usize::MAX)
                        .min(input.len());
                    req.extend_body(&input[..take]);
                    input.advance(take);
                    self.chunk_remaining -= take as u64;
                    self.body_read += take as u64;
                    if self.chunk_remaining == 0 {
                        self.state = State::DataChunkedDataCr;
                    }
                }
                State::DataChunkedDataCr => {
                    let Some(&byte) = input.first() else {
                        return Ok(Progress::Partial);
                    };
                    input.advance(1);
                    if byte != b'\r' {
                        return Err(ParseError::new(
                            ParseErrorKind::ChunkSize,
                            "chunk data not terminated by CRLF",
                        ));
                    }
                    self.state = State::DataChunkedDataLf;
                }
                State::DataChunkedDataLf => {
                    let Some(&byte) = input.first() else {
                        return Ok(Progress::Partial);
                    };
                    input.advance(1);
                    if byte != b'\n' {
                        return Err(ParseError::new(
                            ParseErrorKind::ChunkSize,
                            "chunk data not terminated by CRLF",
                        ));
                    }
                    self.state = State::DataChunkedSize;
                    return Ok(Progress::Milestone(Milestone::DataChunkDone));
                }
                State::DataChunkedLastCr => {
                    let Some(&byte) = input.first() else {
                        return Ok(Progress::Partial);
                    };
                    input.advance(1);
                    if byte != b'\r' {
                        return Err(ParseError::new(
                            ParseErrorKind::Framing,
                            "trailer section not supported",
                        ));
                    }
                    self.state = State::DataChunkedLastLf;
                }
                State::DataChunkedLastLf => {
                    let Some(&byte) = input.first() else {
                        return Ok(Progress::Partial);
                    };
                    input.advance(1);
                    if byte != b'\n' {
                        return Err(ParseErrorKind::ChunkSize.into());
                    }
                    self.state = State::Complete;
                    return Ok(Progress::Milestone(Milestone::Complete));
                }
                State::Complete => {
                    // pipelined bytes stay untouched for the next request
                    return Ok(Progress::Milestone(Milestone::Complete));
                }
                State::Failed => {
                    return Err(self
                        .error
                        .clone()
                        .unwrap_or_else(|| ParseErrorKind::Framing.into()));
                }
            }
        }
    }

    fn bump_header(&mut self, len: usize, req: &Request) -> Result<(), ParseError> {
        self.header_bytes += len;
        if self.header_bytes > req.policy().max_header_size {
            return Err(ParseErrorKind::HeadersTooLarge.into());
        }
        Ok(())
    }

    fn commit_header(&mut self, req: &mut Request) -> Result<(), ParseError> {
        let name = HeaderName::from_bytes(&self.name)
            .map_err(|_| ParseError::from(ParseErrorKind::HeaderName))?;
        let value = trim_ows(&self.value);
        let value = HeaderValue::from_bytes(Bytes::copy_from_slice(value))
            .map_err(|_| ParseError::from(ParseErrorKind::HeaderValue))?;

        self.name.clear();
        self.value.clear();

        match req.add_header(name, value) {
            Ok(()) => Ok(()),
            Err(err) => match err.severity() {
                // the value is dropped, the message stays usable
                Severity::Warning => Ok(()),
                Severity::Critical if err.is_framing() => Err(ParseError::new(
                    ParseErrorKind::Framing,
                    err.message(),
                )),
                Severity::Critical => Err(ParseError::new(
                    ParseErrorKind::HeaderValue,
                    err.message(),
                )),
            },
        }
    }

    /// Body framing rules applied once the header section closes.
    fn decide_framing(&mut self, req: &Request) -> Result<State, ParseError> {
        let headers = req.headers();
        let content_length_present = headers.contains(CONTENT_LENGTH);

        match headers.transfer_chunked() {
            Some(false) => Err(ParseErrorKind::TransferEncodingUnsupported.into()),
            Some(true) if content_length_present => Err(ParseError::new(
                ParseErrorKind::Framing,
                "chunked together with content-length",
            )),
            Some(true) if req.version() == Version::HTTP_10 => Err(ParseError::new(
                ParseErrorKind::Framing,
                "transfer-encoding on HTTP/1.0",
            )),
            Some(true) => {
                self.chunk_remaining = 0;
                Ok(State::DataChunkedSize)
            }
            None => match headers.content_length() {
                Some(len) if len > req.policy().max_body_size => {
                    Err(ParseErrorKind::BodyTooLarge.into())
                }
                Some(len) => {
                    self.chunk_remaining = len;
                    Ok(State::DataContentLength)
                }
                None if content_length_present => {
                    // unreachable through `add`, reachable through header
                    // mutation in middleware
                    Err(ParseError::new(
                        ParseErrorKind::Framing,
                        "content-length is not a non-negative integer",
                    ))
                }
                None if req.method().is_bodyless() => {
                    self.chunk_remaining = 0;
                    Ok(State::DataContentLength)
                }
                None => Err(ParseErrorKind::LengthRequired.into()),
            },
        }
    }

    fn parse_chunk_size(&mut self, req: &Request) -> Result<(), ParseError> {
        let Some(size) = atou_hex(&self.chunk_line) else {
            return Err(ParseErrorKind::ChunkSize.into());
        };
        self.chunk_line.clear();
        if self.body_read + size > req.policy().max_body_size {
            return Err(ParseErrorKind::BodyTooLarge.into());
        }
        self.chunk_remaining = size;
        Ok(())
    }
}

impl Default for Parser {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// Count leading bytes admitted by the class.
fn scan(input: &[u8], class: impl Fn(u8) -> bool) -> usize {
    let mut idx = 0;
    while idx < input.len() && class(input[idx]) {
        idx += 1;
    }
    idx
}

fn uri_error(err: UriError) -> ParseError {
    match err {
        UriError::NotOriginForm => ParseError::new(
            ParseErrorKind::UriSyntax,
            "only origin-form targets are supported",
        ),
        UriError::InvalidPath | UriError::InvalidQuery => ParseErrorKind::UriSyntax.into(),
        UriError::Fragment => ParseError::new(
            ParseErrorKind::UriSyntax,
            "fragment in request target",
        ),
    }
}
