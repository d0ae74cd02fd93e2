use bytes::{Buf, Bytes, BytesMut};

use crate::common::{atou_hex, trim_ows};
use crate::h1::error::{ParseError, ParseErrorKind};
use crate::h1::matches;
use crate::h1::{Milestone, Progress};
use crate::headers::standard::CONTENT_LENGTH;
use crate::headers::{HeaderName, HeaderValue, Severity};
use crate::http::{StatusCode, Version};
use crate::request::Policy;
use crate::response::Response;

const VERSION_SIZE: usize = b"HTTP/1.1".len();
const CHUNK_SIZE_DIGITS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Version,
    StatusCode,
    Reason,
    StatusLf,
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
    DataEof,
    Complete,
    Failed,
}

/// The request parser's mirror: a byte-incremental HTTP/1.x response
/// parser for the client direction.
///
/// Same engine shape as the server side: arbitrary input slices, explicit
/// CR/LF states, resumable at every byte boundary, and the same limit and
/// framing discipline. A response without `Content-Length` or chunked
/// framing is read to EOF; the caller signals EOF with
/// [`finish_eof`][ResponseParser::finish_eof].
#[derive(Debug)]
pub struct ResponseParser {
    state: State,
    version: Vec<u8>,
    digits: Vec<u8>,
    reason: Vec<u8>,
    name: Vec<u8>,
    value: Vec<u8>,
    chunk_line: Vec<u8>,
    body: BytesMut,
    header_bytes: usize,
    chunk_remaining: u64,
    body_read: u64,
    policy: Policy,
    /// The response answers a HEAD request, or a status that never carries
    /// a body.
    no_body: bool,
    error: Option<ParseError>,
}

impl ResponseParser {
    /// Create new [`ResponseParser`] positioned at the version literal.
    pub fn new() -> ResponseParser {
        ResponseParser {
            state: State::Version,
            version: Vec::new(),
            digits: Vec::new(),
            reason: Vec::new(),
            name: Vec::new(),
            value: Vec::new(),
            chunk_line: Vec::new(),
            body: BytesMut::new(),
            header_bytes: 0,
            chunk_remaining: 0,
            body_read: 0,
            policy: Policy::DEFAULT,
            no_body: false,
            error: None,
        }
    }

    /// Reset in place, keeping allocations.
    pub fn reset(&mut self) {
        self.state = State::Version;
        self.version.clear();
        self.digits.clear();
        self.reason.clear();
        self.name.clear();
        self.value.clear();
        self.chunk_line.clear();
        self.body.clear();
        self.header_bytes = 0;
        self.chunk_remaining = 0;
        self.body_read = 0;
        self.no_body = false;
        self.error = None;
    }

    /// Mark the awaited response as bodyless regardless of framing
    /// headers, for responses to HEAD requests.
    pub fn expect_no_body(&mut self) {
        self.no_body = true;
    }

    /// Override the default limits.
    pub fn set_policy(&mut self, policy: Policy) {
        self.policy = policy;
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        matches!(self.state, State::Complete)
    }

    /// Returns `true` while the body is framed by connection close.
    #[inline]
    pub fn reads_to_eof(&self) -> bool {
        matches!(self.state, State::DataEof)
    }

    /// Close the body of an EOF-framed response.
    ///
    /// # Errors
    ///
    /// Returns an error when the response is not EOF-framed, i.e. the
    /// connection died mid-message.
    pub fn finish_eof(&mut self, res: &mut Response) -> Result<(), ParseError> {
        if !self.reads_to_eof() {
            let err = ParseError::new(ParseErrorKind::Framing, "connection closed mid-response");
            self.state = State::Failed;
            self.error = Some(err.clone());
            return Err(err);
        }
        self.state = State::Complete;
        res.set_body(self.body.split().freeze());
        Ok(())
    }

    /// Consume as much of `input` as framing allows, building `res`.
    ///
    /// # Errors
    ///
    /// A reject is permanent, as on the server side.
    pub fn advance(
        &mut self,
        input: &mut BytesMut,
        res: &mut Response,
    ) -> Result<Progress, ParseError> {
        if let State::Failed = self.state {
            return Err(self
                .error
                .clone()
                .unwrap_or_else(|| ParseErrorKind::Framing.into()));
        }
        match self.run(input, res) {
            Ok(progress) => Ok(progress),
            Err(err) => {
                self.state = State::Failed;
                self.error = Some(err.clone());
                Err(err)
            }
        }
    }

    fn run(&mut self, input: &mut BytesMut, res: &mut Response) -> Result<Progress, ParseError> {
        loop {
            match self.state {
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
                    if delim != b' ' {
                        return Err(ParseErrorKind::VersionSyntax.into());
                    }
                    match Version::from_bytes(&self.version) {
                        Some(version) => res.set_version(version),
                        None => return Err(ParseErrorKind::VersionSyntax.into()),
                    }
                    self.state = State::StatusCode;
                }
                State::StatusCode => {
                    let scanned = scan(input, |byte| byte.is_ascii_digit());
                    if self.digits.len() + scanned > 3 {
                        return Err(ParseError::new(
                            ParseErrorKind::VersionSyntax,
                            "invalid status line",
                        ));
                    }
                    self.digits.extend_from_slice(&input[..scanned]);
                    let Some(&delim) = input.get(scanned) else {
                        input.advance(scanned);
                        return Ok(Progress::Partial);
                    };
                    input.advance(scanned + 1);

                    let code = crate::common::atou(&self.digits)
                        .and_then(|code| u16::try_from(code).ok())
                        .and_then(|code| StatusCode::from_u16(code).ok());
                    let Some(code) = code else {
                        return Err(ParseError::new(
                            ParseErrorKind::VersionSyntax,
                            "invalid status line",
                        ));
                    };
                    res.set_status(code);

                    match delim {
                        b' ' => self.state = State::Reason,
                        // a missing reason phrase is accepted
                        b'\r' => self.state = State::StatusLf,
                        _ => {
                            return Err(ParseError::new(
                                ParseErrorKind::VersionSyntax,
                                "invalid status line",
                            ));
                        }
                    }
                }
                State::Reason => {
                    let scanned = scan(input, matches::is_field_value);
                    self.reason.extend_from_slice(&input[..scanned]);
                    if self.reason.len() > 256 {
                        return Err(ParseError::new(
                            ParseErrorKind::VersionSyntax,
                            "reason phrase too long",
                        ));
                    }
                    let Some(&delim) = input.get(scanned) else {
                        input.advance(scanned);
                        return Ok(Progress::Partial);
                    };
                    input.advance(scanned + 1);
                    if delim != b'\r' {
                        return Err(ParseError::new(
                            ParseErrorKind::VersionSyntax,
                            "invalid status line",
                        ));
                    }
                    self.state = State::StatusLf;
                }
                State::StatusLf => {
                    let Some(&byte) = input.first() else {
                        return Ok(Progress::Partial);
                    };
                    input.advance(1);
                    if byte != b'\n' {
                        return Err(ParseError::new(
                            ParseErrorKind::VersionSyntax,
                            "expected LF after status line CR",
                        ));
                    }
                    let reason = str::from_utf8(&self.reason).unwrap_or("");
                    let keep = match res.status().canonical_reason() {
                        Some(canonical) => reason != canonical,
                        None => true,
                    };
                    if keep && !reason.is_empty() {
                        res.set_reason(reason);
                    }
                    self.reason.clear();
                    self.state = State::HeaderKey;
                    return Ok(Progress::Milestone(Milestone::MetadataDone));
                }
                State::HeaderKey => {
                    if self.name.is_empty() {
                        match input.first() {
                            Some(b'\r') => {
                                input.advance(1);
                                self.bump_header(1)?;
                                self.state = State::HeadersLf;
                                continue;
                            }
                            Some(_) => {}
                            None => return Ok(Progress::Partial),
                        }
                    }
                    let scanned = scan(input, matches::is_tchar);
                    self.bump_header(scanned)?;
                    self.name.extend_from_slice(&input[..scanned]);
                    let Some(&delim) = input.get(scanned) else {
                        input.advance(scanned);
                        return Ok(Progress::Partial);
                    };
                    input.advance(scanned + 1);
                    self.bump_header(1)?;
                    if delim != b':' || self.name.is_empty() {
                        return Err(ParseErrorKind::HeaderName.into());
                    }
                    self.state = State::HeaderValue;
                }
                State::HeaderValue => {
                    let scanned = scan(input, matches::is_field_value);
                    self.bump_header(scanned)?;
                    self.value.extend_from_slice(&input[..scanned]);
                    let Some(&delim) = input.get(scanned) else {
                        input.advance(scanned);
                        return Ok(Progress::Partial);
                    };
                    input.advance(scanned + 1);
                    self.bump_header(1)?;
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
                    self.bump_header(1)?;
                    if byte != b'\n' {
                        return Err(ParseErrorKind::HeaderCrLf.into());
                    }
                    self.commit_header(res)?;
                    self.state = State::HeaderKey;
                }
                State::HeadersLf => {
                    let Some(&byte) = input.first() else {
                        return Ok(Progress::Partial);
                    };
                    input.advance(1);
                    self.bump_header(1)?;
                    if byte != b'\n' {
                        return Err(ParseErrorKind::HeaderCrLf.into());
                    }
                    self.state = self.decide_framing(res)?;
                    return Ok(Progress::Milestone(Milestone::HeadersDone));
                }
                State::DataContentLength => {
                    if self.chunk_remaining == 0 {
                        res.set_body(self.body.split().freeze());
                        self.state = State::Complete;
                        return Ok(Progress::Milestone(Milestone::Complete));
                    }
                    if input.is_empty() {
                        return Ok(Progress::Partial);
                    }
                    let take = usize::try_from(self.chunk_remaining)
                        .unwrap_or(usize::MAX)
                        .min(input.len());
                    self.body.extend_from_slice(&input[..take]);
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
                            self.parse_chunk_size()?;
                            self.state = State::DataChunkedSizeLf;
                        }
                        b';' => self.state = State::DataChunkedExt,
                        _ => return Err(ParseErrorKind::ChunkSize.into()),
                    }
                }
                State::DataChunkedExt => {
                    let scanned = scan(input, matches::is_field_value);
                    let Some(&delim) = input.get(scanned) else {
                        input.advance(scanned);
                        return Ok(Progress::Partial);
                    };
                    input.advance(scanned + 1);
                    if delim != b'\r' {
                        return Err(ParseErrorKind::ChunkSize.into());
                    }
                    self.parse_chunk_size()?;
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
                    self.body.extend_from_slice(&input[..take]);
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
                    res.set_body(self.body.split().freeze());
                    self.state = State::Complete;
                    return Ok(Progress::Milestone(Milestone::Complete));
                }
                State::DataEof => {
                    if input.is_empty() {
                        return Ok(Progress::Partial);
                    }
                    self.body_read += input.len() as u64;
                    if self.body_read > self.policy.max_body_size {
                        return Err(ParseErrorKind::BodyTooLarge.into());
                    }
                    self.body.extend_from_slice(input);
                    input.clear();
                }
                State::Complete => {
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

    fn bump_header(&mut self, len: usize) -> Result<(), ParseError> {
        self.header_bytes += len;
        if self.header_bytes > self.policy.max_header_size {
            return Err(ParseErrorKind::HeadersTooLarge.into());
        }
        Ok(())
    }

    fn commit_header(&mut self, res: &mut Response) -> Result<(), ParseError> {
        let name = HeaderName::from_bytes(&self.name)
            .map_err(|_| ParseError::from(ParseErrorKind::HeaderName))?;
        let value = trim_ows(&self.value);
        let value = HeaderValue::from_bytes(Bytes::copy_from_slice(value))
            .map_err(|_| ParseError::from(ParseErrorKind::HeaderValue))?;

        self.name.clear();
        self.value.clear();

        match res.headers_mut().add(name, value) {
            Ok(()) => Ok(()),
            Err(err) => match err.severity() {
                Severity::Warning => Ok(()),
                Severity::Critical if err.is_framing() => {
                    Err(ParseError::new(ParseErrorKind::Framing, err.message()))
                }
                Severity::Critical => {
                    Err(ParseError::new(ParseErrorKind::HeaderValue, err.message()))
                }
            },
        }
    }

    fn decide_framing(&mut self, res: &Response) -> Result<State, ParseError> {
        let headers = res.headers();

        if self.no_body || res.status().is_bodyless() {
            // framing headers on such a message declare a body that must
            // never arrive
            if res.status().is_bodyless()
                && !self.no_body
                && (headers.transfer_chunked().is_some()
                    || headers.content_length().unwrap_or(0) != 0)
            {
                return Err(ParseErrorKind::PayloadNoBodyAllowed.into());
            }
            self.chunk_remaining = 0;
            return Ok(State::DataContentLength);
        }

        match headers.transfer_chunked() {
            Some(false) => Err(ParseErrorKind::TransferEncodingUnsupported.into()),
            Some(true) if headers.contains(CONTENT_LENGTH) => Err(ParseError::new(
                ParseErrorKind::Framing,
                "chunked together with content-length",
            )),
            Some(true) => Ok(State::DataChunkedSize),
            None => match headers.content_length() {
                Some(len) if len > self.policy.max_body_size => {
                    Err(ParseErrorKind::BodyTooLarge.into())
                }
                Some(len) => {
                    self.chunk_remaining = len;
                    Ok(State::DataContentLength)
                }
                None if headers.contains(CONTENT_LENGTH) => Err(ParseError::new(
                    ParseErrorKind::Framing,
                    "content-length is not a non-negative integer",
                )),
                // no framing headers: the body runs to connection close
                None => Ok(State::DataEof),
            },
        }
    }

    fn parse_chunk_size(&mut self) -> Result<(), ParseError> {
        let Some(size) = atou_hex(&self.chunk_line) else {
            return Err(ParseErrorKind::ChunkSize.into());
        };
        self.chunk_line.clear();
        if self.body_read + size > self.policy.max_body_size {
            return Err(ParseErrorKind::BodyTooLarge.into());
        }
        self.chunk_remaining = size;
        Ok(())
    }
}

impl Default for ResponseParser {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

fn scan(input: &[u8], class: impl Fn(u8) -> bool) -> usize {
    let mut idx = 0;
    while idx < input.len() && class(input[idx]) {
        idx += 1;
    }
    idx
}
