use std::fs::File;
use std::io;

use bytes::Bytes;

use crate::headers::HeaderMap;
use crate::http::{StatusCode, Version};

const DEFAULT_CHUNK_SIZE: usize = 4096;
const DEFAULT_MAX_WRITE_SIZE: usize = 4096 * 16;

/// The body source of a response.
///
/// Exactly one of the in-memory buffer or the streaming file supplies the
/// body. A file is owned by the response and closed when the response is
/// cleared or dropped.
#[derive(Debug, Default)]
pub enum Body {
    #[default]
    Empty,
    Buffer(Bytes),
    File {
        file: File,
        total_size: u64,
    },
}

impl Body {
    /// Returns `true` when no body byte will be produced.
    pub fn is_empty(&self) -> bool {
        match self {
            Body::Empty => true,
            Body::Buffer(buf) => buf.is_empty(),
            Body::File { total_size, .. } => *total_size == 0,
        }
    }

    /// Returns the total body size when it is known upfront.
    pub fn size(&self) -> u64 {
        match self {
            Body::Empty => 0,
            Body::Buffer(buf) => buf.len() as u64,
            Body::File { total_size, .. } => *total_size,
        }
    }
}

/// An HTTP response.
///
/// The status line and headers are serialized single-shot; the body drains
/// in multiple pulls bounded by `max_write_size`.
#[derive(Debug)]
pub struct Response {
    version: Version,
    status: StatusCode,
    reason: Option<Box<str>>,
    headers: HeaderMap,
    body: Body,
    chunked: bool,
    chunk_size: usize,
    max_write_size: usize,
    status_set: bool,
}

impl Response {
    /// Create new empty [`Response`].
    pub fn new() -> Response {
        Response {
            version: Version::HTTP_11,
            status: StatusCode::OK,
            reason: None,
            headers: HeaderMap::for_response(),
            body: Body::Empty,
            chunked: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_write_size: DEFAULT_MAX_WRITE_SIZE,
            status_set: false,
        }
    }

    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }

    pub(crate) fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Set the response status.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
        self.status_set = true;
    }

    /// Returns `true` once a status was explicitly set.
    ///
    /// A handler that never sets one yields `500 Internal Server Error`.
    #[inline]
    pub(crate) fn status_was_set(&self) -> bool {
        self.status_set
    }

    /// The custom reason phrase, when one was set.
    #[inline]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Override the canonical reason phrase.
    pub fn set_reason(&mut self, reason: impl Into<Box<str>>) {
        self.reason = Some(reason.into());
    }

    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[inline]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    #[inline]
    pub fn body(&self) -> &Body {
        &self.body
    }

    #[inline]
    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    /// Supply the body from an in-memory buffer.
    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = Body::Buffer(body.into());
    }

    /// Supply the body from a file, streamed in `chunk_size` slices.
    ///
    /// # Errors
    ///
    /// Returns an error when the file size cannot be queried.
    pub fn set_file(&mut self, file: File) -> io::Result<()> {
        let total_size = file.metadata()?.len();
        self.body = Body::File { file, total_size };
        Ok(())
    }

    /// Request chunked transfer framing for the body.
    ///
    /// No `Content-Length` is written and each drained segment is wrapped in
    /// chunk framing.
    pub fn set_chunked(&mut self) {
        self.chunked = true;
    }

    #[inline]
    pub fn is_chunked(&self) -> bool {
        self.chunked
    }

    /// The slice size used when draining a streaming body.
    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size = size.max(1);
    }

    /// The output segment cap per serializer pull.
    #[inline]
    pub fn max_write_size(&self) -> usize {
        self.max_write_size
    }

    pub fn set_max_write_size(&mut self, size: usize) {
        self.max_write_size = size.max(1);
    }

    /// Reset in place, keeping allocations, to a state equivalent to a
    /// freshly constructed response. Drops the body, closing any file.
    pub fn clear(&mut self) {
        self.version = Version::HTTP_11;
        self.status = StatusCode::OK;
        self.reason = None;
        self.headers.clear();
        self.body = Body::Empty;
        self.chunked = false;
        self.chunk_size = DEFAULT_CHUNK_SIZE;
        self.max_write_size = DEFAULT_MAX_WRITE_SIZE;
        self.status_set = false;
    }

    pub(crate) fn is_cleared(&self) -> bool {
        self.status == StatusCode::OK
            && !self.status_set
            && self.reason.is_none()
            && self.headers.is_empty()
            && matches!(self.body, Body::Empty)
            && !self.chunked
    }
}

impl Default for Response {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
