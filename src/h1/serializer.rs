use std::io::{self, Read};
use std::time::SystemTime;

use bytes::{BufMut, BytesMut};

use crate::headers::standard::{CONTENT_LENGTH, DATE, TRANSFER_ENCODING};
use crate::headers::HeaderValue;
use crate::response::{Body, Response};

/// Pull-based HTTP/1.x response serializer.
///
/// The status line and headers are emitted single-shot on the first pull;
/// the body drains across pulls in segments capped by the response's
/// `max_write_size`. The session writes each segment and pulls again until
/// the response is fully emitted, which gives natural backpressure without
/// buffering the whole response.
///
/// Responses with `1xx`, `204` or `304` status never carry a body,
/// regardless of the body source set on the response.
#[derive(Debug)]
pub struct Serializer {
    stage: Stage,
    /// Emit framing headers but no body bytes, for HEAD responses.
    suppress_body: bool,
}

#[derive(Debug, Clone, Copy)]
enum Stage {
    Head,
    Buffer {
        offset: usize,
    },
    ChunkedBuffer {
        header_done: bool,
        offset: usize,
    },
    ChunkedBufferLast,
    File {
        sent: u64,
    },
    ChunkedFile,
    Done,
}

impl Serializer {
    /// Create new [`Serializer`] positioned at the status line.
    pub fn new() -> Serializer {
        Serializer {
            stage: Stage::Head,
            suppress_body: false,
        }
    }

    /// Reset in place to a state equivalent to a freshly constructed
    /// serializer.
    pub fn reset(&mut self) {
        self.stage = Stage::Head;
        self.suppress_body = false;
    }

    /// Emit framing headers as usual but skip every body byte.
    ///
    /// Used by the session for responses to HEAD requests.
    pub fn suppress_body(&mut self) {
        self.suppress_body = true;
    }

    /// Returns `true` once the response is fully emitted.
    #[inline]
    pub fn is_done(&self) -> bool {
        matches!(self.stage, Stage::Done)
    }

    /// Emit the next segment of output into `out`.
    ///
    /// Returns `true` while more output remains; `false` means the response
    /// is fully emitted and `out` holds its final bytes.
    ///
    /// # Errors
    ///
    /// Returns an error when a streaming body source fails to read, or
    /// ends short of its declared size.
    pub fn pull(&mut self, res: &mut Response, out: &mut BytesMut) -> io::Result<bool> {
        match self.stage {
            Stage::Head => {
                self.write_head(res, out);
                self.stage = self.body_stage(res);
            }
            Stage::Buffer { offset } => {
                let cap = res.max_write_size();
                let Body::Buffer(buf) = res.body() else {
                    self.stage = Stage::Done;
                    return Ok(false);
                };
                let end = buf.len().min(offset + cap);
                out.put_slice(&buf[offset..end]);
                self.stage = if end == buf.len() {
                    Stage::Done
                } else {
                    Stage::Buffer { offset: end }
                };
            }
            Stage::ChunkedBuffer {
                header_done,
                offset,
            } => {
                let cap = res.max_write_size();
                let Body::Buffer(buf) = res.body() else {
                    self.stage = Stage::Done;
                    return Ok(false);
                };
                if buf.is_empty() {
                    write_last_chunk(out);
                    self.stage = Stage::Done;
                } else {
                    if !header_done {
                        write_chunk_header(out, buf.len() as u64);
                    }
                    let end = buf.len().min(offset + cap);
                    out.put_slice(&buf[offset..end]);
                    self.stage = if end == buf.len() {
                        out.put_slice(b"\r\n");
                        Stage::ChunkedBufferLast
                    } else {
                        Stage::ChunkedBuffer {
                            header_done: true,
                            offset: end,
                        }
                    };
                }
            }
            Stage::ChunkedBufferLast => {
                write_last_chunk(out);
                self.stage = Stage::Done;
            }
            Stage::File { sent } => {
                let cap = res.max_write_size().min(res.chunk_size());
                let Body::File { file, total_size } = res.body_mut() else {
                    self.stage = Stage::Done;
                    return Ok(false);
                };
                let total = *total_size;
                if sent >= total {
                    self.stage = Stage::Done;
                    return Ok(false);
                }
                let want = cap.min(usize::try_from(total - sent).unwrap_or(usize::MAX));
                let read = read_into(file, out, want)?;
                if read == 0 {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "file body ended short of its declared size",
                    ));
                }
                let sent = sent + read as u64;
                self.stage = if sent == total {
                    Stage::Done
                } else {
                    Stage::File { sent }
                };
            }
            Stage::ChunkedFile => {
                // one chunk per pull, leaving room for the chunk framing
                let cap = res
                    .chunk_size()
                    .min(res.max_write_size().saturating_sub(32).max(1));
                let Body::File { file, .. } = res.body_mut() else {
                    self.stage = Stage::Done;
                    return Ok(false);
                };
                let mut chunk = BytesMut::with_capacity(cap);
                let read = read_into(file, &mut chunk, cap)?;
                if read == 0 {
                    write_last_chunk(out);
                    self.stage = Stage::Done;
                } else {
                    write_chunk_header(out, read as u64);
                    out.put_slice(&chunk);
                    out.put_slice(b"\r\n");
                }
            }
            Stage::Done => {}
        }
        Ok(!self.is_done())
    }

    /// `HTTP/<version> <code> <reason>` plus every header field once.
    fn write_head(&self, res: &mut Response, out: &mut BytesMut) {
        out.put_slice(res.version().as_str().as_bytes());
        out.put_slice(b" ");
        out.put_slice(itoa::Buffer::new().format(res.status().as_u16()).as_bytes());
        out.put_slice(b" ");
        let reason = match res.reason() {
            Some(custom) => custom,
            None => res.status().canonical_reason().unwrap_or(""),
        };
        out.put_slice(reason.as_bytes());
        out.put_slice(b"\r\n");

        if !res.headers().contains(DATE) {
            out.put_slice(b"date: ");
            out.put_slice(httpdate::fmt_http_date(SystemTime::now()).as_bytes());
            out.put_slice(b"\r\n");
        }

        if !res.status().is_bodyless() {
            if res.is_chunked() {
                if !res.headers().contains(TRANSFER_ENCODING) {
                    res.headers_mut()
                        .insert(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
                }
            } else if !res.headers().contains(CONTENT_LENGTH) {
                let size = itoa::Buffer::new().format(res.body().size()).to_owned();
                if let Ok(value) = HeaderValue::try_from(size) {
                    res.headers_mut().insert(CONTENT_LENGTH, value);
                }
            }
        }

        res.headers().write_to(out);
        out.put_slice(b"\r\n");
    }

    fn body_stage(&self, res: &Response) -> Stage {
        if res.status().is_bodyless() || self.suppress_body {
            return Stage::Done;
        }
        match (res.body(), res.is_chunked()) {
            (Body::Empty, false) => Stage::Done,
            (Body::Empty, true) => Stage::ChunkedBufferLast,
            (Body::Buffer(_), false) => Stage::Buffer { offset: 0 },
            (Body::Buffer(_), true) => Stage::ChunkedBuffer {
                header_done: false,
                offset: 0,
            },
            (Body::File { .. }, false) => Stage::File { sent: 0 },
            (Body::File { .. }, true) => Stage::ChunkedFile,
        }
    }
}

impl Default for Serializer {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// `<size-hex>\r\n`
fn write_chunk_header(out: &mut BytesMut, size: u64) {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";

    let mut scratch = [0u8; 16];
    let mut at = scratch.len();
    let mut rest = size;
    loop {
        at -= 1;
        scratch[at] = DIGITS[(rest % 16) as usize];
        rest /= 16;
        if rest == 0 {
            break;
        }
    }
    out.put_slice(&scratch[at..]);
    out.put_slice(b"\r\n");
}

/// `0\r\n\r\n`
fn write_last_chunk(out: &mut BytesMut) {
    out.put_slice(b"0\r\n\r\n");
}

fn read_into(file: &mut std::fs::File, out: &mut BytesMut, want: usize) -> io::Result<usize> {
    let mut scratch = vec![0u8; want];
    let mut filled = 0;
    while filled < want {
        match file.read(&mut scratch[filled..]) {
            Ok(0) => break,
            Ok(read) => filled += read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    out.put_slice(&scratch[..filled]);
    Ok(filled)
}
