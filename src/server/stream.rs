use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Bounded async byte I/O over one connection.
///
/// Both I/O calls may transfer fewer bytes than requested; a zero read
/// means EOF, a zero write means the peer is gone. Failing calls terminate
/// the session.
///
/// Two implementations are intended: [`PlainStream`] for cleartext TCP and
/// a TLS wrapper dropping in at the byte layer.
pub trait StreamHandler: Send {
    /// Read up to `buf.len()` bytes. `Ok(0)` is EOF.
    fn read(&mut self, buf: &mut [u8]) -> impl Future<Output = io::Result<usize>> + Send;

    /// Write up to `buf.len()` bytes, returning how many were accepted.
    fn write(&mut self, buf: &[u8]) -> impl Future<Output = io::Result<usize>> + Send;

    /// Flush and close the write side.
    fn shutdown(&mut self) -> impl Future<Output = io::Result<()>> + Send;
}

/// Plaintext stream handler.
///
/// Wraps any async byte stream and applies the per-listener timeout to
/// every read and write; a window with no progress ends the session.
#[derive(Debug)]
pub struct PlainStream<T> {
    io: T,
    timeout: Option<Duration>,
}

impl<T> PlainStream<T> {
    /// Wrap a stream without a timeout.
    pub fn new(io: T) -> PlainStream<T> {
        PlainStream { io, timeout: None }
    }

    /// Wrap a stream with a timeout applied to each I/O call.
    pub fn with_timeout(io: T, timeout: Duration) -> PlainStream<T> {
        PlainStream {
            io,
            timeout: Some(timeout),
        }
    }
}

impl<T> StreamHandler for PlainStream<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.timeout {
            Some(window) => match tokio::time::timeout(window, self.io.read(buf)).await {
                Ok(result) => result,
                Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "read timed out")),
            },
            None => self.io.read(buf).await,
        }
    }

    async fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.timeout {
            Some(window) => match tokio::time::timeout(window, self.io.write(buf)).await {
                Ok(result) => result,
                Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "write timed out")),
            },
            None => self.io.write(buf).await,
        }
    }

    async fn shutdown(&mut self) -> io::Result<()> {
        self.io.shutdown().await
    }
}
