use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpSocket};
use tokio::sync::watch;

use super::session::Session;
use super::stream::PlainStream;
use super::{ListenerConf, ServerError};
use crate::router::Router;

/// Owns the listening socket for one endpoint and spawns a session task
/// per accepted connection.
#[derive(Debug)]
pub struct Acceptor {
    listener: TcpListener,
    timeout: Option<Duration>,
}

impl Acceptor {
    /// Bind the listener described by `conf`.
    ///
    /// # Errors
    ///
    /// Returns an error when the address does not parse, TLS is requested
    /// (no TLS stream handler ships with the core), or the bind fails.
    pub fn bind(conf: &ListenerConf) -> Result<Acceptor, ServerError> {
        if conf.ssl {
            return Err(ServerError::TlsNotSupported);
        }

        let addr: SocketAddr = conf.socket_addr()?;
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_reuseaddr(true)?;
        socket.bind(addr)?;
        let listener = socket.listen(conf.backlog)?;

        tracing::info!("listening on {addr}");
        Ok(Acceptor {
            listener,
            timeout: conf.timeout_ms.map(Duration::from_millis),
        })
    }

    /// The bound address, with the OS-assigned port resolved.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until shutdown flips, spawning one session task
    /// per connection on the runtime.
    pub async fn accept_loop(self, router: Arc<Router>, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tracing::debug!("accepted {peer}");
                        let stream = match self.timeout {
                            Some(window) => PlainStream::with_timeout(stream, window),
                            None => PlainStream::new(stream),
                        };
                        tokio::spawn(Session::new(stream, Arc::clone(&router)).run());
                    }
                    Err(err) => {
                        tracing::error!("accept failed: {err}");
                    }
                },
                changed = shutdown.changed() => {
                    // a dropped sender also means shutdown
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::debug!("acceptor shutting down");
                        return;
                    }
                }
            }
        }
    }
}
