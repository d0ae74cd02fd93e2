//! All in one API to run an HTTP/1.x server.
//!
//! [`Server`] owns one [`Acceptor`] per configured listener and the shared
//! [`Router`]; each accepted connection runs a [`Session`] task. The router
//! is append-only during setup and read-only once [`Server::run`] is
//! called.
mod acceptor;
mod session;
mod stream;

#[cfg(test)]
mod test;

pub use acceptor::Acceptor;
pub use session::Session;
pub use stream::{PlainStream, StreamHandler};

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use tokio::sync::watch;

use crate::router::Router;

/// Address family of a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IpVersion {
    #[default]
    V4,
    V6,
}

/// One listening endpoint.
#[derive(Debug, Clone)]
pub struct ListenerConf {
    pub addr: String,
    pub port: u16,
    pub ipv: IpVersion,
    pub backlog: u32,
    /// Read/write inactivity window per connection; `None` waits forever.
    pub timeout_ms: Option<u64>,
    /// TLS at the byte layer; requires a TLS stream handler, which the
    /// core does not ship.
    pub ssl: bool,
}

impl ListenerConf {
    /// A plaintext IPv4 listener with the default backlog and no timeout.
    pub fn new(addr: impl Into<String>, port: u16) -> ListenerConf {
        ListenerConf {
            addr: addr.into(),
            port,
            ipv: IpVersion::V4,
            backlog: 1024,
            timeout_ms: None,
            ssl: false,
        }
    }

    pub(crate) fn socket_addr(&self) -> Result<SocketAddr, ServerError> {
        let ip: IpAddr = self
            .addr
            .parse()
            .map_err(|_| ServerError::BadAddress(self.addr.clone()))?;
        match (self.ipv, ip) {
            (IpVersion::V4, IpAddr::V4(_)) | (IpVersion::V6, IpAddr::V6(_)) => {
                Ok(SocketAddr::new(ip, self.port))
            }
            _ => Err(ServerError::BadAddress(self.addr.clone())),
        }
    }
}

/// Server-wide options.
#[derive(Debug, Clone, Default)]
pub struct ServerConf {
    pub listeners: Vec<ListenerConf>,
    /// Worker threads for [`Server::run_blocking`]; `0` means one per
    /// core.
    pub threads: usize,
}

/// Server startup and shutdown error.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("no listener configured")]
    NoListeners,
    #[error("invalid listen address: {0}")]
    BadAddress(String),
    #[error("listener requests TLS but no TLS stream handler is available")]
    TlsNotSupported,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The server: a shared router plus one acceptor per listener.
#[derive(Debug)]
pub struct Server {
    router: Arc<Router>,
    conf: ServerConf,
    shutdown: watch::Sender<bool>,
}

/// A cheap handle for stopping a running server from elsewhere.
#[derive(Debug, Clone)]
pub struct ServerHandle {
    shutdown: watch::Sender<bool>,
}

impl ServerHandle {
    /// Request shutdown; acceptors stop, in-flight responses finish.
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }
}

impl Server {
    /// Create a server over a finished router.
    ///
    /// The router is immutable from here on; sessions share it read-only.
    pub fn new(router: Router, conf: ServerConf) -> Server {
        let (shutdown, _) = watch::channel(false);
        Server {
            router: Arc::new(router),
            conf,
            shutdown,
        }
    }

    /// The shared router.
    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// A handle that can stop this server.
    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            shutdown: self.shutdown.clone(),
        }
    }

    /// Request shutdown.
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Bind every configured listener and serve until [`stop`][Server::stop]
    /// is called.
    ///
    /// # Errors
    ///
    /// Returns an error when no listener is configured or any bind fails;
    /// accept failures after startup are logged, not fatal.
    pub async fn run(&self) -> Result<(), ServerError> {
        if self.conf.listeners.is_empty() {
            return Err(ServerError::NoListeners);
        }

        let mut tasks = Vec::with_capacity(self.conf.listeners.len());
        for conf in &self.conf.listeners {
            let acceptor = Acceptor::bind(conf)?;
            tasks.push(tokio::spawn(acceptor.accept_loop(
                Arc::clone(&self.router),
                self.shutdown.subscribe(),
            )));
        }

        for task in tasks {
            let _ = task.await;
        }
        Ok(())
    }

    /// Build a multi-thread runtime with the configured worker count and
    /// block on [`run`][Server::run].
    ///
    /// # Errors
    ///
    /// Returns an error when the runtime fails to build or `run` fails.
    pub fn run_blocking(&self) -> Result<(), ServerError> {
        let mut builder = tokio::runtime::Builder::new_multi_thread();
        if self.conf.threads > 0 {
            builder.worker_threads(self.conf.threads);
        }
        builder.enable_all().build()?.block_on(self.run())
    }
}
