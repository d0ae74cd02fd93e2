use std::future::Future;
use std::pin::Pin;

use super::middleware::{MiddlewareChain, Phase};
use crate::http::MethodSet;
use crate::request::Request;
use crate::response::Response;

/// The boxed future a handler returns, borrowing the request/response pair
/// for the duration of the call.
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Application logic dispatched by the router.
///
/// The request and response are owned by the session; the handler borrows
/// them for the call. State a handler needs across the await must be owned
/// by the returned future, e.g. through an `Arc` clone.
///
/// Plain functions with the matching signature implement this trait:
///
/// ```rust
/// use velo::router::HandlerFuture;
/// use velo::{Request, Response};
///
/// fn hello<'a>(_req: &'a mut Request, res: &'a mut Response) -> HandlerFuture<'a> {
///     Box::pin(async move {
///         res.set_status(velo::StatusCode::OK);
///         res.set_body(&b"hi"[..]);
///     })
/// }
/// ```
pub trait Handler: Send + Sync {
    fn call<'a>(&self, req: &'a mut Request, res: &'a mut Response) -> HandlerFuture<'a>;
}

impl<F> Handler for F
where
    F: for<'a> Fn(&'a mut Request, &'a mut Response) -> HandlerFuture<'a> + Send + Sync,
{
    fn call<'a>(&self, req: &'a mut Request, res: &'a mut Response) -> HandlerFuture<'a> {
        self(req, res)
    }
}

/// A registered route: allowed methods, parsed pattern, its middleware
/// chain and the handler.
///
/// Routes are owned by their router and live for the router's lifetime;
/// sessions refer to them by [`RouteId`][super::RouteId].
pub struct Route {
    pub(crate) methods: MethodSet,
    pub(crate) pattern: Box<str>,
    pub(crate) param_names: Vec<Box<str>>,
    pub(crate) middleware: MiddlewareChain,
    pub(crate) handler: Box<dyn Handler>,
}

impl Route {
    /// The pattern this route was registered with.
    #[inline]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The methods this route admits.
    #[inline]
    pub fn methods(&self) -> &MethodSet {
        &self.methods
    }

    /// Parameter names in pattern order.
    #[inline]
    pub fn param_names(&self) -> &[Box<str>] {
        &self.param_names
    }

    /// Attach a middleware function to a phase of this route.
    pub fn add(
        &mut self,
        phase: Phase,
        middleware: impl Fn(&mut Request, &mut Response) -> bool + Send + Sync + 'static,
    ) -> &mut Route {
        self.middleware.add(phase, middleware);
        self
    }

    pub(crate) fn middleware(&self) -> &MiddlewareChain {
        &self.middleware
    }

    pub(crate) fn handler(&self) -> &dyn Handler {
        self.handler.as_ref()
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("methods", &self.methods)
            .field("pattern", &self.pattern)
            .field("param_names", &self.param_names)
            .field("middleware", &self.middleware)
            .finish_non_exhaustive()
    }
}
