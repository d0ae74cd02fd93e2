//! Path radix routing and phased middleware.
//!
//! The router is append-only during setup and read-only during service:
//! sessions share it behind an [`Arc`][std::sync::Arc] once the server
//! runs.
mod node;
mod pattern;
mod route;
mod middleware;

pub mod error;

pub use error::RouteError;
pub use middleware::{MiddlewareChain, Phase};
pub use route::{Handler, HandlerFuture, Route};

#[cfg(test)]
mod test;

use node::Node;
use pattern::Segment;

use crate::http::{MethodSet, StatusCode};
use crate::request::{Params, Request};
use crate::response::Response;

/// A stable handle to a registered route, valid for the lifetime of its
/// router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteId(usize);

/// The result of matching a request against the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Path and method both admit the request; parameters are bound.
    Found(RouteId),
    /// Path matched but the route's method set does not admit the request;
    /// the session answers `405`.
    MethodNotAllowed,
    /// No path match; the session answers `404`.
    NotFound,
}

/// Radix tree router with per-route and global middleware chains.
///
/// The tree partitions edges into literals, parameters with compiled regex
/// constraints, and wildcards. Matching is a depth-first search with
/// backtracking: literals first, then parameter edges in registration
/// order, then the wildcard. The method check runs only after a path
/// match succeeds.
pub struct Router {
    root: Node,
    routes: Vec<Route>,
    middleware: MiddlewareChain,
    constraints: Vec<(Box<str>, Box<str>)>,
    error_handlers: Vec<(StatusCode, Box<dyn Handler>)>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .field("middleware", &self.middleware)
            .field("error_handlers", &self.error_handlers.len())
            .finish_non_exhaustive()
    }
}

impl Router {
    /// Create new empty [`Router`].
    pub fn new() -> Router {
        Router {
            root: Node::default(),
            routes: Vec::new(),
            middleware: MiddlewareChain::new(),
            constraints: Vec::new(),
            error_handlers: Vec::new(),
        }
    }

    /// Register a named constraint, selected by parameter name for `{name}`
    /// segments registered after this call.
    ///
    /// An inline `{name:regex}` constraint takes precedence.
    ///
    /// # Errors
    ///
    /// Returns an error when the regex fails to compile.
    pub fn add_constraint(&mut self, name: &str, pattern: &str) -> Result<(), RouteError> {
        // compile once to validate, the tree compiles its own anchored copy
        regex::Regex::new(pattern)?;
        self.constraints
            .push((Box::from(name), Box::from(pattern)));
        Ok(())
    }

    /// Register a handler for a method set and path pattern.
    ///
    /// Pattern syntax: `/lit/{name}/{name:regex}/*`, where `\*` escapes a
    /// literal asterisk segment. A trailing `/` registers a distinct route.
    ///
    /// Returns the route handle for attaching per-route middleware.
    ///
    /// # Errors
    ///
    /// Returns an error on a malformed pattern, a conflicting registration,
    /// or a constraint that fails to compile.
    pub fn route(
        &mut self,
        methods: impl Into<MethodSet>,
        pattern: &str,
        handler: impl Handler + 'static,
    ) -> Result<&mut Route, RouteError> {
        let parsed = pattern::parse(pattern)?;

        // named constraints keyed by parameter name fill in where no
        // inline constraint was given
        let segments: Vec<Segment> = parsed
            .segments
            .into_iter()
            .map(|segment| match segment {
                Segment::Param { name, pattern: None } => {
                    let named = self
                        .constraints
                        .iter()
                        .find(|(key, _)| *key == name)
                        .map(|(_, pattern)| pattern.clone());
                    Segment::Param {
                        name,
                        pattern: named,
                    }
                }
                other => other,
            })
            .collect();

        let param_names = segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Param { name, .. } => Some(name.clone()),
                Segment::Wildcard => Some(Box::from("*")),
                Segment::Literal(_) => None,
            })
            .collect();

        let id = RouteId(self.routes.len());
        self.root
            .insert(&segments, parsed.trailing_slash, id, pattern)?;

        self.routes.push(Route {
            methods: methods.into(),
            pattern: Box::from(pattern),
            param_names,
            middleware: MiddlewareChain::new(),
            handler: Box::new(handler),
        });
        Ok(self.routes.last_mut().expect("just pushed"))
    }

    /// Attach a global middleware function; it runs before every route
    /// chain within its phase.
    pub fn add(
        &mut self,
        phase: Phase,
        middleware: impl Fn(&mut Request, &mut Response) -> bool + Send + Sync + 'static,
    ) {
        self.middleware.add(phase, middleware);
    }

    /// Register a handler invoked for responses with the given error
    /// status when no route handler produced a body.
    pub fn error_handler(&mut self, status: StatusCode, handler: impl Handler + 'static) {
        self.error_handlers.push((status, Box::new(handler)));
    }

    /// Match a request's path, then its method.
    ///
    /// On [`MatchOutcome::Found`] the route's parameters are bound into the
    /// request.
    pub fn match_request(&self, req: &mut Request) -> MatchOutcome {
        let mut params = Params::default();

        let outcome = {
            let path = req.uri().path();
            let trailing = path.len() > 1 && path.ends_with('/');
            let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

            match self.root.find(&segments, trailing, &mut params) {
                Some(id) => {
                    if self.routes[id.0].methods.allows(req.method()) {
                        MatchOutcome::Found(id)
                    } else {
                        MatchOutcome::MethodNotAllowed
                    }
                }
                None => MatchOutcome::NotFound,
            }
        };

        if let MatchOutcome::Found(_) = outcome {
            *req.params_mut() = params;
        }
        outcome
    }

    /// The route behind a handle.
    #[inline]
    pub fn at(&self, id: RouteId) -> &Route {
        &self.routes[id.0]
    }

    /// Mutable access to a registered route, for setup-time middleware
    /// attachment.
    #[inline]
    pub fn at_mut(&mut self, id: RouteId) -> &mut Route {
        &mut self.routes[id.0]
    }

    /// Run one middleware phase: the global chain, then the route chain.
    ///
    /// Returns `false` as soon as any function halts the chain.
    pub fn run_phase(
        &self,
        route: Option<RouteId>,
        phase: Phase,
        req: &mut Request,
        res: &mut Response,
    ) -> bool {
        if !self.middleware.execute(phase, req, res) {
            return false;
        }
        match route {
            Some(id) => self.routes[id.0].middleware().execute(phase, req, res),
            None => true,
        }
    }

    /// The registered error handler for a status, if any.
    pub(crate) fn find_error_handler(&self, status: StatusCode) -> Option<&dyn Handler> {
        self.error_handlers
            .iter()
            .find(|(key, _)| *key == status)
            .map(|(_, handler)| handler.as_ref())
    }

    /// Render the radix tree for diagnostics.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.root.dump(&mut out, "");
        out
    }
}

impl Default for Router {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
