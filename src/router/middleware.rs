use crate::request::Request;
use crate::response::Response;

/// The four middleware phases.
///
/// Within a phase the global chain runs before the route chain. A function
/// returning `false` halts the chain; the session then answers with the
/// status the middleware set, or `400 Bad Request`, and runs no further
/// phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Once after the request line is parsed, before header parsing begins.
    /// Intended for per-route limit adjustment based on the URI alone.
    Metadata,
    /// Once after the header section is parsed.
    Header,
    /// At each chunked body boundary, or once after a content-length body
    /// is fully buffered.
    Body,
    /// Exactly once after the handler returns, before the first response
    /// byte is serialized.
    Response,
}

impl Phase {
    const COUNT: usize = 4;

    const fn index(self) -> usize {
        match self {
            Phase::Metadata => 0,
            Phase::Header => 1,
            Phase::Body => 2,
            Phase::Response => 3,
        }
    }
}

type MiddlewareFn = Box<dyn Fn(&mut Request, &mut Response) -> bool + Send + Sync>;

/// An ordered sequence of functions per phase.
#[derive(Default)]
pub struct MiddlewareChain {
    phases: [Vec<MiddlewareFn>; Phase::COUNT],
}

impl MiddlewareChain {
    pub fn new() -> MiddlewareChain {
        MiddlewareChain::default()
    }

    /// Append a function to a phase.
    pub fn add(
        &mut self,
        phase: Phase,
        middleware: impl Fn(&mut Request, &mut Response) -> bool + Send + Sync + 'static,
    ) {
        self.phases[phase.index()].push(Box::new(middleware));
    }

    /// Run a phase in order. Returns `false` as soon as a function halts
    /// the chain.
    pub fn execute(&self, phase: Phase, req: &mut Request, res: &mut Response) -> bool {
        self.phases[phase.index()]
            .iter()
            .all(|middleware| middleware(req, res))
    }

    /// Returns `true` when the phase holds no function.
    pub fn is_empty(&self, phase: Phase) -> bool {
        self.phases[phase.index()].is_empty()
    }
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("metadata", &self.phases[0].len())
            .field("header", &self.phases[1].len())
            .field("body", &self.phases[2].len())
            .field("response", &self.phases[3].len())
            .finish()
    }
}
