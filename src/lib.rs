//! # HTTP/1.x Server and Client Core
//!
//! This library provide the wire protocol engine for HTTP/1.0 and HTTP/1.1: a
//! streaming, incremental parser and serializer, a per-connection session
//! state machine, a phased middleware pipeline, and a path-radix router.
//!
//! # Library Design
//!
//! Each component can be used as a building block for writing a server, and
//! the [`server`] module combine all of them into a ready to use API.
//!
//! ## Definitions
//!
//! - [`uri`] request target, origin-form ([RFC3986])
//! - [`headers`] HTTP Header Fields ([RFC9110 Section 5])
//! - [`http`] HTTP Semantics ([RFC9110])
//!
//! ## Behaviors
//!
//! - [`h1`] HTTP/1.x wire protocol ([RFC9112])
//!
//! ## User Abstraction
//!
//! - [`router`] radix routing and middleware phases
//!
//! ## Integrations
//!
//! - [`server`] acceptor, session loop, stream handlers
//! - [`client`] the same engine in the client direction
//!
//! The parser and serializer are fully synchronous and never suspend; only
//! the session suspends, at stream reads, stream writes, and handler await
//! points. This keeps the state machines deterministic and testable without
//! any runtime.
//!
//! [RFC3986]: <https://www.rfc-editor.org/rfc/rfc3986.html>
//! [RFC9110]: <https://www.rfc-editor.org/rfc/rfc9110.html>
//! [RFC9110 Section 5]: <https://www.rfc-editor.org/rfc/rfc9110.html#name-fields>
//! [RFC9112]: <https://www.rfc-editor.org/rfc/rfc9112.html>
#![warn(missing_debug_implementations)]

mod common;

// definitions
pub mod uri;
pub mod headers;
pub mod http;

mod request;
mod response;

// HTTP protocol
pub mod h1;

// user abstraction
pub mod router;

// integration
pub mod server;
pub mod client;

pub use http::{Method, StatusCode, Version};
pub use request::{Params, Policy, Request};
pub use response::{Body, Response};
pub use router::{MatchOutcome, Phase, Router};
pub use server::{ListenerConf, Server, ServerConf};
