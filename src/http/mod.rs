//! HTTP Semantics ([RFC9110]).
//!
//! [RFC9110]: <https://www.rfc-editor.org/rfc/rfc9110.html>
mod method;
mod status;
mod version;

pub use method::{InvalidMethod, Method, MethodSet};
pub use status::{InvalidStatusCode, StatusCode};
pub use version::Version;
