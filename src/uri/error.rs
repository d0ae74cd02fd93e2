/// Request target parsing error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum UriError {
    /// Target does not start with `/`.
    #[error("request target is not origin-form")]
    NotOriginForm,
    /// Invalid character in the path component.
    #[error("invalid character in path")]
    InvalidPath,
    /// Invalid character in the query component.
    #[error("invalid character in query")]
    InvalidQuery,
    /// Fragments are rejected in server request targets.
    #[error("fragment in request target")]
    Fragment,
}
