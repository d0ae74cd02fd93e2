/// Route registration error.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    /// Pattern does not start with `/`.
    #[error("path pattern must start with '/'")]
    NotAbsolute,
    /// `{` without a matching `}` in a segment.
    #[error("unbalanced brace in path pattern")]
    UnbalancedBrace,
    /// `{}` or `{:re}` segment.
    #[error("empty parameter name in path pattern")]
    EmptyParamName,
    /// `{name:}` segment.
    #[error("empty constraint in path pattern")]
    EmptyConstraint,
    /// `*` not in the last segment.
    #[error("wildcard must be the last segment")]
    WildcardNotLast,
    /// The constraint regex failed to compile.
    #[error("invalid constraint regex: {0}")]
    BadConstraint(#[from] regex::Error),
    /// A route with the same pattern and trailing-slash discipline exists.
    #[error("conflicting route registration for {0}")]
    Conflict(Box<str>),
    /// Two parameter edges with the same name but different constraints
    /// cannot merge.
    #[error("conflicting constraints for parameter {0}")]
    ConstraintMismatch(Box<str>),
}
