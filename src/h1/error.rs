use crate::http::StatusCode;

/// The closed set of parser failure kinds.
///
/// The mapping from kind to expected HTTP status is fixed, see
/// [`ParseError::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    /// Method token is empty, too long, or contains a non-`tchar` byte.
    #[error("invalid method token")]
    MethodToken,
    /// Request target is malformed or uses an unsupported form.
    #[error("invalid request target")]
    UriSyntax,
    /// Request target exceeds the URI size limit.
    #[error("request target too long")]
    UriTooLong,
    /// Version literal is malformed or names an unsupported version.
    #[error("invalid or unsupported HTTP version")]
    VersionSyntax,
    /// Header field name contains a non-`tchar` byte.
    #[error("invalid header name")]
    HeaderName,
    /// Header field value contains a forbidden byte, or a single-valued
    /// field was repeated.
    #[error("invalid header value")]
    HeaderValue,
    /// A bare CR, or a CR not followed by LF, inside the header section.
    #[error("malformed header line ending")]
    HeaderCrLf,
    /// Header section exceeds the header size limit.
    #[error("header section too large")]
    HeadersTooLarge,
    /// Conflicting body framing, e.g. chunked together with content-length.
    #[error("conflicting message framing")]
    Framing,
    /// Chunk size line is malformed or overflows.
    #[error("invalid chunk size")]
    ChunkSize,
    /// Declared or accumulated body exceeds the body size limit.
    #[error("message body too large")]
    BodyTooLarge,
    /// Method requires body framing but no framing header is present.
    #[error("missing content length")]
    LengthRequired,
    /// A message that must not carry a body declares one.
    #[error("message must not carry a body")]
    PayloadNoBodyAllowed,
    /// `Transfer-Encoding` with any coding other than a single `chunked`.
    #[error("unsupported transfer encoding")]
    TransferEncodingUnsupported,
}

impl ParseErrorKind {
    /// The expected HTTP status for this failure kind.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MethodToken => StatusCode::BAD_REQUEST,
            Self::UriSyntax => StatusCode::BAD_REQUEST,
            Self::UriTooLong => StatusCode::URI_TOO_LONG,
            Self::VersionSyntax => StatusCode::BAD_REQUEST,
            Self::HeaderName => StatusCode::BAD_REQUEST,
            Self::HeaderValue => StatusCode::BAD_REQUEST,
            Self::HeaderCrLf => StatusCode::BAD_REQUEST,
            Self::HeadersTooLarge => StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE,
            Self::Framing => StatusCode::BAD_REQUEST,
            Self::ChunkSize => StatusCode::BAD_REQUEST,
            Self::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::LengthRequired => StatusCode::LENGTH_REQUIRED,
            Self::PayloadNoBodyAllowed => StatusCode::BAD_REQUEST,
            Self::TransferEncodingUnsupported => StatusCode::BAD_REQUEST,
        }
    }
}

/// HTTP parsing error.
///
/// Carries the failure [kind][ParseErrorKind] and a human readable message.
/// Any parse error is critical: the parser transitions to its failed state
/// and the connection must close once the error response is flushed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ParseError {
    kind: ParseErrorKind,
    message: &'static str,
}

impl ParseError {
    pub(crate) const fn new(kind: ParseErrorKind, message: &'static str) -> Self {
        Self { kind, message }
    }

    /// The failure kind.
    #[inline]
    pub const fn kind(&self) -> ParseErrorKind {
        self.kind
    }

    /// The expected HTTP status for this error.
    #[inline]
    pub const fn status(&self) -> StatusCode {
        self.kind.status()
    }

    /// The human readable message.
    #[inline]
    pub const fn message(&self) -> &'static str {
        self.message
    }
}

impl From<ParseErrorKind> for ParseError {
    fn from(kind: ParseErrorKind) -> Self {
        let message = match kind {
            ParseErrorKind::MethodToken => "invalid method token",
            ParseErrorKind::UriSyntax => "invalid request target",
            ParseErrorKind::UriTooLong => "request target too long",
            ParseErrorKind::VersionSyntax => "invalid or unsupported HTTP version",
            ParseErrorKind::HeaderName => "invalid header name",
            ParseErrorKind::HeaderValue => "invalid header value",
            ParseErrorKind::HeaderCrLf => "malformed header line ending",
            ParseErrorKind::HeadersTooLarge => "header section too large",
            ParseErrorKind::Framing => "conflicting message framing",
            ParseErrorKind::ChunkSize => "invalid chunk size",
            ParseErrorKind::BodyTooLarge => "message body too large",
            ParseErrorKind::LengthRequired => "missing content length",
            ParseErrorKind::PayloadNoBodyAllowed => "message must not carry a body",
            ParseErrorKind::TransferEncodingUnsupported => "unsupported transfer encoding",
        };
        Self { kind, message }
    }
}
