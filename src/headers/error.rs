//! Header validation errors.

/// How severe a header validation failure is.
///
/// A session must treat any [`Critical`][Severity::Critical] as
/// `400 Bad Request`; a [`Warning`][Severity::Warning] leaves the message
/// usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Critical,
}

/// A failed header add.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct HeaderError {
    pub(crate) severity: Severity,
    pub(crate) message: &'static str,
    /// Set when the failure is a body framing conflict, e.g. a second
    /// differing `Content-Length`.
    pub(crate) framing: bool,
}

impl HeaderError {
    pub(crate) const fn warn(message: &'static str) -> Self {
        Self {
            severity: Severity::Warning,
            message,
            framing: false,
        }
    }

    pub(crate) const fn crit(message: &'static str) -> Self {
        Self {
            severity: Severity::Critical,
            message,
            framing: false,
        }
    }

    pub(crate) const fn framing(message: &'static str) -> Self {
        Self {
            severity: Severity::Critical,
            message,
            framing: true,
        }
    }

    /// The failure severity.
    #[inline]
    pub const fn severity(&self) -> Severity {
        self.severity
    }

    /// The human readable message.
    #[inline]
    pub const fn message(&self) -> &'static str {
        self.message
    }

    /// Returns `true` when the failure is a body framing conflict.
    #[inline]
    pub const fn is_framing(&self) -> bool {
        self.framing
    }
}

/// Header name is empty or contains a non-`tchar` byte.
#[derive(Debug, thiserror::Error)]
#[error("invalid header name")]
pub struct InvalidHeaderName;

/// Header value contains a byte outside `VCHAR / obs-text / SP / HTAB`.
#[derive(Debug, thiserror::Error)]
#[error("invalid header value")]
pub struct InvalidHeaderValue;
