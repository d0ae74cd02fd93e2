use super::error::{InvalidHeaderName, Severity};
use crate::h1::matches::is_tchar;

// ===== HeaderName =====

/// HTTP Header name.
///
/// Stored in canonical lowercase. Known names resolve to a fixed identifier
/// used for constant time dispatch and per-field validation rules.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct HeaderName {
    repr: Repr,
}

#[derive(Clone, PartialEq, Eq, Hash)]
enum Repr {
    Standard(Standard),
    Custom(Box<str>),
}

impl HeaderName {
    /// Create [`HeaderName`] from bytes, lowercasing as needed.
    ///
    /// # Errors
    ///
    /// Returns an error when the name is empty or contains a non-`tchar`
    /// byte.
    pub fn from_bytes(src: &[u8]) -> Result<HeaderName, InvalidHeaderName> {
        if src.is_empty() || !src.iter().all(|&byte| is_tchar(byte)) {
            return Err(InvalidHeaderName);
        }
        if let Some(standard) = Standard::lookup(src) {
            return Ok(HeaderName {
                repr: Repr::Standard(standard),
            });
        }
        // tchar is a subset of ASCII
        let mut name = src.to_vec();
        name.make_ascii_lowercase();
        let name = String::from_utf8(name).map_err(|_| InvalidHeaderName)?;
        Ok(HeaderName {
            repr: Repr::Custom(name.into_boxed_str()),
        })
    }

    /// Extracts the canonical lowercase name.
    #[inline]
    pub fn as_str(&self) -> &str {
        match &self.repr {
            Repr::Standard(standard) => standard.as_str(),
            Repr::Custom(name) => name,
        }
    }

    pub(crate) fn standard(&self) -> Option<Standard> {
        match &self.repr {
            Repr::Standard(standard) => Some(*standard),
            Repr::Custom(_) => None,
        }
    }

    pub(crate) const fn from_standard(standard: Standard) -> Self {
        HeaderName {
            repr: Repr::Standard(standard),
        }
    }
}

impl std::str::FromStr for HeaderName {
    type Err = InvalidHeaderName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bytes(s.as_bytes())
    }
}

impl std::fmt::Debug for HeaderName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        str::fmt(self.as_str(), f)
    }
}

impl std::fmt::Display for HeaderName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        str::fmt(self.as_str(), f)
    }
}

// ===== Field rules =====

/// Which message direction a field belongs to.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scope {
    Any,
    Request,
    Response,
}

/// Value validation attached to a field.
pub(crate) struct Validator {
    pub(crate) check: fn(&[u8]) -> bool,
    pub(crate) severity: Severity,
    pub(crate) message: &'static str,
}

/// Per-field handling rules, the table-driven validation source.
pub(crate) struct FieldRule {
    /// At most one value may remain after parsing.
    pub(crate) single_valued: bool,
    /// Comma separated tokens accumulate into separate values.
    pub(crate) list_valued: bool,
    pub(crate) scope: Scope,
    pub(crate) validate: Option<Validator>,
}

impl FieldRule {
    const PLAIN: FieldRule = FieldRule {
        single_valued: false,
        list_valued: false,
        scope: Scope::Any,
        validate: None,
    };

    const fn single(scope: Scope) -> FieldRule {
        FieldRule {
            single_valued: true,
            list_valued: false,
            scope,
            validate: None,
        }
    }

    const fn list(scope: Scope) -> FieldRule {
        FieldRule {
            single_valued: false,
            list_valued: true,
            scope,
            validate: None,
        }
    }
}

fn validate_content_length(value: &[u8]) -> bool {
    crate::common::atou(value).is_some()
}

// <https://www.w3.org/TR/referrer-policy/#referrer-policies>
fn validate_referrer_policy(value: &[u8]) -> bool {
    const POLICIES: [&[u8]; 8] = [
        b"no-referrer",
        b"no-referrer-when-downgrade",
        b"origin",
        b"origin-when-cross-origin",
        b"same-origin",
        b"strict-origin",
        b"strict-origin-when-cross-origin",
        b"unsafe-url",
    ];
    POLICIES.iter().any(|p| value.eq_ignore_ascii_case(p))
}

// ===== Constants =====

standard_header! {
    /// Host and optional port of the target ([RFC9110 7.2]).
    ///
    /// [RFC9110 7.2]: <https://www.rfc-editor.org/rfc/rfc9110.html#name-host-and-authority>
    pub const HOST: Host = "host" => FieldRule::single(Scope::Request);

    /// The size of the message body in bytes ([RFC9110 8.6]).
    ///
    /// [RFC9110 8.6]: <https://www.rfc-editor.org/rfc/rfc9110.html#name-content-length>
    pub const CONTENT_LENGTH: ContentLength = "content-length" => FieldRule {
        single_valued: true,
        list_valued: false,
        scope: Scope::Any,
        validate: Some(Validator {
            check: validate_content_length,
            severity: Severity::Critical,
            message: "content-length is not a non-negative integer",
        }),
    };

    /// The media type of the message body.
    pub const CONTENT_TYPE: ContentType = "content-type" => FieldRule::single(Scope::Any);

    /// Body framing codings applied to the message ([RFC9112 6.1]).
    ///
    /// [RFC9112 6.1]: <https://www.rfc-editor.org/rfc/rfc9112.html#name-transfer-encoding>
    pub const TRANSFER_ENCODING: TransferEncoding = "transfer-encoding" => FieldRule::list(Scope::Any);

    /// Content codings applied to the representation.
    pub const CONTENT_ENCODING: ContentEncoding = "content-encoding" => FieldRule::list(Scope::Any);

    /// Connection control options, e.g. `close` or `keep-alive`.
    pub const CONNECTION: Connection = "connection" => FieldRule::list(Scope::Any);

    /// Parameters for persistent connections.
    pub const KEEP_ALIVE: KeepAlive = "keep-alive" => FieldRule::PLAIN;

    /// Credentials to authenticate a user-agent with a server.
    pub const AUTHORIZATION: Authorization = "authorization" => FieldRule::single(Scope::Request);

    /// Media types acceptable for the response.
    pub const ACCEPT: Accept = "accept" => FieldRule::list(Scope::Request);

    /// Content codings acceptable for the response.
    pub const ACCEPT_ENCODING: AcceptEncoding = "accept-encoding" => FieldRule::list(Scope::Request);

    /// Natural languages preferred for the response.
    pub const ACCEPT_LANGUAGE: AcceptLanguage = "accept-language" => FieldRule::list(Scope::Request);

    /// The user agent originating the request.
    pub const USER_AGENT: UserAgent = "user-agent" => FieldRule::single(Scope::Request);

    /// The address of the resource the request target was obtained from.
    pub const REFERER: Referer = "referer" => FieldRule::single(Scope::Request);

    /// Which referrer information should be included with requests.
    pub const REFERRER_POLICY: ReferrerPolicy = "referrer-policy" => FieldRule {
        single_valued: true,
        list_valued: false,
        scope: Scope::Response,
        validate: Some(Validator {
            check: validate_referrer_policy,
            severity: Severity::Warning,
            message: "unknown referrer-policy token",
        }),
    };

    /// Stored cookies sent with the request.
    pub const COOKIE: Cookie = "cookie" => FieldRule {
        single_valued: false,
        list_valued: false,
        scope: Scope::Request,
        validate: None,
    };

    /// A cookie the server asks the user agent to store.
    ///
    /// Serialized as one line per value, never comma joined.
    pub const SET_COOKIE: SetCookie = "set-cookie" => FieldRule {
        single_valued: false,
        list_valued: false,
        scope: Scope::Response,
        validate: None,
    };

    /// Date and time at which the message was originated.
    pub const DATE: Date = "date" => FieldRule::single(Scope::Any);

    /// Information about the software handling the request.
    pub const SERVER: Server = "server" => FieldRule::single(Scope::Response);

    /// The URI a client should redirect to.
    pub const LOCATION: Location = "location" => FieldRule::single(Scope::Response);

    /// An opaque validator for the selected representation.
    pub const ETAG: Etag = "etag" => FieldRule::single(Scope::Response);

    /// Timestamp the origin believes the representation was last modified.
    pub const LAST_MODIFIED: LastModified = "last-modified" => FieldRule::single(Scope::Response);

    /// Directives for caches along the request/response chain.
    pub const CACHE_CONTROL: CacheControl = "cache-control" => FieldRule::list(Scope::Any);

    /// Request headers that determined the selected response.
    pub const VARY: Vary = "vary" => FieldRule::list(Scope::Response);

    /// The protocol the sender offers to switch to.
    pub const UPGRADE: Upgrade = "upgrade" => FieldRule::list(Scope::Any);

    /// Expectations that need to be met to handle the request.
    pub const EXPECT: Expect = "expect" => FieldRule::single(Scope::Request);

    /// Challenge applicable to the target resource.
    pub const WWW_AUTHENTICATE: WwwAuthenticate = "www-authenticate" => FieldRule::list(Scope::Response);
}

// ===== Macros =====

macro_rules! standard_header {
    (
        $(
            $(#[$doc:meta])*
            pub const $id:ident: $variant:ident = $name:literal => $rule:expr;
        )*
    ) => {
        /// Fixed identifiers for known header fields.
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub(crate) enum Standard {
            $(
                $variant,
            )*
        }

        impl Standard {
            /// Case-insensitive lookup over the closed set.
            pub(crate) fn lookup(src: &[u8]) -> Option<Standard> {
                $(
                    if src.eq_ignore_ascii_case($name.as_bytes()) {
                        return Some(Standard::$variant);
                    }
                )*
                None
            }

            /// Canonical lowercase name.
            pub(crate) const fn as_str(self) -> &'static str {
                match self {
                    $(
                        Standard::$variant => $name,
                    )*
                }
            }

            /// The handling rule for this field.
            pub(crate) const fn rule(self) -> FieldRule {
                match self {
                    $(
                        Standard::$variant => $rule,
                    )*
                }
            }
        }

        /// Provided constants for known header names.
        pub mod standard {
            $(
                $(#[$doc])*
                pub const $id: super::HeaderName =
                    super::HeaderName::from_standard(super::Standard::$variant);
            )*
        }
    };
}

use standard_header;
