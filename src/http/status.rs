use std::num::NonZeroU16;

/// HTTP [Status Code][rfc].
///
/// Any code in `100..=599` can be represented; the canonical reason phrases
/// cover the registered codes from 100 to 526.
///
/// [rfc]: <https://datatracker.ietf.org/doc/html/rfc9110#name-status-codes>
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StatusCode(NonZeroU16);

impl Default for StatusCode {
    #[inline]
    fn default() -> Self {
        Self::OK
    }
}

impl StatusCode {
    /// Create [`StatusCode`] from its numeric value.
    ///
    /// # Errors
    ///
    /// Returns an error when the value is outside `100..=599`.
    #[inline]
    pub const fn from_u16(code: u16) -> Result<StatusCode, InvalidStatusCode> {
        if code < 100 || code > 599 {
            return Err(InvalidStatusCode);
        }
        // SAFETY: value checked nonzero above
        Ok(StatusCode(unsafe { NonZeroU16::new_unchecked(code) }))
    }

    /// Returns the numeric value, e.g: `200`.
    #[inline]
    pub const fn as_u16(&self) -> u16 {
        self.0.get()
    }

    /// Returns `true` for `1xx` codes.
    #[inline]
    pub const fn is_informational(&self) -> bool {
        self.0.get() < 200
    }

    /// Returns `true` for `4xx` and `5xx` codes.
    #[inline]
    pub const fn is_error(&self) -> bool {
        self.0.get() >= 400
    }

    /// Returns `true` when a response with this code never carries a body.
    ///
    /// Covers `1xx`, `204` and `304`.
    #[inline]
    pub const fn is_bodyless(&self) -> bool {
        matches!(self.0.get(), 100..=199 | 204 | 304)
    }
}

macro_rules! canonical {
    (
        $(
            $int:literal $id:ident $msg:literal;
        )*
    ) => {
        impl StatusCode {
            $(
                #[doc = concat!("`", stringify!($int), " ", $msg, "`")]
                pub const $id: Self = Self(NonZeroU16::new($int).unwrap());
            )*

            /// Returns the canonical reason phrase for this code, if the code
            /// is registered.
            pub const fn canonical_reason(&self) -> Option<&'static str> {
                match self.0.get() {
                    $(
                        $int => Some($msg),
                    )*
                    _ => None,
                }
            }
        }
    };
}

canonical! {
    100 CONTINUE "Continue";
    101 SWITCHING_PROTOCOLS "Switching Protocols";
    102 PROCESSING "Processing";
    103 EARLY_HINTS "Early Hints";

    200 OK "OK";
    201 CREATED "Created";
    202 ACCEPTED "Accepted";
    203 NON_AUTHORITATIVE_INFORMATION "Non-Authoritative Information";
    204 NO_CONTENT "No Content";
    205 RESET_CONTENT "Reset Content";
    206 PARTIAL_CONTENT "Partial Content";
    207 MULTI_STATUS "Multi-Status";
    208 ALREADY_REPORTED "Already Reported";
    226 IM_USED "IM Used";

    300 MULTIPLE_CHOICES "Multiple Choices";
    301 MOVED_PERMANENTLY "Moved Permanently";
    302 FOUND "Found";
    303 SEE_OTHER "See Other";
    304 NOT_MODIFIED "Not Modified";
    305 USE_PROXY "Use Proxy";
    307 TEMPORARY_REDIRECT "Temporary Redirect";
    308 PERMANENT_REDIRECT "Permanent Redirect";

    400 BAD_REQUEST "Bad Request";
    401 UNAUTHORIZED "Unauthorized";
    402 PAYMENT_REQUIRED "Payment Required";
    403 FORBIDDEN "Forbidden";
    404 NOT_FOUND "Not Found";
    405 METHOD_NOT_ALLOWED "Method Not Allowed";
    406 NOT_ACCEPTABLE "Not Acceptable";
    407 PROXY_AUTHENTICATION_REQUIRED "Proxy Authentication Required";
    408 REQUEST_TIMEOUT "Request Timeout";
    409 CONFLICT "Conflict";
    410 GONE "Gone";
    411 LENGTH_REQUIRED "Length Required";
    412 PRECONDITION_FAILED "Precondition Failed";
    413 PAYLOAD_TOO_LARGE "Payload Too Large";
    414 URI_TOO_LONG "URI Too Long";
    415 UNSUPPORTED_MEDIA_TYPE "Unsupported Media Type";
    416 RANGE_NOT_SATISFIABLE "Range Not Satisfiable";
    417 EXPECTATION_FAILED "Expectation Failed";
    418 IM_A_TEAPOT "I'm a teapot";
    421 MISDIRECTED_REQUEST "Misdirected Request";
    422 UNPROCESSABLE_ENTITY "Unprocessable Entity";
    423 LOCKED "Locked";
    424 FAILED_DEPENDENCY "Failed Dependency";
    425 TOO_EARLY "Too Early";
    426 UPGRADE_REQUIRED "Upgrade Required";
    428 PRECONDITION_REQUIRED "Precondition Required";
    429 TOO_MANY_REQUESTS "Too Many Requests";
    431 REQUEST_HEADER_FIELDS_TOO_LARGE "Request Header Fields Too Large";
    451 UNAVAILABLE_FOR_LEGAL_REASONS "Unavailable For Legal Reasons";

    500 INTERNAL_SERVER_ERROR "Internal Server Error";
    501 NOT_IMPLEMENTED "Not Implemented";
    502 BAD_GATEWAY "Bad Gateway";
    503 SERVICE_UNAVAILABLE "Service Unavailable";
    504 GATEWAY_TIMEOUT "Gateway Timeout";
    505 HTTP_VERSION_NOT_SUPPORTED "HTTP Version Not Supported";
    506 VARIANT_ALSO_NEGOTIATES "Variant Also Negotiates";
    507 INSUFFICIENT_STORAGE "Insufficient Storage";
    508 LOOP_DETECTED "Loop Detected";
    510 NOT_EXTENDED "Not Extended";
    511 NETWORK_AUTHENTICATION_REQUIRED "Network Authentication Required";
    520 WEB_SERVER_RETURNED_UNKNOWN_ERROR "Web Server Returned an Unknown Error";
    521 WEB_SERVER_IS_DOWN "Web Server Is Down";
    522 CONNECTION_TIMED_OUT "Connection Timed Out";
    523 ORIGIN_IS_UNREACHABLE "Origin Is Unreachable";
    524 TIMEOUT_OCCURRED "A Timeout Occurred";
    525 SSL_HANDSHAKE_FAILED "SSL Handshake Failed";
    526 INVALID_SSL_CERTIFICATE "Invalid SSL Certificate";
}

impl std::fmt::Debug for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.canonical_reason() {
            Some(reason) => write!(f, "{} {}", self.0.get(), reason),
            None => write!(f, "{}", self.0.get()),
        }
    }
}

impl std::fmt::Display for StatusCode {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0.get(), f)
    }
}

// ===== Error =====

/// Status code value outside `100..=599`.
#[derive(Debug, thiserror::Error)]
#[error("invalid status code")]
pub struct InvalidStatusCode;
