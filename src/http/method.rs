use crate::h1::matches::is_tchar;

/// HTTP Method.
///
/// This API follows the [RFC9110] methods and the PATCH method from
/// [RFC5789]. Any other `tchar`-only token is kept as an extension method.
///
/// [RFC5789]: <https://www.rfc-editor.org/rfc/rfc5789>
/// [RFC9110]: <https://www.rfc-editor.org/rfc/rfc9110.html#name-methods>
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Method(Repr);

#[derive(Clone, PartialEq, Eq, Hash)]
enum Repr {
    Standard(u8),
    Extension(Box<str>),
}

struct Props {
    value: &'static [u8],
    safe: bool,
}

props! {
    static PROPS: [9];

    /// The [GET] method requests transfer of a current selected representation
    /// for the target resource.
    ///
    /// [GET]: <https://www.rfc-editor.org/rfc/rfc9110.html#name-get>
    pub const GET = (0, b"GET", safe);
    /// The [HEAD] method is identical to GET except that the server MUST NOT
    /// send content in the response.
    ///
    /// [HEAD]: <https://www.rfc-editor.org/rfc/rfc9110.html#name-head>
    pub const HEAD = (1, b"HEAD", safe);
    /// The [POST] method requests that the target resource process the
    /// representation enclosed in the request.
    ///
    /// [POST]: <https://www.rfc-editor.org/rfc/rfc9110.html#name-post>
    pub const POST = (2, b"POST", );
    /// The [PUT] method requests that the state of the target resource be
    /// created or replaced with the enclosed representation.
    ///
    /// [PUT]: <https://www.rfc-editor.org/rfc/rfc9110.html#name-put>
    pub const PUT = (3, b"PUT", );
    /// The [DELETE] method requests that the origin server remove the
    /// association between the target resource and its functionality.
    ///
    /// [DELETE]: <https://www.rfc-editor.org/rfc/rfc9110.html#name-delete>
    pub const DELETE = (4, b"DELETE", );
    /// The [CONNECT] method requests that the recipient establish a tunnel to
    /// the destination origin server.
    ///
    /// [CONNECT]: <https://www.rfc-editor.org/rfc/rfc9110.html#name-connect>
    pub const CONNECT = (5, b"CONNECT", );
    /// The [OPTIONS] method requests information about the communication
    /// options available for the target resource.
    ///
    /// [OPTIONS]: <https://www.rfc-editor.org/rfc/rfc9110.html#name-options>
    pub const OPTIONS = (6, b"OPTIONS", safe);
    /// The [TRACE] method requests a remote, application-level loop-back of
    /// the request message.
    ///
    /// [TRACE]: <https://www.rfc-editor.org/rfc/rfc9110.html#name-trace>
    pub const TRACE = (7, b"TRACE", safe);
    /// The [PATCH] method requests that a set of changes described in the
    /// request entity be applied to the identified resource.
    ///
    /// [PATCH]: <https://www.rfc-editor.org/rfc/rfc5789#section-2>
    pub const PATCH = (8, b"PATCH", );
}

impl Method {
    /// Create [`Method`] from a `tchar`-only token.
    ///
    /// # Errors
    ///
    /// Returns an error when the token is empty or contains a byte outside
    /// the `tchar` set.
    pub fn from_token(src: &[u8]) -> Result<Method, InvalidMethod> {
        if src.is_empty() {
            return Err(InvalidMethod);
        }
        if let Some(standard) = Self::from_standard(src) {
            return Ok(standard);
        }
        if !src.iter().all(|&byte| is_tchar(byte)) {
            return Err(InvalidMethod);
        }
        // tchar is a subset of ASCII
        let token = str::from_utf8(src).map_err(|_| InvalidMethod)?;
        Ok(Method(Repr::Extension(Box::from(token))))
    }

    /// Returns `true` if the method never frames a body unless a framing
    /// header says otherwise.
    ///
    /// Covers GET, HEAD, OPTIONS and TRACE.
    #[inline]
    pub fn is_bodyless(&self) -> bool {
        self == &Method::GET
            || self == &Method::HEAD
            || self == &Method::OPTIONS
            || self == &Method::TRACE
    }

    /// Returns `true` if method is considered ["safe"].
    ///
    /// ["safe"]: <https://www.rfc-editor.org/rfc/rfc9110.html#name-safe-methods>
    #[inline]
    pub fn is_safe(&self) -> bool {
        match &self.0 {
            Repr::Standard(idx) => PROPS[*idx as usize].safe,
            Repr::Extension(_) => false,
        }
    }

    /// Returns string representation of the method.
    #[inline]
    pub fn as_str(&self) -> &str {
        match &self.0 {
            // SAFETY: PROPS values are ASCII literals
            Repr::Standard(idx) => unsafe {
                str::from_utf8_unchecked(PROPS[*idx as usize].value)
            },
            Repr::Extension(token) => token,
        }
    }
}

impl Default for Method {
    #[inline]
    fn default() -> Self {
        Method::GET
    }
}

impl std::str::FromStr for Method {
    type Err = InvalidMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_token(s.as_bytes())
    }
}

impl std::fmt::Debug for Method {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        str::fmt(self.as_str(), f)
    }
}

impl std::fmt::Display for Method {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        str::fmt(self.as_str(), f)
    }
}

// ===== MethodSet =====

/// The methods a route admits.
#[derive(Debug, Default)]
pub enum MethodSet {
    /// Any method is admitted.
    #[default]
    Any,
    /// Only the listed methods are admitted.
    List(Vec<Method>),
}

impl MethodSet {
    /// Returns `true` when `method` is admitted by this set.
    pub fn allows(&self, method: &Method) -> bool {
        match self {
            MethodSet::Any => true,
            MethodSet::List(methods) => methods.contains(method),
        }
    }
}

impl From<Method> for MethodSet {
    fn from(method: Method) -> Self {
        MethodSet::List(vec![method])
    }
}

impl<const N: usize> From<[Method; N]> for MethodSet {
    fn from(methods: [Method; N]) -> Self {
        MethodSet::List(methods.into())
    }
}

// ===== Error =====

/// Method token is empty or contains a non-`tchar` byte.
#[derive(Debug, thiserror::Error)]
#[error("invalid method token")]
pub struct InvalidMethod;

// ===== Macros =====

macro_rules! props {
    (
        static $props:ident: [$len:literal];
        $(
           $(#[$doc:meta])*
           pub const $name:ident = ($idx:literal, $val:literal, $($safe:ident)?);
        )*
    ) => {
        impl Method {
            $(
               $(#[$doc])*
               pub const $name: Self = Self(Repr::Standard($idx));
            )*

            /// Lookup for the closed standard set.
            #[inline]
            const fn from_standard(src: &[u8]) -> Option<Method> {
                match src {
                    $(
                        $val => Some(Self::$name),
                    )*
                    _ => None,
                }
            }
        }

        static $props: [Props; $len] = [
            $(
                Props { value: $val, safe: prop!($($safe)?) },
            )*
        ];
    };
}

macro_rules! prop {
    (safe) => { true };
    () => { false };
}

use {prop, props};
