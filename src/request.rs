use bytes::BytesMut;

use crate::headers::HeaderMap;
use crate::http::{Method, Version};
use crate::uri::Uri;

/// Per-request parsing limits.
///
/// Enforced byte-for-byte during parse, not only at state boundaries. The
/// defaults apply per route unless adjusted by `Metadata` phase middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    /// Longest admitted method token, in bytes.
    pub max_method_token_size: usize,
    /// Longest admitted request target, in bytes.
    pub max_uri_size: usize,
    /// Largest admitted header section: names, values and their CRLFs.
    pub max_header_size: usize,
    /// Largest admitted message body.
    pub max_body_size: u64,
}

impl Policy {
    pub const DEFAULT: Policy = Policy {
        max_method_token_size: 255,
        max_uri_size: 64 * 1024,
        max_header_size: 256 * 1024,
        max_body_size: 8 * 1024 * 1024,
    };
}

impl Default for Policy {
    #[inline]
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Parameters bound by the router on a successful match.
#[derive(Debug, Clone, Default)]
pub struct Params {
    entries: Vec<(Box<str>, String)>,
}

impl Params {
    /// Returns the value bound under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key.as_ref() == name)
            .map(|(_, value)| value.as_str())
    }

    /// Returns the number of bound parameters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no parameter is bound.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns an iterator over `(name, value)` bindings.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_ref(), value.as_str()))
    }

    pub(crate) fn bind(&mut self, name: &str, value: String) {
        self.entries.push((Box::from(name), value));
    }

    /// Roll back to a prior binding count, for backtracking.
    pub(crate) fn rollback(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

/// An HTTP request.
///
/// Built incrementally by the parser: `method`, `uri` and `version` are
/// immutable once the metadata milestone is reached, `headers` once the
/// headers milestone is reached. `params` is populated by the router on
/// match.
#[derive(Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    body: BytesMut,
    params: Params,
    policy: Policy,
}

impl Request {
    /// Create new empty [`Request`].
    pub fn new() -> Request {
        Request {
            method: Method::GET,
            uri: Uri::default(),
            version: Version::HTTP_11,
            headers: HeaderMap::for_request(),
            body: BytesMut::new(),
            params: Params::default(),
            policy: Policy::DEFAULT,
        }
    }

    /// Build a client-direction request for the given origin-form target.
    ///
    /// # Errors
    ///
    /// Returns an error when the target is not a valid origin-form URI.
    pub fn build(method: Method, target: &str) -> Result<Request, crate::uri::UriError> {
        let uri = Uri::parse_origin(target.as_bytes())?;
        let mut req = Request::new();
        req.set_metadata(method, uri, Version::HTTP_11);
        Ok(req)
    }

    /// Replace the request body, for client-direction requests.
    pub fn set_body(&mut self, body: &[u8]) {
        self.body.clear();
        self.body.extend_from_slice(body);
    }

    #[inline]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[inline]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }

    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable headers access, intended for `Header` phase middleware.
    #[inline]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// The body received so far; complete once the parser finishes.
    #[inline]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Parameters bound by the router.
    #[inline]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The limits in effect for this request.
    #[inline]
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Adjust limits, intended for `Metadata` phase middleware before body
    /// parsing begins.
    #[inline]
    pub fn policy_mut(&mut self) -> &mut Policy {
        &mut self.policy
    }

    /// Reset in place, keeping allocations, to a state equivalent to a
    /// freshly constructed request.
    pub fn clear(&mut self) {
        self.method = Method::GET;
        self.uri.clear();
        self.version = Version::HTTP_11;
        self.headers.clear();
        self.body.clear();
        self.params.clear();
        self.policy = Policy::DEFAULT;
    }

    // ===== Parser and router entry points =====

    pub(crate) fn set_metadata(&mut self, method: Method, uri: Uri, version: Version) {
        self.method = method;
        self.uri = uri;
        self.version = version;
    }

    pub(crate) fn add_header(
        &mut self,
        name: crate::headers::HeaderName,
        value: crate::headers::HeaderValue,
    ) -> Result<(), crate::headers::HeaderError> {
        self.headers.add(name, value)
    }

    pub(crate) fn extend_body(&mut self, chunk: &[u8]) {
        self.body.extend_from_slice(chunk);
    }

    pub(crate) fn params_mut(&mut self) -> &mut Params {
        &mut self.params
    }

    pub(crate) fn is_cleared(&self) -> bool {
        self.method == Method::GET
            && self.uri.is_cleared()
            && self.headers.is_empty()
            && self.body.is_empty()
            && self.params.is_empty()
            && self.policy == Policy::DEFAULT
    }
}

impl Default for Request {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
