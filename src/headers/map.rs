use bytes::{BufMut, Bytes, BytesMut};

use super::error::{HeaderError, Severity};
use super::name::{HeaderName, Scope, Standard};
use super::value::HeaderValue;
use crate::common::{atou, trim_ows};

use sealed::Sealed;

/// Which message direction a map validates against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageKind {
    #[default]
    Plain,
    Request,
    Response,
}

/// HTTP Headers Multimap.
///
/// Two partitions back the map: known fields keyed by their fixed
/// identifier, and everything else keyed by the lowercase name. Insertion
/// order of field occurrences is preserved within each partition, not across
/// them.
///
/// [`add`][HeaderMap::add] is the wire-side entry point and enforces the
/// per-field rules; [`insert`][HeaderMap::insert] is the programmatic entry
/// point and replaces unconditionally.
#[derive(Clone, Default)]
pub struct HeaderMap {
    kind: MessageKind,
    known: Vec<(Standard, Vec<HeaderValue>)>,
    other: Vec<(Box<str>, Vec<HeaderValue>)>,
}

impl HeaderMap {
    /// Create new empty [`HeaderMap`] without direction validation.
    #[inline]
    pub const fn new() -> Self {
        Self::with_kind(MessageKind::Plain)
    }

    /// Create new empty [`HeaderMap`] validating request-direction rules.
    #[inline]
    pub const fn for_request() -> Self {
        Self::with_kind(MessageKind::Request)
    }

    /// Create new empty [`HeaderMap`] validating response-direction rules.
    #[inline]
    pub const fn for_response() -> Self {
        Self::with_kind(MessageKind::Response)
    }

    const fn with_kind(kind: MessageKind) -> Self {
        Self {
            kind,
            known: Vec::new(),
            other: Vec::new(),
        }
    }

    /// Returns the number of values, including duplicate field occurrences.
    pub fn len(&self) -> usize {
        self.known
            .iter()
            .map(|(_, values)| values.len())
            .chain(self.other.iter().map(|(_, values)| values.len()))
            .sum()
    }

    /// Returns `true` if the map has no values.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.known.is_empty() && self.other.is_empty()
    }

    /// Clear the map, keeping allocations.
    pub fn clear(&mut self) {
        self.known.clear();
        self.other.clear();
    }

    /// Add a field occurrence, enforcing the per-field rules.
    ///
    /// List-valued fields are split on commas and accumulate; single-valued
    /// fields reject repetition, except a repeated `Content-Length` with the
    /// same numeric value which collapses to one.
    ///
    /// # Errors
    ///
    /// Returns a [`HeaderError`] carrying [`Severity::Warning`] for soft
    /// conditions (wrong direction, unknown token in a strict field, empty
    /// value) and [`Severity::Critical`] for invariant violations. The value
    /// is not stored in either case. A session must answer any `Critical`
    /// with `400 Bad Request`.
    pub fn add(&mut self, name: HeaderName, value: HeaderValue) -> Result<(), HeaderError> {
        if value.is_empty() {
            return Err(HeaderError::warn("header value is empty"));
        }

        let Some(standard) = name.standard() else {
            // unknown names carry no rules
            self.other_entry(name.as_str()).push(value);
            return Ok(());
        };

        let rule = standard.rule();

        match (rule.scope, self.kind) {
            (Scope::Request, MessageKind::Response) => {
                return Err(HeaderError::warn("request-only header in a response"));
            }
            (Scope::Response, MessageKind::Request) => {
                return Err(HeaderError::warn("response-only header in a request"));
            }
            _ => {}
        }

        if let Some(validator) = &rule.validate {
            if !(validator.check)(value.as_bytes()) {
                return Err(match validator.severity {
                    Severity::Critical if standard == Standard::ContentLength => {
                        HeaderError::framing(validator.message)
                    }
                    Severity::Critical => HeaderError::crit(validator.message),
                    Severity::Warning => HeaderError::warn(validator.message),
                });
            }
        }

        if rule.single_valued {
            if let Some(existing) = self.known_values(standard).and_then(<[_]>::first) {
                return if standard == Standard::ContentLength {
                    // duplicate occurrences with the same numeric value collapse
                    if atou(existing.as_bytes()) == atou(value.as_bytes()) {
                        Ok(())
                    } else {
                        Err(HeaderError::framing("conflicting content-length"))
                    }
                } else {
                    Err(HeaderError::crit("repeated single-valued header"))
                };
            }
        }

        let values = self.known_entry(standard);
        if rule.list_valued {
            for token in split_list(&value) {
                values.push(token);
            }
        } else {
            values.push(value);
        }
        Ok(())
    }

    /// Insert a field programmatically, replacing any present values.
    pub fn insert(&mut self, name: HeaderName, value: HeaderValue) {
        match name.standard() {
            Some(standard) => {
                let values = self.known_entry(standard);
                values.clear();
                values.push(value);
            }
            None => {
                let values = self.other_entry(name.as_str());
                values.clear();
                values.push(value);
            }
        }
    }

    /// Append a field value programmatically, without validation.
    pub fn append(&mut self, name: HeaderName, value: HeaderValue) {
        match name.standard() {
            Some(standard) => self.known_entry(standard).push(value),
            None => self.other_entry(name.as_str()).push(value),
        }
    }

    /// Returns `true` if the map contains the given field.
    pub fn contains<K: AsHeaderName>(&self, name: K) -> bool {
        !self.at(name).is_empty()
    }

    /// Returns all values of the given field, in insertion order.
    pub fn at<K: AsHeaderName>(&self, name: K) -> &[HeaderValue] {
        match name.resolve() {
            Resolved::Standard(standard) => {
                self.known_values(standard).unwrap_or_default()
            }
            Resolved::Custom(custom) => self
                .other
                .iter()
                .find(|(key, _)| key.as_ref().eq_ignore_ascii_case(custom))
                .map(|(_, values)| values.as_slice())
                .unwrap_or_default(),
        }
    }

    /// Returns the first value of the given field.
    pub fn get<K: AsHeaderName>(&self, name: K) -> Option<&HeaderValue> {
        self.at(name).first()
    }

    /// Returns `true` if any value of the field contains the token.
    ///
    /// Values are scanned as comma separated lists with optional whitespace,
    /// so both split and joined representations match.
    pub fn contains_value<K: AsHeaderName>(
        &self,
        name: K,
        token: &[u8],
        ignore_case: bool,
    ) -> bool {
        self.at(name).iter().any(|value| {
            value.as_bytes().split(|&byte| byte == b',').any(|part| {
                let part = trim_ows(part);
                if ignore_case {
                    part.eq_ignore_ascii_case(token)
                } else {
                    part == token
                }
            })
        })
    }

    /// Remove a field with all its values. Returns `true` if it was present.
    pub fn erase<K: AsHeaderName>(&mut self, name: K) -> bool {
        match name.resolve() {
            Resolved::Standard(standard) => {
                match self.known.iter().position(|(key, _)| *key == standard) {
                    Some(idx) => {
                        self.known.remove(idx);
                        true
                    }
                    None => false,
                }
            }
            Resolved::Custom(custom) => {
                match self
                    .other
                    .iter()
                    .position(|(key, _)| key.as_ref().eq_ignore_ascii_case(custom))
                {
                    Some(idx) => {
                        self.other.remove(idx);
                        true
                    }
                    None => false,
                }
            }
        }
    }

    /// Remove a single matching value of a field. Returns `true` if any
    /// value was removed; the field itself is removed when no value remains.
    pub fn erase_value<K: AsHeaderName>(
        &mut self,
        name: K,
        value: &[u8],
        ignore_case: bool,
    ) -> bool {
        let matches = |candidate: &HeaderValue| {
            if ignore_case {
                candidate.as_bytes().eq_ignore_ascii_case(value)
            } else {
                candidate.as_bytes() == value
            }
        };

        let (removed, now_empty, idx) = match name.resolve() {
            Resolved::Standard(standard) => {
                let Some(idx) = self.known.iter().position(|(key, _)| *key == standard) else {
                    return false;
                };
                let values = &mut self.known[idx].1;
                let before = values.len();
                values.retain(|candidate| !matches(candidate));
                (before != values.len(), values.is_empty(), Partition::Known(idx))
            }
            Resolved::Custom(custom) => {
                let Some(idx) = self
                    .other
                    .iter()
                    .position(|(key, _)| key.as_ref().eq_ignore_ascii_case(custom))
                else {
                    return false;
                };
                let values = &mut self.other[idx].1;
                let before = values.len();
                values.retain(|candidate| !matches(candidate));
                (before != values.len(), values.is_empty(), Partition::Other(idx))
            }
        };

        if now_empty {
            match idx {
                Partition::Known(idx) => {
                    self.known.remove(idx);
                }
                Partition::Other(idx) => {
                    self.other.remove(idx);
                }
            }
        }
        removed
    }

    /// Returns an iterator over `(name, value)` pairs, known partition
    /// first, each in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.known
            .iter()
            .flat_map(|(standard, values)| {
                values.iter().map(move |value| (standard.as_str(), value))
            })
            .chain(self.other.iter().flat_map(|(name, values)| {
                values.iter().map(move |value| (name.as_ref(), value))
            }))
    }

    /// Serialize every field as `name: value\r\n` lines.
    ///
    /// List-valued fields emit one comma joined line; `Set-Cookie` and
    /// unknown repeated fields emit one line per value. Names are emitted in
    /// canonical lowercase.
    pub fn write_to(&self, buf: &mut BytesMut) {
        for (standard, values) in &self.known {
            let rule = standard.rule();
            if rule.list_valued && *standard != Standard::SetCookie {
                if values.is_empty() {
                    continue;
                }
                buf.put_slice(standard.as_str().as_bytes());
                buf.put_slice(b": ");
                for (nth, value) in values.iter().enumerate() {
                    if nth > 0 {
                        buf.put_slice(b", ");
                    }
                    buf.put_slice(value.as_bytes());
                }
                buf.put_slice(b"\r\n");
            } else {
                for value in values {
                    buf.put_slice(standard.as_str().as_bytes());
                    buf.put_slice(b": ");
                    buf.put_slice(value.as_bytes());
                    buf.put_slice(b"\r\n");
                }
            }
        }
        for (name, values) in &self.other {
            for value in values {
                buf.put_slice(name.as_bytes());
                buf.put_slice(b": ");
                buf.put_slice(value.as_bytes());
                buf.put_slice(b"\r\n");
            }
        }
    }

    // ===== Framing helpers =====

    /// The parsed `Content-Length` value, `None` when absent or invalid.
    pub fn content_length(&self) -> Option<u64> {
        crate::common::atou(self.get(super::standard::CONTENT_LENGTH)?.as_bytes())
    }

    /// The `Transfer-Encoding` coding state.
    ///
    /// `None` when the field is absent, `Some(true)` for exactly one
    /// `chunked` token, `Some(false)` for anything else.
    pub fn transfer_chunked(&self) -> Option<bool> {
        let values = self.at(super::standard::TRANSFER_ENCODING);
        if values.is_empty() {
            return None;
        }
        Some(values.len() == 1 && values[0].eq_token(b"chunked", true))
    }

    /// Returns `true` if `Connection` carries the given token.
    pub fn connection_has(&self, token: &str) -> bool {
        self.contains_value(super::standard::CONNECTION, token.as_bytes(), true)
    }

    // ===== Partitions =====

    fn known_values(&self, standard: Standard) -> Option<&[HeaderValue]> {
        self.known
            .iter()
            .find(|(key, _)| *key == standard)
            .map(|(_, values)| values.as_slice())
    }

    fn known_entry(&mut self, standard: Standard) -> &mut Vec<HeaderValue> {
        match self.known.iter().position(|(key, _)| *key == standard) {
            Some(idx) => &mut self.known[idx].1,
            None => {
                self.known.push((standard, Vec::new()));
                // just pushed
                &mut self.known.last_mut().expect("just pushed").1
            }
        }
    }

    fn other_entry(&mut self, name: &str) -> &mut Vec<HeaderValue> {
        match self
            .other
            .iter()
            .position(|(key, _)| key.as_ref().eq_ignore_ascii_case(name))
        {
            Some(idx) => &mut self.other[idx].1,
            None => {
                self.other.push((Box::from(name), Vec::new()));
                &mut self.other.last_mut().expect("just pushed").1
            }
        }
    }
}

enum Partition {
    Known(usize),
    Other(usize),
}

fn split_list(value: &HeaderValue) -> Vec<HeaderValue> {
    value
        .as_bytes()
        .split(|&byte| byte == b',')
        .map(trim_ows)
        .filter(|part| !part.is_empty())
        .map(|part| {
            // already validated by the whole value
            HeaderValue::from_bytes(Bytes::copy_from_slice(part)).unwrap_or_else(|_| {
                HeaderValue::from_static("")
            })
        })
        .collect()
}

impl std::fmt::Debug for HeaderMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

// ===== Ref Traits =====

/// A type that can be used for [`HeaderMap`]'s lookup operations.
///
/// Implemented for `&str` (matched case-insensitively) and [`HeaderName`].
#[allow(private_bounds)]
pub trait AsHeaderName: sealed::Sealed {}

pub(crate) enum Resolved<'a> {
    Standard(Standard),
    Custom(&'a str),
}

mod sealed {
    use super::*;

    pub trait Sealed {
        fn resolve(&self) -> Resolved<'_>;
    }

    impl AsHeaderName for &str {}
    impl Sealed for &str {
        fn resolve(&self) -> Resolved<'_> {
            match Standard::lookup(self.as_bytes()) {
                Some(standard) => Resolved::Standard(standard),
                None => Resolved::Custom(self),
            }
        }
    }

    impl AsHeaderName for HeaderName {}
    impl Sealed for HeaderName {
        fn resolve(&self) -> Resolved<'_> {
            match self.standard() {
                Some(standard) => Resolved::Standard(standard),
                None => Resolved::Custom(self.as_str()),
            }
        }
    }

    impl<K: AsHeaderName> AsHeaderName for &K {}
    impl<S: Sealed> Sealed for &S {
        fn resolve(&self) -> Resolved<'_> {
            S::resolve(self)
        }
    }
}
