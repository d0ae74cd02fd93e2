use bytes::Bytes;

use super::error::InvalidHeaderValue;
use crate::h1::matches::{is_field_value, is_vchar_obs_text};

/// HTTP Header value.
///
/// Values preserve case and internal whitespace; optional whitespace at both
/// ends is trimmed before construction by the parser. A value may contain
/// `obs-text` bytes, so the raw representation is bytes, not a string.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct HeaderValue {
    inner: Bytes,
}

impl HeaderValue {
    /// Create [`HeaderValue`] from a static string.
    ///
    /// # Panics
    ///
    /// Panics when the value contains a forbidden byte. For fallible
    /// construction use [`HeaderValue::from_bytes`].
    pub fn from_static(value: &'static str) -> HeaderValue {
        match Self::from_bytes(Bytes::from_static(value.as_bytes())) {
            Ok(ok) => ok,
            Err(_) => panic!("invalid header value literal"),
        }
    }

    /// Create [`HeaderValue`] from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error when the value contains a byte outside
    /// `VCHAR / obs-text / SP / HTAB`, or starts or ends with whitespace;
    /// optional whitespace belongs to the wire form, not the value.
    pub fn from_bytes(value: impl Into<Bytes>) -> Result<HeaderValue, InvalidHeaderValue> {
        let inner = value.into();
        if !inner.iter().all(|&byte| is_field_value(byte)) {
            return Err(InvalidHeaderValue);
        }
        if let (Some(&first), Some(&last)) = (inner.first(), inner.last()) {
            if !is_vchar_obs_text(first) || !is_vchar_obs_text(last) {
                return Err(InvalidHeaderValue);
            }
        }
        Ok(HeaderValue { inner })
    }

    /// Extracts the raw bytes of the value.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.inner
    }

    /// Extracts the value as a string slice.
    ///
    /// Returns `None` when the value contains `obs-text` bytes.
    #[inline]
    pub fn to_str(&self) -> Option<&str> {
        str::from_utf8(&self.inner).ok()
    }

    /// Returns value length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the value is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Compare against a token, optionally ignoring ASCII case.
    #[inline]
    pub fn eq_token(&self, token: &[u8], ignore_case: bool) -> bool {
        if ignore_case {
            self.inner.eq_ignore_ascii_case(token)
        } else {
            self.inner == token
        }
    }
}

impl From<&'static str> for HeaderValue {
    fn from(value: &'static str) -> Self {
        Self::from_static(value)
    }
}

impl TryFrom<String> for HeaderValue {
    type Error = InvalidHeaderValue;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_bytes(Bytes::from(value.into_bytes()))
    }
}

impl PartialEq<&str> for HeaderValue {
    fn eq(&self, other: &&str) -> bool {
        self.inner == other.as_bytes()
    }
}

impl std::fmt::Debug for HeaderValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_str() {
            Some(value) => str::fmt(value, f),
            None => write!(f, "{:?}", self.inner),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_bytes() {
        let value = HeaderValue::from_bytes(&b"text/html; charset=utf-8"[..]).unwrap();
        assert_eq!(value.as_bytes(), b"text/html; charset=utf-8");
        assert_eq!(value.to_str(), Some("text/html; charset=utf-8"));

        assert!(HeaderValue::from_bytes(&b"with\r\nnewline"[..]).is_err());
        assert!(HeaderValue::from_bytes(&b"with\x00nul"[..]).is_err());

        // obs-text is allowed but is not a str
        let obs = HeaderValue::from_bytes(&[0x80u8, 0x81][..]).unwrap();
        assert_eq!(obs.to_str(), None);

        // surrounding whitespace is wire form, not value content
        assert!(HeaderValue::from_bytes(&b" padded"[..]).is_err());
        assert!(HeaderValue::from_bytes(&b"padded\t"[..]).is_err());
    }

    #[test]
    fn test_eq_token() {
        let value = HeaderValue::from_static("Keep-Alive");
        assert!(value.eq_token(b"keep-alive", true));
        assert!(!value.eq_token(b"keep-alive", false));
        assert!(value.eq_token(b"Keep-Alive", false));
    }
}
