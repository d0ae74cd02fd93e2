//! Request target, origin-form ([RFC3986]).
//!
//! The path and query are stored raw; percent-decoding happens lazily where
//! semantics require it. Query key/value splitting runs on the raw form.
//!
//! [RFC3986]: <https://www.rfc-editor.org/rfc/rfc3986.html>
mod query;

pub mod error;

pub use error::UriError;
pub use query::{Query, percent_decode};

use crate::h1::matches::{is_path_char, is_query_char};

/// An origin-form request target.
///
/// `path` is non-empty and starts with `/`; `query` may be empty. A fragment
/// is rejected on the server side.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Uri {
    path: Box<str>,
    query: Box<str>,
}

impl Uri {
    /// Parse an origin-form target, e.g: `/users/42?active=1`.
    ///
    /// # Errors
    ///
    /// Returns an error when the target does not start with `/`, contains a
    /// byte outside its character class, or carries a fragment.
    pub fn parse_origin(src: &[u8]) -> Result<Uri, UriError> {
        let [b'/', ..] = src else {
            return Err(UriError::NotOriginForm);
        };

        let mut split = None;
        for (nth, &byte) in src.iter().enumerate() {
            match byte {
                b'#' => return Err(UriError::Fragment),
                b'?' if split.is_none() => split = Some(nth),
                _ => match split {
                    None if !is_path_char(byte) => return Err(UriError::InvalidPath),
                    Some(_) if !is_query_char(byte) => return Err(UriError::InvalidQuery),
                    _ => {}
                },
            }
        }

        let (path, query) = match split {
            Some(nth) => (&src[..nth], &src[nth + 1..]),
            None => (src, &src[..0]),
        };

        // both classes are subsets of ASCII
        let path = str::from_utf8(path).map_err(|_| UriError::InvalidPath)?;
        let query = str::from_utf8(query).map_err(|_| UriError::InvalidQuery)?;

        Ok(Uri {
            path: Box::from(path),
            query: Box::from(query),
        })
    }

    /// The raw path, always starting with `/`.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The raw query, without the leading `?`, possibly empty.
    #[inline]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Split the raw query into raw key/value pairs.
    ///
    /// `&` separates pairs, the first `=` separates key from value, a
    /// missing `=` yields an empty value.
    pub fn raw_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((key, value)) => (key, value),
                None => (pair, ""),
            })
    }

    /// Build the decoded query multimap.
    ///
    /// Keys are case-sensitive; value order is preserved within a key.
    pub fn query_map(&self) -> Query {
        Query::parse(&self.query)
    }

    pub(crate) fn clear(&mut self) {
        self.path = Box::from("");
        self.query = Box::from("");
    }

    pub(crate) fn is_cleared(&self) -> bool {
        self.path.is_empty() && self.query.is_empty()
    }
}

impl std::fmt::Debug for Uri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

impl std::fmt::Display for Uri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path)?;
        if !self.query.is_empty() {
            f.write_str("?")?;
            f.write_str(&self.query)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test;
