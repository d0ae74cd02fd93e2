/// Decode a percent-encoded component.
///
/// `+` is left as-is; this is the RFC3986 decoder, not the form decoder.
/// Returns `None` on a truncated or non-hex escape, or when the decoded
/// bytes are not valid UTF-8.
pub fn percent_decode(src: &str) -> Option<String> {
    let mut out = Vec::with_capacity(src.len());
    let mut bytes = src.bytes();

    while let Some(byte) = bytes.next() {
        if byte != b'%' {
            out.push(byte);
            continue;
        }
        let hi = hex_digit(bytes.next()?)?;
        let lo = hex_digit(bytes.next()?)?;
        out.push(hi << 4 | lo);
    }

    String::from_utf8(out).ok()
}

const fn hex_digit(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Decoded query multimap.
///
/// Keys are case-sensitive and kept in first-occurrence order; values
/// preserve insertion order within a key. Pairs whose key or value fail to
/// decode keep their raw form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pairs: Vec<(String, Vec<String>)>,
}

impl Query {
    pub(crate) fn parse(raw: &str) -> Query {
        let mut query = Query { pairs: Vec::new() };

        for pair in raw.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = match pair.split_once('=') {
                Some((key, value)) => (key, value),
                None => (pair, ""),
            };
            let key = percent_decode(key).unwrap_or_else(|| key.to_owned());
            let value = percent_decode(value).unwrap_or_else(|| value.to_owned());
            query.entry(key).push(value);
        }

        query
    }

    fn entry(&mut self, key: String) -> &mut Vec<String> {
        match self.pairs.iter().position(|(name, _)| *name == key) {
            Some(idx) => &mut self.pairs[idx].1,
            None => {
                self.pairs.push((key, Vec::new()));
                &mut self.pairs.last_mut().expect("just pushed").1
            }
        }
    }

    /// Returns all values for the key, in insertion order.
    pub fn at(&self, key: &str) -> &[String] {
        self.pairs
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, values)| values.as_slice())
            .unwrap_or_default()
    }

    /// Returns the first value for the key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.at(key).first().map(String::as_str)
    }

    /// Returns `true` if the key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.pairs.iter().any(|(name, _)| name == key)
    }

    /// Returns the number of distinct keys.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns `true` if no pair was parsed.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Returns an iterator over `(key, values)` entries in first-occurrence
    /// order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.pairs
            .iter()
            .map(|(key, values)| (key.as_str(), values.as_slice()))
    }
}
