use crate::h1::matches::{is_host_char, is_path_char, is_query_char, is_scheme_char};

/// URL scheme the client speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    /// The default port for this scheme.
    pub const fn default_port(&self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

/// A split absolute URL: `scheme://host[:port]/path?query#fragment`.
///
/// Unlike the server-side request target, a fragment is accepted here and
/// retained; it is never sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    scheme: Scheme,
    host: String,
    port: u16,
    path: String,
    query: String,
    fragment: Option<String>,
}

impl Url {
    /// Split an absolute URL.
    ///
    /// # Errors
    ///
    /// Returns an error on a missing or unsupported scheme, an empty or
    /// malformed host, a non-numeric port, or forbidden target bytes.
    pub fn parse(src: &str) -> Result<Url, UrlError> {
        let (scheme, rest) = match src.split_once("://") {
            Some((scheme, rest)) => (scheme, rest),
            None => return Err(UrlError::MissingScheme),
        };
        if !scheme.bytes().all(is_scheme_char) {
            return Err(UrlError::MissingScheme);
        }
        let scheme = match scheme {
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            _ => return Err(UrlError::UnsupportedScheme),
        };

        let authority_end = rest
            .find(['/', '?', '#'])
            .unwrap_or(rest.len());
        let (authority, target) = rest.split_at(authority_end);

        let (host, port) = match authority.rsplit_once(':') {
            // an IPv6 literal keeps its colons inside brackets
            Some((host, port)) if !port.contains(']') => {
                let port: u16 = port.parse().map_err(|_| UrlError::BadPort)?;
                (host, port)
            }
            _ => (authority, scheme.default_port()),
        };
        if host.is_empty() || !host.bytes().all(is_host_char) {
            return Err(UrlError::BadHost);
        }

        let (target, fragment) = match target.split_once('#') {
            Some((target, fragment)) => (target, Some(fragment.to_owned())),
            None => (target, None),
        };
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, query),
            None => (target, ""),
        };

        let path = if path.is_empty() { "/" } else { path };
        if !path.bytes().all(is_path_char) {
            return Err(UrlError::BadTarget);
        }
        if !query.bytes().all(is_query_char) {
            return Err(UrlError::BadTarget);
        }

        Ok(Url {
            scheme,
            host: host.to_owned(),
            port,
            path: path.to_owned(),
            query: query.to_owned(),
            fragment,
        })
    }

    #[inline]
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    #[inline]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[inline]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[inline]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[inline]
    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// The origin-form request target sent on the wire.
    pub fn target(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query)
        }
    }

    /// The `Host` header value: `host`, or `host:port` off the default.
    pub fn host_header(&self) -> String {
        if self.port == self.scheme.default_port() {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// URL splitting error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum UrlError {
    #[error("missing or malformed scheme")]
    MissingScheme,
    #[error("only http and https schemes are supported")]
    UnsupportedScheme,
    #[error("empty or malformed host")]
    BadHost,
    #[error("port is not a number in 0..=65535")]
    BadPort,
    #[error("forbidden character in path or query")]
    BadTarget,
}
