use super::error::RouteError;

/// One `/`-separated piece of a path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    /// Exact match.
    Literal(Box<str>),
    /// `{name}` or `{name:regex}`; `pattern` is `None` for the default
    /// `[^/]+` constraint.
    Param {
        name: Box<str>,
        pattern: Option<Box<str>>,
    },
    /// `*`, consuming all remaining segments as one parameter.
    Wildcard,
}

#[derive(Debug)]
pub(crate) struct ParsedPattern {
    pub(crate) segments: Vec<Segment>,
    pub(crate) trailing_slash: bool,
}

/// Parse a path pattern: `/lit/{name}/{name:regex}/*`.
///
/// An escaped `\*` segment is a literal asterisk. A trailing `/` is
/// recorded; routes with and without it are distinct.
pub(crate) fn parse(pattern: &str) -> Result<ParsedPattern, RouteError> {
    if !pattern.starts_with('/') {
        return Err(RouteError::NotAbsolute);
    }

    let trailing_slash = pattern.len() > 1 && pattern.ends_with('/');
    let mut segments = Vec::new();

    for raw in pattern.split('/').filter(|raw| !raw.is_empty()) {
        if let Some(Segment::Wildcard) = segments.last() {
            return Err(RouteError::WildcardNotLast);
        }
        segments.push(parse_segment(raw)?);
    }

    Ok(ParsedPattern {
        segments,
        trailing_slash,
    })
}

fn parse_segment(raw: &str) -> Result<Segment, RouteError> {
    match raw {
        "*" => return Ok(Segment::Wildcard),
        "\\*" => return Ok(Segment::Literal(Box::from("*"))),
        _ => {}
    }

    if let Some(inner) = raw.strip_prefix('{') {
        let Some(inner) = inner.strip_suffix('}') else {
            return Err(RouteError::UnbalancedBrace);
        };
        let (name, pattern) = match inner.split_once(':') {
            Some((name, pattern)) if !pattern.is_empty() => (name, Some(Box::from(pattern))),
            Some(_) => return Err(RouteError::EmptyConstraint),
            None => (inner, None),
        };
        if name.is_empty() {
            return Err(RouteError::EmptyParamName);
        }
        return Ok(Segment::Param {
            name: Box::from(name),
            pattern,
        });
    }

    Ok(Segment::Literal(Box::from(raw)))
}
