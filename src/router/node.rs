use std::fmt::Write;

use regex::Regex;

use super::RouteId;
use super::error::RouteError;
use super::pattern::Segment;
use crate::request::Params;

/// A node of the path radix tree.
///
/// Edges are partitioned into literals, parameters with compiled regex
/// constraints, and an optional wildcard consuming the remaining segments.
#[derive(Debug, Default)]
pub(crate) struct Node {
    literal: Vec<(Box<str>, Node)>,
    params: Vec<ParamEdge>,
    wildcard: Option<Box<Node>>,
    terminal: Terminal,
}

#[derive(Debug)]
pub(crate) struct ParamEdge {
    name: Box<str>,
    /// `None` is the default `[^/]+` constraint.
    pattern: Option<Box<str>>,
    regex: Option<Regex>,
    node: Node,
}

/// Terminal route slots; patterns with and without a trailing `/` are
/// distinct routes.
#[derive(Debug, Default)]
struct Terminal {
    plain: Option<RouteId>,
    slash: Option<RouteId>,
}

impl Terminal {
    fn get(&self, trailing: bool) -> Option<RouteId> {
        if trailing { self.slash } else { self.plain }
    }

    fn slot(&mut self, trailing: bool) -> &mut Option<RouteId> {
        if trailing { &mut self.slash } else { &mut self.plain }
    }
}

impl Node {
    /// Insert a parsed pattern, merging edges along the way.
    ///
    /// Two parameter edges from the same node merge iff names and
    /// constraint patterns are identical.
    pub(crate) fn insert(
        &mut self,
        segments: &[Segment],
        trailing: bool,
        route: RouteId,
        registered: &str,
    ) -> Result<(), RouteError> {
        let Some((head, rest)) = segments.split_first() else {
            let slot = self.terminal.slot(trailing);
            if slot.is_some() {
                return Err(RouteError::Conflict(Box::from(registered)));
            }
            *slot = Some(route);
            return Ok(());
        };

        match head {
            Segment::Literal(lit) => {
                let child = match self
                    .literal
                    .iter()
                    .position(|(name, _)| name == lit)
                {
                    Some(idx) => &mut self.literal[idx].1,
                    None => {
                        self.literal.push((lit.clone(), Node::default()));
                        &mut self.literal.last_mut().expect("just pushed").1
                    }
                };
                child.insert(rest, trailing, route, registered)
            }
            Segment::Param { name, pattern } => {
                let existing = self
                    .params
                    .iter()
                    .position(|edge| edge.name == *name);
                let edge = match existing {
                    Some(idx) => {
                        let edge = &mut self.params[idx];
                        if edge.pattern != *pattern {
                            return Err(RouteError::ConstraintMismatch(name.clone()));
                        }
                        edge
                    }
                    None => {
                        let regex = match pattern {
                            Some(src) => Some(compile_anchored(src)?),
                            None => None,
                        };
                        self.params.push(ParamEdge {
                            name: name.clone(),
                            pattern: pattern.clone(),
                            regex,
                            node: Node::default(),
                        });
                        self.params.last_mut().expect("just pushed")
                    }
                };
                edge.node.insert(rest, trailing, route, registered)
            }
            Segment::Wildcard => {
                let node = self.wildcard.get_or_insert_default();
                let slot = node.terminal.slot(trailing);
                if slot.is_some() {
                    return Err(RouteError::Conflict(Box::from(registered)));
                }
                *slot = Some(route);
                Ok(())
            }
        }
    }

    /// Depth-first search with backtracking.
    ///
    /// Literal edges first, then parameter edges in registration order,
    /// then the wildcard. A binding installed for a failed sub-search is
    /// rolled back before the next edge is tried.
    pub(crate) fn find(
        &self,
        segments: &[&str],
        trailing: bool,
        params: &mut Params,
    ) -> Option<RouteId> {
        let Some((head, rest)) = segments.split_first() else {
            return self.terminal.get(trailing);
        };

        if let Some((_, child)) = self
            .literal
            .iter()
            .find(|(name, _)| name.as_ref() == *head)
        {
            if let Some(found) = child.find(rest, trailing, params) {
                return Some(found);
            }
        }

        for edge in &self.params {
            let accepted = match &edge.regex {
                Some(regex) => regex.is_match(head),
                None => !head.is_empty(),
            };
            if !accepted {
                continue;
            }
            let mark = params.len();
            params.bind(&edge.name, (*head).to_owned());
            if let Some(found) = edge.node.find(rest, trailing, params) {
                return Some(found);
            }
            params.rollback(mark);
        }

        if let Some(node) = &self.wildcard {
            let mark = params.len();
            params.bind("*", segments.join("/"));
            if let Some(found) = node.terminal.get(trailing) {
                return Some(found);
            }
            params.rollback(mark);
        }

        None
    }

    /// Render the tree for diagnostics.
    pub(crate) fn dump(&self, out: &mut String, prefix: &str) {
        let mark = |terminal: &Terminal| match (terminal.plain, terminal.slash) {
            (Some(_), Some(_)) => " [route, route/]",
            (Some(_), None) => " [route]",
            (None, Some(_)) => " [route/]",
            (None, None) => "",
        };

        for (name, child) in &self.literal {
            let _ = writeln!(out, "{prefix}{name}{}", mark(&child.terminal));
            child.dump(out, &format!("{prefix}  "));
        }
        for edge in &self.params {
            match &edge.pattern {
                Some(pattern) => {
                    let _ = writeln!(
                        out,
                        "{prefix}{{{}:{}}}{}",
                        edge.name,
                        pattern,
                        mark(&edge.node.terminal)
                    );
                }
                None => {
                    let _ = writeln!(out, "{prefix}{{{}}}{}", edge.name, mark(&edge.node.terminal));
                }
            }
            edge.node.dump(out, &format!("{prefix}  "));
        }
        if let Some(node) = &self.wildcard {
            let _ = writeln!(out, "{prefix}*{}", mark(&node.terminal));
        }
    }

}

/// Constraints match the whole segment, never a substring.
fn compile_anchored(src: &str) -> Result<Regex, RouteError> {
    Ok(Regex::new(&format!("^(?:{src})$"))?)
}
