//! The historical yaml-path dialect, retained for overlay 1.0.0 documents.
//!
//! Compared to the rfc 9535 implementation the grammar is laxer: member
//! names may contain any character up to the next `.` or `[`, filters use
//! the `?(...)` form, `=~` matches a regular expression, and the `~`
//! property-name extension is not available.

use regex::Regex;

use crate::error::Error;
use crate::path::PathEvaluator;
use crate::tree::{tag, NodeId, NodeKind, Tree};

lazy_static! {
    static ref FILTER_RE: Regex = Regex::new(
        r"^@\.?(?P<path>[^=!<>~[:space:]]*)\s*(?:(?P<op>==|!=|>=|<=|=~|>|<)\s*(?P<rhs>.+?))?\s*$"
    )
    .unwrap();
}

pub struct LegacyPath;

impl PathEvaluator for LegacyPath {
    fn query(&self, expr: &str, tree: &Tree, root: NodeId) -> Result<Vec<NodeId>, Error> {
        let steps = parse(expr)?;
        let mut current = vec![root];

        for step in &steps {
            let mut next = Vec::new();

            match step {
                Step::Child(selectors) => {
                    for &node in &current {
                        for selector in selectors {
                            apply(tree, selector, node, &mut next);
                        }
                    }
                }
                Step::Recursive(selectors) => {
                    for &node in &current {
                        let mut descendants = Vec::new();
                        descend(tree, node, &mut descendants);

                        for d in descendants {
                            for selector in selectors {
                                apply(tree, selector, d, &mut next);
                            }
                        }
                    }
                }
            }

            let mut seen = std::collections::HashSet::new();
            current = next.into_iter().filter(|n| seen.insert(*n)).collect();
        }

        Ok(current)
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Step {
    Child(Vec<Sel>),
    Recursive(Vec<Sel>),
}

#[derive(Clone, Debug, PartialEq)]
enum Sel {
    Name(String),
    Wildcard,
    Index(i64),
    Slice(Option<i64>, Option<i64>),
    Filter(Filter),
}

#[derive(Clone, Debug, PartialEq)]
struct Filter {
    path: Vec<String>,
    condition: Option<(Op, String)>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Op {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    Match,
}

fn parse(expr: &str) -> Result<Vec<Step>, Error> {
    let err = |reason: String| Error::PathParse {
        expr: expr.to_string(),
        reason,
    };

    let chars: Vec<char> = expr.chars().collect();
    let mut steps = Vec::new();
    let mut i = 0;

    // a leading `$` is customary but optional in this dialect
    if chars.first() == Some(&'$') {
        i += 1;
    }

    while i < chars.len() {
        match chars[i] {
            '.' => {
                let recursive = chars.get(i + 1) == Some(&'.');
                i += if recursive { 2 } else { 1 };

                match chars.get(i) {
                    Some('[') => {
                        let (selectors, consumed) = bracket(&chars[i..], expr)?;
                        i += consumed;
                        steps.push(wrap(recursive, selectors));
                    }
                    Some('*') => {
                        i += 1;
                        steps.push(wrap(recursive, vec![Sel::Wildcard]));
                    }
                    Some(_) => {
                        let start = i;
                        while i < chars.len() && chars[i] != '.' && chars[i] != '[' {
                            i += 1;
                        }
                        let name: String = chars[start..i].iter().collect();
                        if name.is_empty() {
                            return Err(err("empty member name".to_string()));
                        }
                        steps.push(wrap(recursive, vec![Sel::Name(name)]));
                    }
                    None => return Err(err("path ends after '.'".to_string())),
                }
            }
            '[' => {
                let (selectors, consumed) = bracket(&chars[i..], expr)?;
                i += consumed;
                steps.push(Step::Child(selectors));
            }
            c => return Err(err(format!("unexpected character '{}'", c))),
        }
    }

    Ok(steps)
}

fn wrap(recursive: bool, selectors: Vec<Sel>) -> Step {
    if recursive {
        Step::Recursive(selectors)
    } else {
        Step::Child(selectors)
    }
}

/// Parses a bracketed selector list starting at `chars[0] == '['`. Returns
/// the selectors and the number of characters consumed including brackets.
fn bracket(chars: &[char], expr: &str) -> Result<(Vec<Sel>, usize), Error> {
    let err = |reason: String| Error::PathParse {
        expr: expr.to_string(),
        reason,
    };

    // find the matching close bracket, respecting quotes and parens
    let mut depth = 0usize;
    let mut quote = None;
    let mut end = None;
    for (i, &c) in chars.iter().enumerate() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' => quote = Some(c),
                '[' | '(' => depth += 1,
                ']' | ')' => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(i);
                        break;
                    }
                }
                _ => {}
            },
        }
    }

    let end = end.ok_or_else(|| err("unterminated '['".to_string()))?;
    let inner: String = chars[1..end].iter().collect();

    let mut selectors = Vec::new();
    for part in split_top_level(&inner) {
        let part = part.trim();

        if part == "*" {
            selectors.push(Sel::Wildcard);
        } else if (part.starts_with('\'') && part.ends_with('\'') && part.len() >= 2)
            || (part.starts_with('"') && part.ends_with('"') && part.len() >= 2)
        {
            selectors.push(Sel::Name(part[1..part.len() - 1].to_string()));
        } else if part.starts_with("?(") && part.ends_with(')') {
            selectors.push(Sel::Filter(parse_filter(&part[2..part.len() - 1], expr)?));
        } else if part.contains(':') {
            let bounds: Vec<&str> = part.splitn(2, ':').collect();
            let parse_bound = |s: &str| -> Result<Option<i64>, Error> {
                if s.trim().is_empty() {
                    Ok(None)
                } else {
                    s.trim()
                        .parse()
                        .map(Some)
                        .map_err(|_| err(format!("invalid slice bound '{}'", s)))
                }
            };
            selectors.push(Sel::Slice(parse_bound(bounds[0])?, parse_bound(bounds[1])?));
        } else if let Ok(index) = part.parse::<i64>() {
            selectors.push(Sel::Index(index));
        } else if !part.is_empty() {
            selectors.push(Sel::Name(part.to_string()));
        } else {
            return Err(err("empty selector".to_string()));
        }
    }

    Ok((selectors, end + 1))
}

/// Splits on commas that are not nested in quotes or parens.
fn split_top_level(inner: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote = None;

    for c in inner.chars() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    current.push(c);
                }
                '(' | '[' => {
                    depth += 1;
                    current.push(c);
                }
                ')' | ']' => {
                    depth = depth.saturating_sub(1);
                    current.push(c);
                }
                ',' if depth == 0 => {
                    parts.push(std::mem::take(&mut current));
                }
                _ => current.push(c),
            },
        }
    }

    if !current.is_empty() {
        parts.push(current);
    }

    parts
}

fn parse_filter(body: &str, expr: &str) -> Result<Filter, Error> {
    let caps = FILTER_RE
        .captures(body.trim())
        .ok_or_else(|| Error::PathParse {
            expr: expr.to_string(),
            reason: format!("invalid filter expression '{}'", body),
        })?;

    let path: Vec<String> = caps["path"]
        .split('.')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect();

    let condition = match caps.name("op") {
        Some(op) => {
            let op = match op.as_str() {
                "==" => Op::Eq,
                "!=" => Op::Ne,
                ">=" => Op::Ge,
                "<=" => Op::Le,
                "=~" => Op::Match,
                ">" => Op::Gt,
                "<" => Op::Lt,
                _ => unreachable!(),
            };

            let rhs = caps["rhs"].trim();
            let rhs = rhs
                .strip_prefix('\'')
                .and_then(|s| s.strip_suffix('\''))
                .or_else(|| rhs.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
                .or_else(|| {
                    // `/regex/` form for match conditions
                    rhs.strip_prefix('/').and_then(|s| s.strip_suffix('/'))
                })
                .unwrap_or(rhs);

            Some((op, rhs.to_string()))
        }
        None => None,
    };

    Ok(Filter { path, condition })
}

fn apply(tree: &Tree, selector: &Sel, node: NodeId, out: &mut Vec<NodeId>) {
    match selector {
        Sel::Name(name) => {
            if tree.kind(node) == NodeKind::Mapping {
                if let Some(value) = tree.get(node, name) {
                    out.push(value);
                }
            }
        }
        Sel::Wildcard => match tree.kind(node) {
            NodeKind::Mapping => out.extend(tree.pairs(node).unwrap().iter().map(|(_, v)| *v)),
            NodeKind::Sequence => out.extend(tree.items(node).unwrap()),
            _ => {}
        },
        Sel::Index(index) => {
            if let Some(items) = tree.items(node) {
                let len = items.len() as i64;
                let i = if *index < 0 { len + index } else { *index };
                if (0..len).contains(&i) {
                    out.push(items[i as usize]);
                }
            }
        }
        Sel::Slice(start, end) => {
            if let Some(items) = tree.items(node) {
                let len = items.len() as i64;
                let normalize = |i: i64| if i < 0 { len + i } else { i };
                let from = normalize(start.unwrap_or(0)).clamp(0, len);
                let to = normalize(end.unwrap_or(len)).clamp(0, len);

                for i in from..to {
                    out.push(items[i as usize]);
                }
            }
        }
        Sel::Filter(filter) => {
            let children: Vec<NodeId> = match tree.kind(node) {
                NodeKind::Mapping => tree.pairs(node).unwrap().iter().map(|(_, v)| *v).collect(),
                NodeKind::Sequence => tree.items(node).unwrap().to_vec(),
                _ => vec![],
            };

            for child in children {
                if filter_matches(tree, filter, child) {
                    out.push(child);
                }
            }
        }
    }
}

fn filter_matches(tree: &Tree, filter: &Filter, node: NodeId) -> bool {
    let mut current = node;
    for part in &filter.path {
        match tree.get(current, part) {
            Some(next) => current = next,
            None => return false,
        }
    }

    let Some((op, rhs)) = &filter.condition else {
        // bare `?(@.field)` is an existence test
        return true;
    };

    let Some(value) = tree.scalar_value(current) else {
        return false;
    };

    // untyped comparison: numeric when both sides parse, string otherwise
    let numeric = || -> Option<std::cmp::Ordering> {
        let left: f64 = value.parse().ok()?;
        let right: f64 = rhs.parse().ok()?;
        left.partial_cmp(&right)
    };

    match op {
        Op::Eq => {
            if tree.node(current).tag == tag::NULL {
                rhs == "null" || rhs == "~"
            } else {
                numeric()
                    .map(|o| o.is_eq())
                    .unwrap_or_else(|| value == rhs)
            }
        }
        Op::Ne => !filter_matches(
            tree,
            &Filter {
                path: filter.path.clone(),
                condition: Some((Op::Eq, rhs.clone())),
            },
            node,
        ),
        Op::Gt => numeric().map(|o| o.is_gt()).unwrap_or(value > rhs.as_str()),
        Op::Lt => numeric().map(|o| o.is_lt()).unwrap_or(value < rhs.as_str()),
        Op::Ge => numeric().map(|o| o.is_ge()).unwrap_or(value >= rhs.as_str()),
        Op::Le => numeric().map(|o| o.is_le()).unwrap_or(value <= rhs.as_str()),
        Op::Match => Regex::new(rhs).map(|re| re.is_match(value)).unwrap_or(false),
    }
}

/// Pre-order visit of `node` and every descendant value/element.
fn descend(tree: &Tree, node: NodeId, out: &mut Vec<NodeId>) {
    out.push(node);

    match tree.kind(node) {
        NodeKind::Mapping => {
            for (_, v) in tree.pairs(node).unwrap().iter() {
                descend(tree, *v, out);
            }
        }
        NodeKind::Sequence => {
            for item in tree.items(node).unwrap().iter() {
                descend(tree, *item, out);
            }
        }
        _ => {}
    }
}
