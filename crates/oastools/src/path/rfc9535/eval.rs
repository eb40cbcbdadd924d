use std::collections::{HashMap, HashSet};

use crate::error::Error;
use crate::path::PathEvaluator;
use crate::tree::{tag, NodeId, NodeKind, Tree};

use super::parser::{
    self, CmpOp, Comparable, FilterExpr, FunctionCall, FunctionName, Literal, Query, QueryRoot,
    Segment, Selector,
};

pub struct Rfc9535Path;

impl PathEvaluator for Rfc9535Path {
    fn query(&self, expr: &str, tree: &Tree, root: NodeId) -> Result<Vec<NodeId>, Error> {
        let path = parser::parse(expr)?;
        let mut ctx = Context {
            tree,
            root,
            parents: None,
        };

        Ok(ctx.eval_path(&path.segments, root))
    }
}

struct Context<'a> {
    tree: &'a Tree,
    root: NodeId,
    /// Parent index, built lazily on the first `~` segment.
    parents: Option<HashMap<NodeId, NodeId>>,
}

impl<'a> Context<'a> {
    fn eval_path(&mut self, segments: &[Segment], start: NodeId) -> Vec<NodeId> {
        let mut current = vec![start];

        for segment in segments {
            let mut next = Vec::new();

            match segment {
                Segment::Child(selectors) => {
                    for &node in &current {
                        for selector in selectors {
                            self.apply(selector, node, &mut next);
                        }
                    }
                }
                Segment::Descendant(selectors) => {
                    for &node in &current {
                        let mut descendants = Vec::new();
                        collect_descendants(self.tree, node, &mut descendants);

                        for d in descendants {
                            for selector in selectors {
                                self.apply(selector, d, &mut next);
                            }
                        }
                    }
                }
                Segment::PropertyName => {
                    if self.parents.is_none() {
                        self.parents = Some(self.tree.parent_index());
                    }

                    let tree = self.tree;
                    let parents = self.parents.as_ref().unwrap();
                    for &node in &current {
                        if let Some(&parent) = parents.get(&node) {
                            if let Some(pairs) = tree.pairs(parent) {
                                if let Some((k, _)) = pairs.iter().find(|(_, v)| *v == node) {
                                    next.push(*k);
                                }
                            }
                        }
                    }
                }
            }

            current = dedup(next);
        }

        current
    }

    fn apply(&mut self, selector: &Selector, node: NodeId, out: &mut Vec<NodeId>) {
        match selector {
            Selector::Name(name) => {
                if self.tree.kind(node) == NodeKind::Mapping {
                    if let Some(value) = self.tree.get(node, name) {
                        out.push(value);
                    }
                }
            }
            Selector::Wildcard => match self.tree.kind(node) {
                NodeKind::Mapping => {
                    // duplicate keys resolve last-wins even under a wildcard
                    let pairs = self.tree.pairs(node).unwrap();
                    for (i, (k, v)) in pairs.iter().enumerate() {
                        let key = self.tree.scalar_value(*k);
                        let shadowed = key.is_some_and(|key| {
                            pairs[i + 1..]
                                .iter()
                                .any(|(k2, _)| self.tree.scalar_value(*k2) == Some(key))
                        });
                        if !shadowed {
                            out.push(*v);
                        }
                    }
                }
                NodeKind::Sequence => out.extend(self.tree.items(node).unwrap()),
                _ => {}
            },
            Selector::Index(index) => {
                if let Some(items) = self.tree.items(node) {
                    let len = items.len() as i64;
                    let i = if *index < 0 { len + index } else { *index };
                    if (0..len).contains(&i) {
                        out.push(items[i as usize]);
                    }
                }
            }
            Selector::Slice { start, end, step } => {
                if let Some(items) = self.tree.items(node) {
                    slice_indices(items.len(), *start, *end, *step)
                        .into_iter()
                        .for_each(|i| out.push(items[i]));
                }
            }
            Selector::Filter(expr) => {
                let children: Vec<NodeId> = match self.tree.kind(node) {
                    NodeKind::Mapping => self
                        .tree
                        .pairs(node)
                        .unwrap()
                        .iter()
                        .map(|(_, v)| *v)
                        .collect(),
                    NodeKind::Sequence => self.tree.items(node).unwrap().to_vec(),
                    _ => vec![],
                };

                for child in children {
                    if self.truthy(expr, child) {
                        out.push(child);
                    }
                }
            }
        }
    }

    fn truthy(&mut self, expr: &FilterExpr, current: NodeId) -> bool {
        match expr {
            FilterExpr::Or(a, b) => self.truthy(a, current) || self.truthy(b, current),
            FilterExpr::And(a, b) => self.truthy(a, current) && self.truthy(b, current),
            FilterExpr::Not(inner) => !self.truthy(inner, current),
            FilterExpr::Test(query) => !self.resolve(query, current).is_empty(),
            FilterExpr::Comparison { left, op, right } => {
                let left = self.value_of(left, current);
                let right = self.value_of(right, current);
                compare(self.tree, &left, *op, &right)
            }
        }
    }

    fn resolve(&mut self, query: &Query, current: NodeId) -> Vec<NodeId> {
        let start = match query.root {
            QueryRoot::Current => current,
            QueryRoot::Root => self.root,
        };

        self.eval_path(&query.segments, start)
    }

    fn value_of(&mut self, comparable: &Comparable, current: NodeId) -> FilterValue {
        match comparable {
            Comparable::Literal(literal) => match literal {
                Literal::Null => FilterValue::Null,
                Literal::Bool(b) => FilterValue::Bool(*b),
                Literal::Int(i) => FilterValue::Float(*i as f64),
                Literal::Float(f) => FilterValue::Float(*f),
                Literal::Str(s) => FilterValue::Str(s.clone()),
            },
            Comparable::Query(query) => {
                let nodes = self.resolve(query, current);
                match nodes.len() {
                    0 => FilterValue::Nothing,
                    _ => self.node_value(nodes[0]),
                }
            }
            Comparable::Function(call) => self.call(call, current),
        }
    }

    fn node_value(&self, node: NodeId) -> FilterValue {
        match self.tree.kind(node) {
            NodeKind::Scalar => {
                let value = self.tree.scalar_value(node).unwrap();
                match self.tree.node(node).tag.as_str() {
                    tag::NULL => FilterValue::Null,
                    tag::BOOL => value
                        .parse()
                        .map(FilterValue::Bool)
                        .unwrap_or(FilterValue::Str(value.to_string())),
                    tag::INT | tag::FLOAT => value
                        .parse()
                        .map(FilterValue::Float)
                        .unwrap_or(FilterValue::Str(value.to_string())),
                    _ => FilterValue::Str(value.to_string()),
                }
            }
            _ => FilterValue::Node(node),
        }
    }

    fn call(&mut self, call: &FunctionCall, current: NodeId) -> FilterValue {
        match call.name {
            FunctionName::Length => match self.value_of(&call.args[0], current) {
                FilterValue::Str(s) => FilterValue::Float(s.chars().count() as f64),
                FilterValue::Node(node) => match self.tree.kind(node) {
                    NodeKind::Mapping => {
                        FilterValue::Float(self.tree.pairs(node).unwrap().len() as f64)
                    }
                    NodeKind::Sequence => {
                        FilterValue::Float(self.tree.items(node).unwrap().len() as f64)
                    }
                    _ => FilterValue::Nothing,
                },
                _ => FilterValue::Nothing,
            },
            FunctionName::Count => match &call.args[0] {
                Comparable::Query(query) => {
                    FilterValue::Float(self.resolve(query, current).len() as f64)
                }
                _ => FilterValue::Nothing,
            },
            FunctionName::Value => match &call.args[0] {
                Comparable::Query(query) => {
                    let nodes = self.resolve(query, current);
                    match nodes.len() {
                        1 => self.node_value(nodes[0]),
                        _ => FilterValue::Nothing,
                    }
                }
                _ => FilterValue::Nothing,
            },
            FunctionName::Match | FunctionName::Search => {
                let input = self.value_of(&call.args[0], current);
                let pattern = self.value_of(&call.args[1], current);

                let (FilterValue::Str(input), FilterValue::Str(pattern)) = (input, pattern)
                else {
                    return FilterValue::Bool(false);
                };

                let pattern = if call.name == FunctionName::Match {
                    format!("^(?:{})$", pattern)
                } else {
                    pattern
                };

                match regex::Regex::new(&pattern) {
                    Ok(re) => FilterValue::Bool(re.is_match(&input)),
                    Err(_) => FilterValue::Bool(false),
                }
            }
        }
    }
}

#[derive(Clone, Debug)]
enum FilterValue {
    /// Absent: the singular query selected no node.
    Nothing,
    Null,
    Bool(bool),
    Float(f64),
    Str(String),
    /// A structured (mapping/sequence) node.
    Node(NodeId),
}

fn compare(tree: &Tree, left: &FilterValue, op: CmpOp, right: &FilterValue) -> bool {
    use FilterValue::*;

    let eq = match (left, right) {
        (Nothing, Nothing) => true,
        (Null, Null) => true,
        (Bool(a), Bool(b)) => a == b,
        (Float(a), Float(b)) => a == b,
        (Str(a), Str(b)) => a == b,
        (Node(a), Node(b)) => tree.structural_eq(*a, tree, *b),
        _ => false,
    };

    match op {
        CmpOp::Eq => eq,
        CmpOp::Ne => !eq,
        CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge => {
            let ordering = match (left, right) {
                (Float(a), Float(b)) => a.partial_cmp(b),
                (Str(a), Str(b)) => Some(a.cmp(b)),
                _ => None,
            };

            match ordering {
                None => false,
                Some(ordering) => match op {
                    CmpOp::Lt => ordering.is_lt(),
                    CmpOp::Le => ordering.is_le(),
                    CmpOp::Gt => ordering.is_gt(),
                    CmpOp::Ge => ordering.is_ge(),
                    _ => unreachable!(),
                },
            }
        }
    }
}

/// Pre-order visit of `node` and every descendant. Mapping keys are not
/// visited; aliases are opaque leaves.
fn collect_descendants(tree: &Tree, node: NodeId, out: &mut Vec<NodeId>) {
    out.push(node);

    match tree.kind(node) {
        NodeKind::Mapping => {
            for (_, v) in tree.pairs(node).unwrap().iter() {
                collect_descendants(tree, *v, out);
            }
        }
        NodeKind::Sequence => {
            for item in tree.items(node).unwrap().iter() {
                collect_descendants(tree, *item, out);
            }
        }
        _ => {}
    }
}

/// Rfc 9535 slice semantics, including negative bounds and steps.
fn slice_indices(len: usize, start: Option<i64>, end: Option<i64>, step: Option<i64>) -> Vec<usize> {
    let len = len as i64;
    let step = step.unwrap_or(1);

    if step == 0 || len == 0 {
        return vec![];
    }

    let normalize = |i: i64| if i < 0 { len + i } else { i };

    let (start, end) = if step > 0 {
        let start = normalize(start.unwrap_or(0)).clamp(0, len);
        let end = normalize(end.unwrap_or(len)).clamp(0, len);
        (start, end)
    } else {
        let start = normalize(start.unwrap_or(len - 1)).clamp(-1, len - 1);
        let end = normalize(end.unwrap_or(-len - 1)).clamp(-1, len - 1);
        (start, end)
    };

    let mut out = Vec::new();
    let mut i = start;
    if step > 0 {
        while i < end {
            out.push(i as usize);
            i += step;
        }
    } else {
        while i > end {
            out.push(i as usize);
            i += step;
        }
    }

    out
}

fn dedup(nodes: Vec<NodeId>) -> Vec<NodeId> {
    let mut seen = HashSet::new();
    nodes.into_iter().filter(|n| seen.insert(*n)).collect()
}
