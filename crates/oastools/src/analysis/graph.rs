//! Extraction of the typed reference graph from an openapi document's
//! `components.schemas` section.
//!
//! Named schemas become nodes; `$ref`s between them become typed edges.
//! Inline sub-schemas are walked through, never materialized as nodes. A
//! second, ref-bounded walk accumulates per-node shape statistics.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::error::Error;
use crate::tree::{NodeId, NodeKind, Tree};

const SCHEMAS_REF_PREFIX: &str = "#/components/schemas/";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EdgeKind {
    Property,
    Items,
    AllOf,
    OneOf,
    AnyOf,
    AdditionalProperties,
    Not,
    PrefixItems,
    If,
    Then,
    Else,
}

impl EdgeKind {
    pub fn label(&self) -> &'static str {
        match self {
            EdgeKind::Property => "property",
            EdgeKind::Items => "items",
            EdgeKind::AllOf => "allOf",
            EdgeKind::OneOf => "oneOf",
            EdgeKind::AnyOf => "anyOf",
            EdgeKind::AdditionalProperties => "additionalProperties",
            EdgeKind::Not => "not",
            EdgeKind::PrefixItems => "prefixItems",
            EdgeKind::If => "if",
            EdgeKind::Then => "then",
            EdgeKind::Else => "else",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub kind: EdgeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
    pub is_required: bool,
    pub is_nullable: bool,
    pub is_array: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum UnionKind {
    OneOf,
    AnyOf,
}

/// One `oneOf`/`anyOf` occurrence found while walking a schema sub-tree.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnionSite {
    pub kind: UnionKind,
    pub width: usize,
    pub has_discriminator: bool,
    /// Dotted location within the schema tree: `root`, `data`, `items[]`,
    /// `prop.nested`, ...
    pub path: String,
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaNode {
    pub id: String,
    pub property_count: usize,
    pub required_count: usize,
    pub types: Vec<String>,
    pub has_discriminator: bool,
    pub is_nullable: bool,
    /// Properties summed over every inline layer of the sub-tree.
    pub deep_property_count: usize,
    pub nesting_depth: usize,
    pub composition_depth: usize,
    pub union_sites: Vec<UnionSite>,
    pub uses_all_of: bool,
    pub uses_one_of: bool,
    pub uses_any_of: bool,
}

#[derive(Clone, Debug, Default)]
pub struct Graph {
    pub nodes: BTreeMap<String, SchemaNode>,
    pub edges: Vec<Edge>,
    /// Inline sub-schemas encountered during the stats walk.
    pub inline_schemas: usize,
}

impl Graph {
    pub fn outgoing<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.from == id)
    }

    pub fn incoming<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.to == id)
    }
}

pub fn build_graph(tree: &Tree) -> Result<Graph, Error> {
    let root = tree.content_root().ok_or(Error::EmptyTree)?;

    if tree.kind(root) != NodeKind::Mapping {
        return Err(Error::InvalidOpenapiDocument);
    }

    let mut builder = Builder {
        tree,
        graph: Graph::default(),
    };

    let schemas = tree
        .get(root, "components")
        .and_then(|components| tree.get(components, "schemas"))
        .filter(|&schemas| tree.kind(schemas) == NodeKind::Mapping);

    let Some(schemas) = schemas else {
        log::warn!("document has no components.schemas section");
        return Ok(builder.graph);
    };

    // first pass: register every named schema so edge extraction can tell
    // component refs from foreign ones
    for (key, value) in tree.pairs(schemas).unwrap() {
        let Some(name) = tree.scalar_value(*key) else {
            continue;
        };

        builder.register(name, *value);
    }

    // second pass: edges and per-node statistics
    for (key, value) in tree.pairs(schemas).unwrap() {
        let Some(name) = tree.scalar_value(*key) else {
            continue;
        };

        let name = name.to_string();
        builder.extract_edges(&name, *value, &mut HashSet::new(), false);
        builder.collect_stats(&name, *value);
    }

    Ok(builder.graph)
}

struct Builder<'a> {
    tree: &'a Tree,
    graph: Graph,
}

impl<'a> Builder<'a> {
    fn register(&mut self, name: &str, schema: NodeId) {
        let tree = self.tree;
        let types = types_of(tree, schema);

        let node = SchemaNode {
            id: name.to_string(),
            property_count: tree
                .get(schema, "properties")
                .and_then(|p| tree.pairs(p))
                .map(|p| p.len())
                .unwrap_or(0),
            required_count: tree
                .get(schema, "required")
                .and_then(|r| tree.items(r))
                .map(|r| r.len())
                .unwrap_or(0),
            has_discriminator: tree.get(schema, "discriminator").is_some(),
            is_nullable: is_nullable(tree, schema),
            types,
            ..SchemaNode::default()
        };

        self.graph.nodes.insert(name.to_string(), node);
    }

    /// Reference discovery: typed edges for `$ref` children, recursion into
    /// inline sub-schemas. The visited set guards self-referential shapes.
    /// `items_handled` suppresses the plain items edge when the caller
    /// already emitted a field-carrying one for this schema.
    fn extract_edges(
        &mut self,
        owner: &str,
        schema: NodeId,
        visited: &mut HashSet<NodeId>,
        items_handled: bool,
    ) {
        let tree = self.tree;

        if tree.kind(schema) != NodeKind::Mapping || !visited.insert(schema) {
            return;
        }

        let required: HashSet<String> = tree
            .get(schema, "required")
            .and_then(|r| tree.items(r))
            .map(|items| {
                items
                    .iter()
                    .filter_map(|&i| tree.scalar_value(i))
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default();

        if let Some(props) = tree.get(schema, "properties") {
            let pairs = tree.pairs(props).map(|p| p.to_vec()).unwrap_or_default();

            for (key, prop) in pairs {
                let Some(field) = tree.scalar_value(key) else {
                    continue;
                };
                let field = field.to_string();

                if let Some(to) = self.ref_target(prop) {
                    self.push_edge(Edge {
                        from: owner.to_string(),
                        to,
                        kind: EdgeKind::Property,
                        field_name: Some(field.clone()),
                        is_required: required.contains(&field),
                        is_nullable: is_nullable(tree, prop),
                        is_array: false,
                        index: None,
                    });
                    continue;
                }

                // an inline array property referencing a component through
                // `items` keeps the containing field's name on the edge
                let mut handled = false;
                if let Some(items) = tree.get(prop, "items") {
                    if let Some(to) = self.ref_target(items) {
                        self.push_edge(Edge {
                            from: owner.to_string(),
                            to,
                            kind: EdgeKind::Items,
                            field_name: Some(field.clone()),
                            is_required: required.contains(&field),
                            is_nullable: is_nullable(tree, prop),
                            is_array: true,
                            index: None,
                        });
                        handled = true;
                    }
                }

                self.extract_edges(owner, prop, visited, handled);
            }
        }

        for (keyword, kind) in [
            ("items", EdgeKind::Items),
            ("additionalProperties", EdgeKind::AdditionalProperties),
            ("not", EdgeKind::Not),
            ("if", EdgeKind::If),
            ("then", EdgeKind::Then),
            ("else", EdgeKind::Else),
        ] {
            if kind == EdgeKind::Items && items_handled {
                continue;
            }

            if let Some(child) = tree.get(schema, keyword) {
                if let Some(to) = self.ref_target(child) {
                    self.push_edge(Edge {
                        from: owner.to_string(),
                        to,
                        kind,
                        field_name: None,
                        is_required: false,
                        is_nullable: false,
                        is_array: kind == EdgeKind::Items,
                        index: None,
                    });
                } else {
                    self.extract_edges(owner, child, visited, false);
                }
            }
        }

        for (keyword, kind) in [
            ("allOf", EdgeKind::AllOf),
            ("oneOf", EdgeKind::OneOf),
            ("anyOf", EdgeKind::AnyOf),
            ("prefixItems", EdgeKind::PrefixItems),
        ] {
            if let Some(list) = tree.get(schema, keyword) {
                let items = tree.items(list).map(|i| i.to_vec()).unwrap_or_default();

                for (i, element) in items.into_iter().enumerate() {
                    if let Some(to) = self.ref_target(element) {
                        self.push_edge(Edge {
                            from: owner.to_string(),
                            to,
                            kind,
                            field_name: None,
                            is_required: false,
                            is_nullable: false,
                            is_array: false,
                            index: Some(i),
                        });
                    } else {
                        self.extract_edges(owner, element, visited, false);
                    }
                }
            }
        }

        if let Some(deps) = tree.get(schema, "dependentSchemas") {
            let pairs = tree.pairs(deps).map(|p| p.to_vec()).unwrap_or_default();

            for (key, sub) in pairs {
                let field = tree.scalar_value(key).map(|s| s.to_string());

                if let Some(to) = self.ref_target(sub) {
                    self.push_edge(Edge {
                        from: owner.to_string(),
                        to,
                        kind: EdgeKind::Property,
                        field_name: field,
                        is_required: false,
                        is_nullable: false,
                        is_array: false,
                        index: None,
                    });
                } else {
                    self.extract_edges(owner, sub, visited, false);
                }
            }
        }

        if let Some(patterns) = tree.get(schema, "patternProperties") {
            let pairs = tree.pairs(patterns).map(|p| p.to_vec()).unwrap_or_default();

            for (_, sub) in pairs {
                if let Some(to) = self.ref_target(sub) {
                    self.push_edge(Edge {
                        from: owner.to_string(),
                        to,
                        kind: EdgeKind::AdditionalProperties,
                        field_name: None,
                        is_required: false,
                        is_nullable: false,
                        is_array: false,
                        index: None,
                    });
                } else {
                    self.extract_edges(owner, sub, visited, false);
                }
            }
        }
    }

    /// The component name a `$ref` child points to, provided the target is a
    /// registered node. Refs outside `#/components/schemas/` are ignored.
    fn ref_target(&self, schema: NodeId) -> Option<String> {
        let reference = self.tree.get_str(schema, "$ref")?;
        let name = reference.strip_prefix(SCHEMAS_REF_PREFIX)?;

        if !name.contains('/') && self.graph.nodes.contains_key(name) {
            Some(name.to_string())
        } else {
            None
        }
    }

    fn push_edge(&mut self, edge: Edge) {
        self.graph.edges.push(edge);
    }

    /// Shape statistics accumulated over the inline sub-tree only; `$ref`
    /// children are leaves for this walk.
    fn collect_stats(&mut self, name: &str, schema: NodeId) {
        let mut node = self.graph.nodes.get(name).cloned().unwrap_or_default();
        let mut inline = 0usize;
        let mut visited = HashSet::new();

        self.walk_stats(schema, &mut Vec::new(), 0, 0, &mut visited, &mut node, &mut inline);

        // the component root itself is not an inline schema
        self.graph.inline_schemas += inline.saturating_sub(1);
        self.graph.nodes.insert(name.to_string(), node);
    }

    #[allow(clippy::too_many_arguments)]
    fn walk_stats(
        &self,
        schema: NodeId,
        segments: &mut Vec<String>,
        obj_depth: usize,
        comp_depth: usize,
        visited: &mut HashSet<NodeId>,
        node: &mut SchemaNode,
        inline: &mut usize,
    ) {
        let tree = self.tree;

        if tree.kind(schema) != NodeKind::Mapping || !visited.insert(schema) {
            return;
        }
        if tree.get(schema, "$ref").is_some() {
            return;
        }

        *inline += 1;
        node.nesting_depth = node.nesting_depth.max(obj_depth);
        node.composition_depth = node.composition_depth.max(comp_depth);

        if let Some(props) = tree.get(schema, "properties") {
            let pairs = tree.pairs(props).map(|p| p.to_vec()).unwrap_or_default();
            node.deep_property_count += pairs.len();

            for (key, prop) in pairs {
                let Some(field) = tree.scalar_value(key) else {
                    continue;
                };

                let deeper = if is_object_schema(tree, prop) {
                    obj_depth + 1
                } else {
                    obj_depth
                };

                segments.push(field.to_string());
                self.walk_stats(prop, segments, deeper, comp_depth, visited, node, inline);
                segments.pop();
            }
        }

        if let Some(items) = tree.get(schema, "items") {
            let deeper = if is_object_schema(tree, items) {
                obj_depth + 1
            } else {
                obj_depth
            };

            segments.push("items[]".to_string());
            self.walk_stats(items, segments, deeper, comp_depth, visited, node, inline);
            segments.pop();
        }

        if let Some(extra) = tree.get(schema, "additionalProperties") {
            segments.push("additionalProperties".to_string());
            self.walk_stats(extra, segments, obj_depth, comp_depth, visited, node, inline);
            segments.pop();
        }

        if let Some(list) = tree.get(schema, "prefixItems") {
            let items = tree.items(list).map(|i| i.to_vec()).unwrap_or_default();
            for (i, element) in items.into_iter().enumerate() {
                segments.push(format!("prefixItems[{}]", i));
                self.walk_stats(element, segments, obj_depth, comp_depth, visited, node, inline);
                segments.pop();
            }
        }

        for (keyword, union_kind) in [
            ("allOf", None),
            ("oneOf", Some(UnionKind::OneOf)),
            ("anyOf", Some(UnionKind::AnyOf)),
        ] {
            let Some(list) = tree.get(schema, keyword) else {
                continue;
            };
            let items = tree.items(list).map(|i| i.to_vec()).unwrap_or_default();

            match union_kind {
                None => node.uses_all_of = true,
                Some(UnionKind::OneOf) => node.uses_one_of = true,
                Some(UnionKind::AnyOf) => node.uses_any_of = true,
            }

            if let Some(kind) = union_kind {
                node.union_sites.push(UnionSite {
                    kind,
                    width: items.len(),
                    has_discriminator: tree.get(schema, "discriminator").is_some(),
                    path: dotted(segments),
                });
            }

            for (i, element) in items.into_iter().enumerate() {
                segments.push(format!("{}[{}]", keyword, i));
                self.walk_stats(
                    element,
                    segments,
                    obj_depth,
                    comp_depth + 1,
                    visited,
                    node,
                    inline,
                );
                segments.pop();
            }
        }
    }
}

fn dotted(segments: &[String]) -> String {
    if segments.is_empty() {
        "root".to_string()
    } else {
        segments.join(".")
    }
}

fn types_of(tree: &Tree, schema: NodeId) -> Vec<String> {
    match tree.get(schema, "type") {
        Some(node) => match tree.kind(node) {
            NodeKind::Scalar => vec![tree.scalar_value(node).unwrap().to_string()],
            NodeKind::Sequence => tree
                .items(node)
                .unwrap()
                .iter()
                .filter_map(|&i| tree.scalar_value(i))
                .map(|s| s.to_string())
                .collect(),
            _ => vec![],
        },
        None => vec![],
    }
}

fn is_nullable(tree: &Tree, schema: NodeId) -> bool {
    if tree.kind(schema) != NodeKind::Mapping {
        return false;
    }

    tree.get_str(schema, "nullable") == Some("true")
        || types_of(tree, schema).iter().any(|t| t == "null")
}

fn is_object_schema(tree: &Tree, schema: NodeId) -> bool {
    tree.kind(schema) == NodeKind::Mapping
        && (tree.get(schema, "properties").is_some()
            || types_of(tree, schema).iter().any(|t| t == "object"))
}
