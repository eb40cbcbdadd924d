//! Structure-preserving document tree.
//!
//! Nodes live in an arena owned by [`Tree`]; a [`NodeId`] is a stable
//! identity handle, distinct from structural equality. Mappings are ordered
//! key/value pair lists, not hash tables, so insertion order, duplicate keys
//! and merge ordering behave like the source documents they were parsed from.

use std::collections::HashMap;

pub mod convert;

/// Stable identity of a node within its owning [`Tree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Mapping,
    Sequence,
    Scalar,
    Alias,
}

impl NodeKind {
    /// Kind name used in user-facing diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Document => "document",
            NodeKind::Mapping => "object",
            NodeKind::Sequence => "array",
            NodeKind::Scalar => "scalar",
            NodeKind::Alias => "alias",
        }
    }
}

/// Original presentation style of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Style {
    #[default]
    Plain,
    SingleQuoted,
    DoubleQuoted,
    Literal,
    Folded,
    Block,
    Flow,
}

pub mod tag {
    pub const STR: &str = "!!str";
    pub const INT: &str = "!!int";
    pub const FLOAT: &str = "!!float";
    pub const BOOL: &str = "!!bool";
    pub const NULL: &str = "!!null";
    pub const MAP: &str = "!!map";
    pub const SEQ: &str = "!!seq";
}

#[derive(Clone, Debug)]
pub enum Content {
    /// Exactly one content child.
    Document(NodeId),
    /// Ordered (key, value) pairs. Duplicate keys are retained structurally;
    /// lookups resolve last-wins.
    Mapping(Vec<(NodeId, NodeId)>),
    Sequence(Vec<NodeId>),
    Scalar(String),
    /// Reference to another node by anchor. Does not own its referent.
    Alias(String),
}

#[derive(Clone, Debug)]
pub struct Node {
    pub content: Content,
    pub tag: String,
    pub style: Style,
    pub anchor: Option<String>,
    pub head_comment: Option<String>,
    pub line_comment: Option<String>,
    pub foot_comment: Option<String>,
}

impl Node {
    fn new(content: Content, tag: &str, style: Style) -> Self {
        Self {
            content,
            tag: tag.to_string(),
            style,
            anchor: None,
            head_comment: None,
            line_comment: None,
            foot_comment: None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Tree {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn scalar(&mut self, value: impl Into<String>, tag: &str) -> NodeId {
        self.push(Node::new(Content::Scalar(value.into()), tag, Style::Plain))
    }

    pub fn sequence(&mut self, items: Vec<NodeId>) -> NodeId {
        self.push(Node::new(Content::Sequence(items), tag::SEQ, Style::Block))
    }

    pub fn mapping(&mut self, pairs: Vec<(NodeId, NodeId)>) -> NodeId {
        self.push(Node::new(Content::Mapping(pairs), tag::MAP, Style::Block))
    }

    pub fn alias(&mut self, anchor: impl Into<String>) -> NodeId {
        self.push(Node::new(Content::Alias(anchor.into()), "", Style::Plain))
    }

    /// Wraps `content` into a document node and makes it the tree root.
    pub fn document(&mut self, content: NodeId) -> NodeId {
        let id = self.push(Node::new(Content::Document(content), "", Style::Block));
        self.root = Some(id);
        id
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// The single content child of the root document node. Trees built
    /// without a document wrapper return the root itself.
    pub fn content_root(&self) -> Option<NodeId> {
        self.root.map(|id| match self.nodes[id.0].content {
            Content::Document(content) => content,
            _ => id,
        })
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        match self.nodes[id.0].content {
            Content::Document(_) => NodeKind::Document,
            Content::Mapping(_) => NodeKind::Mapping,
            Content::Sequence(_) => NodeKind::Sequence,
            Content::Scalar(_) => NodeKind::Scalar,
            Content::Alias(_) => NodeKind::Alias,
        }
    }

    pub fn scalar_value(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].content {
            Content::Scalar(value) => Some(value),
            _ => None,
        }
    }

    pub fn pairs(&self, id: NodeId) -> Option<&[(NodeId, NodeId)]> {
        match &self.nodes[id.0].content {
            Content::Mapping(pairs) => Some(pairs),
            _ => None,
        }
    }

    pub fn items(&self, id: NodeId) -> Option<&[NodeId]> {
        match &self.nodes[id.0].content {
            Content::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Mapping lookup by scalar key, preserving the ordered-pairs semantics:
    /// a linear scan where the last occurrence of a duplicate key wins.
    pub fn get(&self, mapping: NodeId, key: &str) -> Option<NodeId> {
        self.get_entry(mapping, key).map(|(_, _, value)| value)
    }

    /// Like [`Tree::get`] but returns (pair index, key node, value node).
    pub fn get_entry(&self, mapping: NodeId, key: &str) -> Option<(usize, NodeId, NodeId)> {
        let pairs = self.pairs(mapping)?;
        pairs
            .iter()
            .enumerate()
            .rev()
            .find(|(_, (k, _))| self.scalar_value(*k) == Some(key))
            .map(|(i, (k, v))| (i, *k, *v))
    }

    /// Scalar string value of a mapping entry, if present.
    pub fn get_str(&self, mapping: NodeId, key: &str) -> Option<&str> {
        self.get(mapping, key).and_then(|v| self.scalar_value(v))
    }

    pub fn push_pair(&mut self, mapping: NodeId, key: NodeId, value: NodeId) {
        if let Content::Mapping(pairs) = &mut self.nodes[mapping.0].content {
            pairs.push((key, value));
        }
    }

    pub fn remove_pair_at(&mut self, mapping: NodeId, index: usize) {
        if let Content::Mapping(pairs) = &mut self.nodes[mapping.0].content {
            pairs.remove(index);
        }
    }

    pub fn push_item(&mut self, sequence: NodeId, item: NodeId) {
        if let Content::Sequence(items) = &mut self.nodes[sequence.0].content {
            items.push(item);
        }
    }

    pub fn remove_item_at(&mut self, sequence: NodeId, index: usize) {
        if let Content::Sequence(items) = &mut self.nodes[sequence.0].content {
            items.remove(index);
        }
    }

    /// Deep-clones the subtree under `id` into this arena. The clone is
    /// structurally equal to the original and shares no node identity with it.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let mut node = self.nodes[id.0].clone();

        node.content = match node.content {
            Content::Document(content) => Content::Document(self.deep_clone(content)),
            Content::Mapping(pairs) => Content::Mapping(
                pairs
                    .into_iter()
                    .map(|(k, v)| (self.deep_clone(k), self.deep_clone(v)))
                    .collect(),
            ),
            Content::Sequence(items) => {
                Content::Sequence(items.into_iter().map(|i| self.deep_clone(i)).collect())
            }
            scalar_or_alias => scalar_or_alias,
        };

        self.push(node)
    }

    /// Deep-copies the subtree under `id` in `src` into this arena.
    pub fn import(&mut self, src: &Tree, id: NodeId) -> NodeId {
        let mut node = src.nodes[id.0].clone();

        node.content = match node.content {
            Content::Document(content) => Content::Document(self.import(src, content)),
            Content::Mapping(pairs) => Content::Mapping(
                pairs
                    .into_iter()
                    .map(|(k, v)| (self.import(src, k), self.import(src, v)))
                    .collect(),
            ),
            Content::Sequence(items) => {
                Content::Sequence(items.into_iter().map(|i| self.import(src, i)).collect())
            }
            scalar_or_alias => scalar_or_alias,
        };

        self.push(node)
    }

    /// Order-sensitive structural comparison of two subtrees, possibly in
    /// different arenas. Style, comments and anchors are presentation
    /// metadata and do not participate.
    pub fn structural_eq(&self, a: NodeId, other: &Tree, b: NodeId) -> bool {
        let left = &self.nodes[a.0];
        let right = &other.nodes[b.0];

        match (&left.content, &right.content) {
            (Content::Document(ac), Content::Document(bc)) => {
                self.structural_eq(*ac, other, *bc)
            }
            (Content::Scalar(av), Content::Scalar(bv)) => av == bv && left.tag == right.tag,
            (Content::Alias(aa), Content::Alias(ba)) => aa == ba,
            (Content::Sequence(ai), Content::Sequence(bi)) => {
                ai.len() == bi.len()
                    && ai
                        .iter()
                        .zip(bi.iter())
                        .all(|(x, y)| self.structural_eq(*x, other, *y))
            }
            (Content::Mapping(ap), Content::Mapping(bp)) => {
                ap.len() == bp.len()
                    && ap.iter().zip(bp.iter()).all(|((ak, av), (bk, bv))| {
                        self.structural_eq(*ak, other, *bk) && self.structural_eq(*av, other, *bv)
                    })
            }
            _ => false,
        }
    }

    /// Identity-keyed child → parent map built by a single downward pass
    /// from the root. Mapping keys and values both map to the mapping node.
    /// Aliases have no children and never own their referent.
    pub fn parent_index(&self) -> HashMap<NodeId, NodeId> {
        let mut index = HashMap::new();
        let Some(root) = self.root else {
            return index;
        };

        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            match &self.nodes[id.0].content {
                Content::Document(content) => {
                    index.insert(*content, id);
                    stack.push(*content);
                }
                Content::Mapping(pairs) => {
                    for (k, v) in pairs {
                        index.insert(*k, id);
                        index.insert(*v, id);
                        stack.push(*k);
                        stack.push(*v);
                    }
                }
                Content::Sequence(items) => {
                    for item in items {
                        index.insert(*item, id);
                        stack.push(*item);
                    }
                }
                Content::Scalar(_) | Content::Alias(_) => {}
            }
        }

        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mapping_lookup_preserves_order_and_duplicates() {
        let mut tree = Tree::new();
        let k1 = tree.scalar("name", tag::STR);
        let v1 = tree.scalar("first", tag::STR);
        let k2 = tree.scalar("name", tag::STR);
        let v2 = tree.scalar("second", tag::STR);
        let map = tree.mapping(vec![(k1, v1), (k2, v2)]);

        let found = tree.get(map, "name").unwrap();
        assert_eq!(tree.scalar_value(found), Some("second"));
        assert_eq!(tree.pairs(map).unwrap().len(), 2);
    }

    #[test]
    fn test_deep_clone_is_structurally_equal_with_disjoint_identity() {
        let mut tree = Tree::from_json_value(&json!({
            "info": { "title": "x" },
            "tags": [ "a", "b" ]
        }));

        let original = tree.content_root().unwrap();
        let clone = tree.deep_clone(original);

        assert_ne!(original, clone);
        let snapshot = tree.clone();
        assert!(snapshot.structural_eq(original, &snapshot, clone));

        // every node in the cloned subtree is a fresh identity
        let mut originals = vec![original];
        let mut seen = std::collections::HashSet::new();
        while let Some(id) = originals.pop() {
            seen.insert(id);
            match &tree.node(id).content {
                Content::Mapping(pairs) => {
                    for (k, v) in pairs {
                        originals.push(*k);
                        originals.push(*v);
                    }
                }
                Content::Sequence(items) => originals.extend(items.iter().copied()),
                _ => {}
            }
        }
        let mut clones = vec![clone];
        while let Some(id) = clones.pop() {
            assert!(!seen.contains(&id));
            match &tree.node(id).content {
                Content::Mapping(pairs) => {
                    for (k, v) in pairs {
                        clones.push(*k);
                        clones.push(*v);
                    }
                }
                Content::Sequence(items) => clones.extend(items.iter().copied()),
                _ => {}
            }
        }
    }

    #[test]
    fn test_structural_eq_is_order_sensitive() {
        let a = Tree::from_json_value(&json!({ "x": 1, "y": 2 }));
        let b = Tree::from_json_value(&json!({ "y": 2, "x": 1 }));
        let c = Tree::from_json_value(&json!({ "x": 1, "y": 2 }));

        let ar = a.content_root().unwrap();
        let br = b.content_root().unwrap();
        let cr = c.content_root().unwrap();

        assert!(!a.structural_eq(ar, &b, br));
        assert!(a.structural_eq(ar, &c, cr));
    }

    #[test]
    fn test_structural_eq_distinguishes_tags() {
        let mut a = Tree::new();
        let x = a.scalar("1", tag::INT);
        let mut b = Tree::new();
        let y = b.scalar("1", tag::STR);

        assert!(!a.structural_eq(x, &b, y));
        let _ = (x, y);
    }

    #[test]
    fn test_parent_index_covers_keys_values_and_items() {
        let tree = Tree::from_json_value(&json!({ "tags": [ { "name": "a" } ] }));
        let root = tree.content_root().unwrap();
        let parents = tree.parent_index();

        let (_, tags_key, tags_value) = tree.get_entry(root, "tags").unwrap();
        assert_eq!(parents.get(&tags_key), Some(&root));
        assert_eq!(parents.get(&tags_value), Some(&root));

        let element = tree.items(tags_value).unwrap()[0];
        assert_eq!(parents.get(&element), Some(&tags_value));

        let (_, name_key, name_value) = tree.get_entry(element, "name").unwrap();
        assert_eq!(parents.get(&name_key), Some(&element));
        assert_eq!(parents.get(&name_value), Some(&element));
    }

    #[test]
    fn test_document_root_unwraps_to_content() {
        let tree = Tree::from_json_value(&json!({ "a": 1 }));
        let root = tree.root().unwrap();
        let content = tree.content_root().unwrap();

        assert_eq!(tree.kind(root), NodeKind::Document);
        assert_eq!(tree.kind(content), NodeKind::Mapping);
    }
}
