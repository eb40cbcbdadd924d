//! Merge semantics for update and copy actions.
//!
//! Overlay 1.0.0 applies one recursive rule set everywhere. Overlay 1.1.0
//! dispatches differently at the top level of an action (sequences absorb
//! non-sequence updates as appended elements, kind mismatches are errors in
//! strict mode) and keeps the 1.0.0 object rules for recursion.
//!
//! All functions operate within a single arena: callers import the update
//! sub-tree into the target tree first. Update nodes are only read and
//! cloned, never linked into the target document.

use crate::error::Error;
use crate::tree::{NodeId, NodeKind, Style, Tree};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeVersion {
    V1_0,
    V1_1,
}

/// Merges `update` into `target` at the top level of an action. Returns
/// whether the target was structurally changed.
pub fn merge_top(
    tree: &mut Tree,
    target: NodeId,
    update: NodeId,
    version: MergeVersion,
    strict: bool,
) -> Result<bool, Error> {
    match version {
        MergeVersion::V1_0 => merge_v1(tree, target, update),
        MergeVersion::V1_1 => {
            match (tree.kind(target), tree.kind(update)) {
                (NodeKind::Sequence, NodeKind::Sequence) => Ok(concat(tree, target, update)),
                (NodeKind::Sequence, _) => {
                    // a mapping or scalar update appends as one element
                    let clone = tree.deep_clone(update);
                    tree.push_item(target, clone);
                    Ok(true)
                }
                (NodeKind::Mapping, NodeKind::Mapping) => {
                    object_merge(tree, target, update, MergeVersion::V1_1, strict)
                }
                (NodeKind::Scalar, NodeKind::Scalar) => Ok(copy_scalar(tree, target, update)),
                (t, u) => {
                    if strict {
                        Err(Error::MergeTypeMismatch {
                            target: t.label(),
                            update: u.label(),
                        })
                    } else {
                        Ok(replace(tree, target, update))
                    }
                }
            }
        }
    }
}

/// Overlay 1.0.0 rules, used at every level.
fn merge_v1(tree: &mut Tree, target: NodeId, update: NodeId) -> Result<bool, Error> {
    match (tree.kind(target), tree.kind(update)) {
        (NodeKind::Scalar, NodeKind::Scalar) => Ok(copy_scalar(tree, target, update)),
        (NodeKind::Mapping, NodeKind::Mapping) => {
            object_merge(tree, target, update, MergeVersion::V1_0, false)
        }
        (NodeKind::Sequence, NodeKind::Sequence) => Ok(concat(tree, target, update)),
        _ => Ok(replace(tree, target, update)),
    }
}

/// The shared recursive object merge: keys present in the target recurse,
/// missing keys append in update order.
fn object_merge(
    tree: &mut Tree,
    target: NodeId,
    update: NodeId,
    version: MergeVersion,
    strict: bool,
) -> Result<bool, Error> {
    let update_pairs: Vec<(NodeId, NodeId)> = tree
        .pairs(update)
        .map(|pairs| pairs.to_vec())
        .unwrap_or_default();

    let was_empty_flow = tree.pairs(target).is_some_and(|p| p.is_empty())
        && tree.node(target).style == Style::Flow;

    let mut changed = false;

    for (update_key, update_value) in update_pairs.iter().copied() {
        let key = tree.scalar_value(update_key).map(|s| s.to_string());

        let existing = key
            .as_deref()
            .and_then(|key| tree.get_entry(target, key))
            .map(|(_, _, value)| value);

        match existing {
            Some(target_value) => match version {
                MergeVersion::V1_0 => {
                    changed |= merge_v1(tree, target_value, update_value)?;
                }
                MergeVersion::V1_1 => {
                    match (tree.kind(target_value), tree.kind(update_value)) {
                        (NodeKind::Mapping, NodeKind::Mapping) => {
                            changed |=
                                object_merge(tree, target_value, update_value, version, strict)?;
                        }
                        (NodeKind::Sequence, NodeKind::Sequence) => {
                            changed |= concat(tree, target_value, update_value);
                        }
                        (NodeKind::Scalar, NodeKind::Scalar) => {
                            changed |= copy_scalar(tree, target_value, update_value);
                        }
                        (t, u) => {
                            if strict {
                                return Err(Error::MergeKeyTypeMismatch {
                                    key: key.unwrap_or_default(),
                                    target: t.label(),
                                    update: u.label(),
                                });
                            }
                            changed |= replace(tree, target_value, update_value);
                        }
                    }
                }
            },
            None => {
                let k = tree.deep_clone(update_key);
                let v = tree.deep_clone(update_value);
                tree.push_pair(target, k, v);
                changed = true;
            }
        }
    }

    // an empty flow mapping receiving content renders as block from now on
    if was_empty_flow && !update_pairs.is_empty() {
        tree.node_mut(target).style = Style::Block;
    }

    Ok(changed)
}

/// Concatenates clones of the update's elements onto the target sequence.
fn concat(tree: &mut Tree, target: NodeId, update: NodeId) -> bool {
    let items: Vec<NodeId> = tree
        .items(update)
        .map(|items| items.to_vec())
        .unwrap_or_default();

    for item in &items {
        let clone = tree.deep_clone(*item);
        tree.push_item(target, clone);
    }

    !items.is_empty()
}

/// Copies value and tag from the update scalar; the target keeps its style,
/// anchor and comments.
fn copy_scalar(tree: &mut Tree, target: NodeId, update: NodeId) -> bool {
    let value = tree.scalar_value(update).unwrap_or("").to_string();
    let tag = tree.node(update).tag.clone();

    let node = tree.node(target);
    let changed = tree.scalar_value(target) != Some(value.as_str()) || node.tag != tag;

    let node = tree.node_mut(target);
    node.content = crate::tree::Content::Scalar(value);
    node.tag = tag;

    changed
}

/// Replaces the target with a deep clone of the update, keeping the target's
/// node identity and comments.
fn replace(tree: &mut Tree, target: NodeId, update: NodeId) -> bool {
    let snapshot: &Tree = tree;
    let changed = !snapshot.structural_eq(target, snapshot, update);

    let clone = tree.deep_clone(update);
    let cloned = tree.node(clone).clone();

    let node = tree.node_mut(target);
    node.content = cloned.content;
    node.tag = cloned.tag;
    node.style = cloned.style;
    node.anchor = cloned.anchor;

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::tag;
    use serde_json::json;

    /// Builds a target tree and imports the update payload into the same
    /// arena, mirroring what the apply engine does.
    fn setup(target: serde_json::Value, update: serde_json::Value) -> (Tree, NodeId, NodeId) {
        let mut tree = Tree::from_json_value(&target);
        let update_tree = Tree::from_json_value(&update);
        let update_root = update_tree.content_root().unwrap();
        let imported = tree.import(&update_tree, update_root);
        let root = tree.content_root().unwrap();
        (tree, root, imported)
    }

    fn as_json(tree: &Tree, id: NodeId) -> serde_json::Value {
        tree.to_json_value(id)
    }

    #[test]
    fn test_v1_object_merge_recurses_and_appends() {
        let (mut tree, target, update) = setup(
            json!({ "info": { "title": "old", "version": "1" } }),
            json!({ "info": { "title": "new", "contact": { "name": "x" } } }),
        );

        let changed = merge_top(&mut tree, target, update, MergeVersion::V1_0, false).unwrap();

        assert!(changed);
        assert_eq!(
            as_json(&tree, target),
            json!({ "info": { "title": "new", "version": "1", "contact": { "name": "x" } } })
        );
    }

    #[test]
    fn test_v1_kind_mismatch_replaces() {
        let (mut tree, target, update) = setup(json!([1, 2]), json!({ "a": 1 }));

        let changed = merge_top(&mut tree, target, update, MergeVersion::V1_0, false).unwrap();

        assert!(changed);
        assert_eq!(as_json(&tree, target), json!({ "a": 1 }));
    }

    #[test]
    fn test_v1_sequences_concatenate() {
        let (mut tree, target, update) = setup(json!([1]), json!([2, 3]));

        merge_top(&mut tree, target, update, MergeVersion::V1_0, false).unwrap();

        assert_eq!(as_json(&tree, target), json!([1, 2, 3]));
    }

    #[test]
    fn test_v1_1_sequence_absorbs_mapping_as_element() {
        let (mut tree, target, update) = setup(
            json!([{ "name": "existing" }]),
            json!({ "name": "newTag", "description": "appended" }),
        );

        let changed = merge_top(&mut tree, target, update, MergeVersion::V1_1, false).unwrap();

        assert!(changed);
        assert_eq!(
            as_json(&tree, target),
            json!([
                { "name": "existing" },
                { "name": "newTag", "description": "appended" }
            ])
        );
    }

    #[test]
    fn test_v1_1_top_level_mismatch_is_strict_error() {
        let (mut tree, target, update) = setup(json!({ "a": 1 }), json!([1]));

        let result = merge_top(&mut tree, target, update, MergeVersion::V1_1, true);

        match result {
            Err(Error::MergeTypeMismatch { target, update }) => {
                assert_eq!(target, "object");
                assert_eq!(update, "array");
            }
            other => panic!("expected type mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_v1_1_top_level_mismatch_replaces_in_lax_mode() {
        let (mut tree, target, update) = setup(json!({ "a": 1 }), json!([1]));

        let changed = merge_top(&mut tree, target, update, MergeVersion::V1_1, false).unwrap();

        assert!(changed);
        assert_eq!(as_json(&tree, target), json!([1]));
    }

    #[test]
    fn test_v1_1_nested_mismatch_names_the_key() {
        let (mut tree, target, update) = setup(
            json!({ "servers": { "url": "x" } }),
            json!({ "servers": [1] }),
        );

        let result = merge_top(&mut tree, target, update, MergeVersion::V1_1, true);

        match result {
            Err(Error::MergeKeyTypeMismatch {
                key,
                target,
                update,
            }) => {
                assert_eq!(key, "servers");
                assert_eq!(target, "object");
                assert_eq!(update, "array");
            }
            other => panic!("expected key type mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_v1_1_nested_mismatch_error_message_format() {
        let err = Error::MergeKeyTypeMismatch {
            key: "k".to_string(),
            target: "scalar",
            update: "object",
        };

        assert_eq!(
            err.to_string(),
            "key \"k\": type mismatch: target is scalar but update is object"
        );
    }

    #[test]
    fn test_scalar_merge_preserves_style_and_copies_tag() {
        let (mut tree, target, update) = setup(json!({ "a": "old" }), json!({ "a": 12 }));

        merge_top(&mut tree, target, update, MergeVersion::V1_1, true).unwrap();

        let a = tree.get(tree.content_root().unwrap(), "a").unwrap();
        assert_eq!(tree.scalar_value(a), Some("12"));
        assert_eq!(tree.node(a).tag, tag::INT);
    }

    #[test]
    fn test_unchanged_merge_reports_no_change() {
        let (mut tree, target, update) = setup(
            json!({ "info": { "title": "same" } }),
            json!({ "info": { "title": "same" } }),
        );

        let changed = merge_top(&mut tree, target, update, MergeVersion::V1_1, false).unwrap();

        assert!(!changed);
    }

    #[test]
    fn test_empty_flow_mapping_switches_to_block() {
        let (mut tree, target, update) = setup(json!({ "info": {} }), json!({ "info": { "a": 1 } }));

        let info = tree.get(target, "info").unwrap();
        tree.node_mut(info).style = Style::Flow;

        merge_top(&mut tree, target, update, MergeVersion::V1_0, false).unwrap();

        assert_eq!(tree.node(info).style, Style::Block);
        assert_eq!(as_json(&tree, info), json!({ "a": 1 }));
    }
}
