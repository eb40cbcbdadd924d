//! Synthesizes an overlay from two versions of a document: applying the
//! result to the first tree yields the second.
//!
//! The diff is structural: mapping additions become updates on the
//! enclosing mapping, deletions become removes, scalar edits become updates
//! at the deepest differing path, and a changed sequence is replaced
//! wholesale at its key (fine-grained element diffing is out of scope).
//! Targets are emitted in bracket-quoted rfc 9535 form so keys containing
//! slashes or quotes survive.

use crate::error::Error;
use crate::tree::{NodeId, NodeKind, Tree};

use super::{Action, Info, Overlay};

pub fn compare(before: &Tree, after: &Tree) -> Result<Overlay, Error> {
    let before_root = before.content_root().ok_or(Error::EmptyTree)?;
    let after_root = after.content_root().ok_or(Error::EmptyTree)?;

    let mut ctx = Context {
        before,
        after,
        payloads: Tree::new(),
        actions: Vec::new(),
    };

    ctx.diff(before_root, after_root, &mut Vec::new());

    Ok(Overlay {
        tree: ctx.payloads,
        version: "1.1.0".to_string(),
        jsonpath_mode: None,
        info: Info {
            title: "generated overlay".to_string(),
            version: "0.0.0".to_string(),
            description: None,
        },
        extends: None,
        actions: ctx.actions,
    })
}

struct Context<'a> {
    before: &'a Tree,
    after: &'a Tree,
    /// Arena holding the update payloads of the generated actions.
    payloads: Tree,
    actions: Vec<Action>,
}

impl<'a> Context<'a> {
    fn diff(&mut self, b: NodeId, a: NodeId, path: &mut Vec<String>) {
        match (self.before.kind(b), self.after.kind(a)) {
            (NodeKind::Mapping, NodeKind::Mapping) => self.diff_mappings(b, a, path),
            (NodeKind::Scalar, NodeKind::Scalar) => {
                let same = self.before.scalar_value(b) == self.after.scalar_value(a)
                    && self.before.node(b).tag == self.after.node(a).tag;
                if !same {
                    self.update_at(path, a);
                }
            }
            (NodeKind::Sequence, NodeKind::Sequence) => {
                if !self.before.structural_eq(b, self.after, a) {
                    self.replace_at(path, a);
                }
            }
            _ => {
                if !self.before.structural_eq(b, self.after, a) {
                    self.replace_at(path, a);
                }
            }
        }
    }

    fn diff_mappings(&mut self, b: NodeId, a: NodeId, path: &mut Vec<String>) {
        // duplicate keys resolve last-wins on both sides
        let before_keys = effective_keys(self.before, b);
        let after_keys = effective_keys(self.after, a);

        for (key, _) in &before_keys {
            if !after_keys.iter().any(|(k, _)| k == key) {
                path.push(key.clone());
                self.actions.push(Action {
                    target: path_expr(path),
                    description: None,
                    remove: true,
                    ..Action::default()
                });
                path.pop();
            }
        }

        for (key, a_value) in &after_keys {
            match before_keys.iter().find(|(k, _)| k == key) {
                Some((_, b_value)) => {
                    path.push(key.clone());
                    self.diff(*b_value, *a_value, path);
                    path.pop();
                }
                None => {
                    // addition: update on the enclosing mapping
                    let value = self.payloads.import(self.after, *a_value);
                    let key_node = self.payloads.scalar(key, crate::tree::tag::STR);
                    let update = self.payloads.mapping(vec![(key_node, value)]);

                    self.actions.push(Action {
                        target: path_expr(path),
                        description: None,
                        update: Some(update),
                        ..Action::default()
                    });
                }
            }
        }
    }

    /// Scalar-level update at the deepest differing path.
    fn update_at(&mut self, path: &[String], a: NodeId) {
        let update = self.payloads.import(self.after, a);
        self.actions.push(Action {
            target: path_expr(path),
            description: None,
            update: Some(update),
            ..Action::default()
        });
    }

    /// Replacement: remove the old node, then re-add the new content under
    /// its key on the enclosing mapping. A changed root sequence empties
    /// through `$[*]` and refills by concatenation.
    fn replace_at(&mut self, path: &[String], a: NodeId) {
        match path.last() {
            Some(key) => {
                self.actions.push(Action {
                    target: path_expr(path),
                    description: None,
                    remove: true,
                    ..Action::default()
                });

                let value = self.payloads.import(self.after, a);
                let key_node = self.payloads.scalar(key, crate::tree::tag::STR);
                let update = self.payloads.mapping(vec![(key_node, value)]);

                self.actions.push(Action {
                    target: path_expr(&path[..path.len() - 1]),
                    description: None,
                    update: Some(update),
                    ..Action::default()
                });
            }
            None => {
                if self.after.kind(a) == NodeKind::Sequence {
                    self.actions.push(Action {
                        target: "$[*]".to_string(),
                        description: None,
                        remove: true,
                        ..Action::default()
                    });
                }

                let update = self.payloads.import(self.after, a);
                self.actions.push(Action {
                    target: "$".to_string(),
                    description: None,
                    update: Some(update),
                    ..Action::default()
                });
            }
        }
    }
}

/// Ordered (key, value) view of a mapping with duplicate keys collapsed to
/// their last occurrence.
fn effective_keys(tree: &Tree, mapping: NodeId) -> Vec<(String, NodeId)> {
    let pairs = tree.pairs(mapping).unwrap_or(&[]);
    let mut out: Vec<(String, NodeId)> = Vec::new();

    for (k, v) in pairs {
        let Some(key) = tree.scalar_value(*k) else {
            continue;
        };

        match out.iter_mut().find(|(existing, _)| existing == key) {
            Some(entry) => entry.1 = *v,
            None => out.push((key.to_string(), *v)),
        }
    }

    out
}

/// Bracket-quoted rfc 9535 path: `$["components"]["schemas"]["A/B"]`.
fn path_expr(path: &[String]) -> String {
    let mut expr = String::from("$");
    for part in path {
        let escaped = part.replace('\\', "\\\\").replace('"', "\\\"");
        expr.push_str(&format!("[\"{}\"]", escaped));
    }
    expr
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::apply::apply;
    use serde_json::json;

    fn round_trip(before: serde_json::Value, after: serde_json::Value) {
        let before_tree = Tree::from_json_value(&before);
        let after_tree = Tree::from_json_value(&after);

        let overlay = compare(&before_tree, &after_tree).unwrap();

        let mut patched = before_tree.clone();
        apply(&overlay, &mut patched).unwrap();

        assert!(
            patched.structural_eq(
                patched.content_root().unwrap(),
                &after_tree,
                after_tree.content_root().unwrap()
            ),
            "round trip mismatch:\n  got: {}\n  want: {}",
            patched.to_json_value(patched.root().unwrap()),
            after_tree.to_json_value(after_tree.root().unwrap()),
        );
    }

    #[test]
    fn test_identical_documents_produce_no_actions() {
        let doc = Tree::from_json_value(&json!({ "info": { "title": "t" } }));

        let overlay = compare(&doc, &doc).unwrap();

        assert!(overlay.actions.is_empty());
    }

    #[test]
    fn test_scalar_change_targets_deepest_path() {
        let before = Tree::from_json_value(&json!({ "info": { "title": "old" } }));
        let after = Tree::from_json_value(&json!({ "info": { "title": "new" } }));

        let overlay = compare(&before, &after).unwrap();

        assert_eq!(overlay.actions.len(), 1);
        assert_eq!(overlay.actions[0].target, "$[\"info\"][\"title\"]");
        assert!(overlay.actions[0].update.is_some());
    }

    #[test]
    fn test_deletion_becomes_remove() {
        let before = Tree::from_json_value(&json!({ "a": 1, "b": 2 }));
        let after = Tree::from_json_value(&json!({ "a": 1 }));

        let overlay = compare(&before, &after).unwrap();

        assert_eq!(overlay.actions.len(), 1);
        assert!(overlay.actions[0].remove);
        assert_eq!(overlay.actions[0].target, "$[\"b\"]");
    }

    #[test]
    fn test_round_trip_scalar_edit_addition_and_deletion() {
        round_trip(
            json!({
                "openapi": "3.1.0",
                "info": { "title": "api", "version": "1.0.0" },
                "paths": { "/a": { "get": { "operationId": "x" } } }
            }),
            json!({
                "openapi": "3.1.0",
                "info": { "title": "api", "version": "1.1.0" },
                "paths": { "/a": { "get": { "operationId": "y", "deprecated": true } } }
            }),
        );
    }

    #[test]
    fn test_round_trip_sequence_replacement() {
        round_trip(
            json!({ "info": { "x": 1 }, "tags": [ { "name": "a" } ] }),
            json!({ "info": { "x": 1 }, "tags": [ { "name": "b" }, { "name": "c" } ] }),
        );
    }

    #[test]
    fn test_round_trip_kind_change() {
        round_trip(
            json!({ "a": { "servers": "none" } }),
            json!({ "a": { "servers": { "url": "https://x" } } }),
        );
    }

    #[test]
    fn test_round_trip_root_sequence() {
        round_trip(json!([1, 2, 3]), json!([4]));
    }

    #[test]
    fn test_round_trip_matches_at_the_yaml_encoded_level() {
        let before = Tree::from_json_value(&json!({
            "openapi": "3.1.0",
            "info": { "title": "api", "version": "1.0.0" }
        }));
        let after = Tree::from_json_value(&json!({
            "openapi": "3.1.0",
            "info": { "title": "api", "version": "2.0.0", "x-internal": true }
        }));

        let overlay = compare(&before, &after).unwrap();
        let mut patched = before.clone();
        apply(&overlay, &mut patched).unwrap();

        let patched = crate::document::Document::from_tree(patched);
        let expected = crate::document::Document::from_tree(after);
        assert_eq!(
            patched.to_yaml_string().unwrap(),
            expected.to_yaml_string().unwrap()
        );
    }

    #[test]
    fn test_keys_with_special_characters_are_quoted() {
        let before = Tree::from_json_value(&json!({ "paths": { "/pets/{id}": { "get": {} } } }));
        let after = Tree::from_json_value(
            &json!({ "paths": { "/pets/{id}": { "get": { "deprecated": true } } } }),
        );

        let overlay = compare(&before, &after).unwrap();

        assert_eq!(overlay.actions.len(), 1);
        assert_eq!(
            overlay.actions[0].target,
            "$[\"paths\"][\"/pets/{id}\"][\"get\"]"
        );
    }
}
