//! The overlay apply engine.
//!
//! Actions run in list order. In lax mode unmatched targets are skipped
//! silently; in strict mode selector misses aggregate into one fatal error
//! while type-mismatch and homogeneity violations abort immediately.

use crate::error::Error;
use crate::path::{self, PathMode};
use crate::tree::{NodeId, NodeKind, Tree};

use super::merge::{self, MergeVersion};
use super::{validate, Action, Overlay};

#[derive(Clone, Debug, Default)]
pub struct ApplyReport {
    /// Non-fatal findings, in action order.
    pub warnings: Vec<String>,
}

pub struct Applier;

pub struct ApplierOptions {
    strict: bool,
}

impl Applier {
    pub fn options() -> ApplierOptions {
        ApplierOptions { strict: false }
    }
}

/// Applies the overlay in lax mode, ignoring unmatched targets.
pub fn apply(overlay: &Overlay, target: &mut Tree) -> Result<ApplyReport, Error> {
    Applier::options().process(overlay, target)
}

/// Applies the overlay in strict mode: unmatched targets, ambiguous copy
/// sources and kind violations are fatal.
pub fn apply_strict(overlay: &Overlay, target: &mut Tree) -> Result<ApplyReport, Error> {
    Applier::options().with_strict(true).process(overlay, target)
}

impl ApplierOptions {
    pub fn with_strict(&mut self, value: bool) -> &mut Self {
        self.strict = value;
        self
    }

    pub fn process(&self, overlay: &Overlay, target: &mut Tree) -> Result<ApplyReport, Error> {
        validate::validate(overlay)?;

        let mode = path::mode_for(&overlay.version, overlay.jsonpath_mode);
        let evaluator = path::evaluator(mode);
        let root = target.content_root().ok_or(Error::EmptyTree)?;

        // past validation the version is well-formed semver
        let version = match semver::Version::parse(&overlay.version) {
            Ok(v) if v >= semver::Version::new(1, 1, 0) => MergeVersion::V1_1,
            _ => MergeVersion::V1_0,
        };

        let mut warnings = Vec::new();
        let mut errors = Vec::new();

        if mode == PathMode::Legacy && overlay.actions.iter().any(uses_filter) {
            warnings.push(
                "targets use filter expressions under the legacy jsonpath dialect, \
                 consider migrating to rfc 9535"
                    .to_string(),
            );
        }

        for (i, action) in overlay.actions.iter().enumerate() {
            let index = i + 1;

            let nodes = evaluator.query(&action.target, target, root)?;

            if nodes.is_empty() {
                if self.strict {
                    errors.push(format!(
                        "action {}: target {} matched no nodes",
                        index, action.target
                    ));
                } else {
                    log::debug!("action {}: target {} matched no nodes", index, action.target);
                }
                continue;
            }

            if action.remove {
                self.remove(target, &nodes, index, &mut errors);
            } else if let Some(update) = action.update {
                let local = target.import(overlay.tree(), update);
                self.merge_into(
                    target, &nodes, local, index, version, &mut warnings,
                )?;
            } else if let Some(copy) = &action.copy {
                let sources = evaluator.query(copy, target, root)?;

                let source = match sources.len() {
                    1 => Some(sources[0]),
                    0 => {
                        if self.strict {
                            errors.push(format!(
                                "action {}: copy source {} matched no nodes",
                                index, copy
                            ));
                        } else {
                            warnings.push(format!(
                                "action {}: copy source {} matched no nodes, skipping",
                                index, copy
                            ));
                        }
                        None
                    }
                    n => {
                        if self.strict {
                            errors.push(format!(
                                "action {}: copy source {} matched {} nodes, expected exactly one",
                                index, copy, n
                            ));
                            None
                        } else {
                            log::warn!(
                                "action {}: copy source {} matched {} nodes, using the first",
                                index,
                                copy,
                                n
                            );
                            Some(sources[0])
                        }
                    }
                };

                if let Some(source) = source {
                    let local = target.deep_clone(source);
                    self.merge_into(
                        target, &nodes, local, index, version, &mut warnings,
                    )?;
                }
            } else {
                warnings.push(format!(
                    "action {}: no remove, update or copy specified, does nothing",
                    index
                ));
            }
        }

        for warning in &warnings {
            log::warn!("{}", warning);
        }

        if errors.is_empty() {
            Ok(ApplyReport { warnings })
        } else {
            Err(Error::OverlayApply { errors, warnings })
        }
    }

    /// Detaches each selected node from its parent. The parent index is
    /// rebuilt per action because earlier actions may have reshaped the tree.
    fn remove(
        &self,
        target: &mut Tree,
        nodes: &[NodeId],
        index: usize,
        errors: &mut Vec<String>,
    ) {
        let parents = target.parent_index();

        for &node in nodes {
            match parents.get(&node) {
                Some(&parent) => detach(target, parent, node, index, self.strict, errors),
                None => {
                    if self.strict {
                        errors.push(format!(
                            "action {}: cannot remove the document root",
                            index
                        ));
                    }
                }
            }
        }
    }

    fn merge_into(
        &self,
        target: &mut Tree,
        nodes: &[NodeId],
        update: NodeId,
        index: usize,
        version: MergeVersion,
        warnings: &mut Vec<String>,
    ) -> Result<(), Error> {
        // strict multi-target updates under 1.1.0 must select one kind only
        if self.strict && version == MergeVersion::V1_1 && nodes.len() > 1 {
            let first = target.kind(nodes[0]);
            if let Some(&other) = nodes.iter().find(|&&n| target.kind(n) != first) {
                return Err(Error::MixedTargetKinds {
                    index,
                    first: first.label(),
                    second: target.kind(other).label(),
                });
            }
        }

        let mut any_unchanged = false;
        for &node in nodes {
            let changed = merge::merge_top(target, node, update, version, self.strict)?;
            any_unchanged |= !changed;
        }

        if any_unchanged {
            warnings.push(format!("action {}: does nothing", index));
        }

        Ok(())
    }
}

fn uses_filter(action: &Action) -> bool {
    path::has_filter(&action.target)
        || action
            .copy
            .as_deref()
            .map(path::has_filter)
            .unwrap_or(false)
}

/// Removes `node` from `parent`. A mapping pair goes away whichever of its
/// key or value was selected; a sequence element is spliced out. Detached
/// nodes stay in the arena, unreferenced.
fn detach(
    tree: &mut Tree,
    parent: NodeId,
    node: NodeId,
    index: usize,
    strict: bool,
    errors: &mut Vec<String>,
) {
    match tree.kind(parent) {
        NodeKind::Mapping => {
            let position = tree
                .pairs(parent)
                .unwrap()
                .iter()
                .position(|(k, v)| *k == node || *v == node);

            // absent means an earlier selection already removed the pair
            if let Some(position) = position {
                tree.remove_pair_at(parent, position);
            }
        }
        NodeKind::Sequence => {
            let position = tree
                .items(parent)
                .unwrap()
                .iter()
                .position(|&item| item == node);

            if let Some(position) = position {
                tree.remove_item_at(parent, position);
            }
        }
        NodeKind::Document => {
            if strict {
                errors.push(format!("action {}: cannot remove the document root", index));
            } else {
                log::warn!("action {}: cannot remove the document root", index);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::Overlay;
    use serde_json::json;

    fn overlay(value: serde_json::Value) -> Overlay {
        Overlay::from_tree(Tree::from_json_value(&value)).unwrap()
    }

    fn target(value: serde_json::Value) -> Tree {
        Tree::from_json_value(&value)
    }

    fn as_json(tree: &Tree) -> serde_json::Value {
        tree.to_json_value(tree.root().unwrap())
    }

    #[test]
    fn test_update_merges_into_each_selected_node() {
        let overlay = overlay(json!({
            "overlay": "1.1.0",
            "info": { "title": "t", "version": "1" },
            "actions": [
                { "target": "$.paths.*", "update": { "x-audited": true } }
            ]
        }));
        let mut tree = target(json!({
            "paths": { "/a": { "get": {} }, "/b": { "post": {} } }
        }));

        apply(&overlay, &mut tree).unwrap();

        assert_eq!(
            as_json(&tree),
            json!({
                "paths": {
                    "/a": { "get": {}, "x-audited": true },
                    "/b": { "post": {}, "x-audited": true }
                }
            })
        );
    }

    #[test]
    fn test_remove_value_node_removes_the_pair() {
        let overlay = overlay(json!({
            "overlay": "1.1.0",
            "info": { "title": "t", "version": "1" },
            "actions": [ { "target": "$.info.description", "remove": true } ]
        }));
        let mut tree = target(json!({
            "info": { "title": "x", "description": "gone" }
        }));

        apply(&overlay, &mut tree).unwrap();

        assert_eq!(as_json(&tree), json!({ "info": { "title": "x" } }));
    }

    #[test]
    fn test_remove_key_node_removes_the_pair() {
        let overlay = overlay(json!({
            "overlay": "1.1.0",
            "info": { "title": "t", "version": "1" },
            "actions": [ { "target": "$.components.schemas.*~", "remove": true } ]
        }));
        let mut tree = target(json!({
            "components": { "schemas": { "A": { "type": "object" } } }
        }));

        apply(&overlay, &mut tree).unwrap();

        assert_eq!(as_json(&tree), json!({ "components": { "schemas": {} } }));
    }

    #[test]
    fn test_remove_sequence_element_splices() {
        let overlay = overlay(json!({
            "overlay": "1.1.0",
            "info": { "title": "t", "version": "1" },
            "actions": [ { "target": "$.tags[?@.name == 'internal']", "remove": true } ]
        }));
        let mut tree = target(json!({
            "tags": [ { "name": "public" }, { "name": "internal" }, { "name": "beta" } ]
        }));

        apply(&overlay, &mut tree).unwrap();

        assert_eq!(
            as_json(&tree),
            json!({ "tags": [ { "name": "public" }, { "name": "beta" } ] })
        );
    }

    #[test]
    fn test_sequence_append_scenario() {
        // overlay 1.1.0 top-level update of a sequence with a mapping appends
        let overlay = overlay(json!({
            "overlay": "1.1.0",
            "info": { "title": "t", "version": "1" },
            "actions": [
                {
                    "target": "$.tags",
                    "update": { "name": "newTag", "description": "appended" }
                }
            ]
        }));
        let mut tree = target(json!({ "tags": [ { "name": "existing" } ] }));

        apply(&overlay, &mut tree).unwrap();

        assert_eq!(
            as_json(&tree),
            json!({
                "tags": [
                    { "name": "existing" },
                    { "name": "newTag", "description": "appended" }
                ]
            })
        );
    }

    #[test]
    fn test_v1_0_sequence_update_with_mapping_replaces() {
        let overlay = overlay(json!({
            "overlay": "1.0.0",
            "info": { "title": "t", "version": "1" },
            "actions": [
                { "target": "$.tags", "update": { "name": "newTag" } }
            ]
        }));
        let mut tree = target(json!({ "tags": [ { "name": "existing" } ] }));

        apply(&overlay, &mut tree).unwrap();

        assert_eq!(as_json(&tree), json!({ "tags": { "name": "newTag" } }));
    }

    #[test]
    fn test_copy_clones_source_into_target() {
        let overlay = overlay(json!({
            "overlay": "1.1.0",
            "info": { "title": "t", "version": "1" },
            "actions": [
                { "target": "$.components.schemas.Copy", "copy": "$.components.schemas.Source" }
            ]
        }));
        let mut tree = target(json!({
            "components": {
                "schemas": {
                    "Source": { "type": "object", "properties": { "a": { "type": "string" } } },
                    "Copy": {}
                }
            }
        }));

        apply(&overlay, &mut tree).unwrap();

        assert_eq!(
            as_json(&tree),
            json!({
                "components": {
                    "schemas": {
                        "Source": { "type": "object", "properties": { "a": { "type": "string" } } },
                        "Copy": { "type": "object", "properties": { "a": { "type": "string" } } }
                    }
                }
            })
        );
    }

    #[test]
    fn test_remove_wins_over_update_and_copy() {
        let mut tree = target(json!({ "a": 1, "b": 2 }));
        let overlay_tree = Tree::from_json_value(&json!({
            "overlay": "1.1.0",
            "info": { "title": "t", "version": "1" },
            "actions": [ { "target": "$.a", "copy": "$.b" } ]
        }));
        let mut parsed = Overlay::from_tree(overlay_tree).unwrap();
        parsed.actions[0].remove = true;

        apply(&parsed, &mut tree).unwrap();

        assert_eq!(as_json(&tree), json!({ "b": 2 }));
    }

    #[test]
    fn test_lax_mode_ignores_unmatched_targets() {
        let overlay = overlay(json!({
            "overlay": "1.1.0",
            "info": { "title": "t", "version": "1" },
            "actions": [ { "target": "$.nope", "remove": true } ]
        }));
        let mut tree = target(json!({ "a": 1 }));

        let report = apply(&overlay, &mut tree).unwrap();

        assert!(report.warnings.is_empty());
        assert_eq!(as_json(&tree), json!({ "a": 1 }));
    }

    #[test]
    fn test_strict_mode_aggregates_selector_errors() {
        let overlay = overlay(json!({
            "overlay": "1.1.0",
            "info": { "title": "t", "version": "1" },
            "actions": [
                { "target": "$.nope", "remove": true },
                { "target": "$.a", "update": { "x": 1 } },
                { "target": "$.also_nope", "remove": true }
            ]
        }));
        let mut tree = target(json!({ "a": {} }));

        let result = apply_strict(&overlay, &mut tree);

        match result {
            Err(Error::OverlayApply { errors, .. }) => {
                assert_eq!(errors.len(), 2);
                assert!(errors[0].contains("action 1"));
                assert!(errors[1].contains("action 3"));
            }
            other => panic!("expected aggregated apply error, got {:?}", other),
        }

        // the matched action in between still ran
        assert_eq!(as_json(&tree), json!({ "a": { "x": 1 } }));
    }

    #[test]
    fn test_strict_copy_requires_exactly_one_source() {
        let overlay = overlay(json!({
            "overlay": "1.1.0",
            "info": { "title": "t", "version": "1" },
            "actions": [ { "target": "$.a", "copy": "$.items[*]" } ]
        }));
        let mut tree = target(json!({ "a": {}, "items": [ {"x": 1}, {"y": 2} ] }));

        let result = apply_strict(&overlay, &mut tree);

        match result {
            Err(Error::OverlayApply { errors, .. }) => {
                assert!(errors[0].contains("matched 2 nodes"));
            }
            other => panic!("expected apply error, got {:?}", other),
        }
    }

    #[test]
    fn test_strict_homogeneity_check_rejects_mixed_kinds() {
        let overlay = overlay(json!({
            "overlay": "1.1.0",
            "info": { "title": "t", "version": "1" },
            "actions": [ { "target": "$.mixed[*]", "update": { "x": 1 } } ]
        }));
        let mut tree = target(json!({ "mixed": [ { "a": 1 }, [1, 2] ] }));

        let result = apply_strict(&overlay, &mut tree);

        match result {
            Err(Error::MixedTargetKinds { first, second, .. }) => {
                assert_eq!(first, "object");
                assert_eq!(second, "array");
            }
            other => panic!("expected mixed kinds error, got {:?}", other),
        }
    }

    #[test]
    fn test_does_nothing_warning() {
        let overlay = overlay(json!({
            "overlay": "1.1.0",
            "info": { "title": "t", "version": "1" },
            "actions": [ { "target": "$.info", "update": { "title": "same" } } ]
        }));
        let mut tree = target(json!({ "info": { "title": "same" } }));

        let report = apply_strict(&overlay, &mut tree).unwrap();

        assert_eq!(report.warnings, vec!["action 1: does nothing".to_string()]);
    }

    #[test]
    fn test_filter_under_legacy_emits_single_warning() {
        let overlay = overlay(json!({
            "overlay": "1.0.0",
            "info": { "title": "t", "version": "1" },
            "actions": [
                { "target": "$.tags[?(@.name == 'a')]", "remove": true },
                { "target": "$.tags[?(@.name == 'b')]", "remove": true }
            ]
        }));
        let mut tree = target(json!({ "tags": [ { "name": "a" }, { "name": "b" } ] }));

        let report = apply(&overlay, &mut tree).unwrap();

        let migrations: Vec<_> = report
            .warnings
            .iter()
            .filter(|w| w.contains("rfc 9535"))
            .collect();
        assert_eq!(migrations.len(), 1);
        assert_eq!(as_json(&tree), json!({ "tags": [] }));
    }

    #[test]
    fn test_empty_overlay_apply_is_a_validation_error() {
        let overlay = overlay(json!({
            "overlay": "1.1.0",
            "info": { "title": "t", "version": "1" },
            "actions": []
        }));
        let mut tree = target(json!({ "a": 1 }));

        let result = apply(&overlay, &mut tree);

        match result {
            Err(Error::OverlayValidation(errors)) => {
                assert!(errors
                    .iter()
                    .any(|e| e == "overlay must define at least one action"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_actions_apply_in_order() {
        let overlay = overlay(json!({
            "overlay": "1.1.0",
            "info": { "title": "t", "version": "1" },
            "actions": [
                { "target": "$.value", "update": "first" },
                { "target": "$.value", "update": "second" }
            ]
        }));
        let mut tree = target(json!({ "value": "initial" }));

        apply(&overlay, &mut tree).unwrap();

        assert_eq!(as_json(&tree), json!({ "value": "second" }));
    }

    #[test]
    fn test_mismatch_aborts_but_selector_errors_aggregate() {
        // strict type mismatch short-circuits the whole apply
        let overlay = overlay(json!({
            "overlay": "1.1.0",
            "info": { "title": "t", "version": "1" },
            "actions": [
                { "target": "$.a", "update": [1] },
                { "target": "$.b", "update": { "x": 1 } }
            ]
        }));
        let mut tree = target(json!({ "a": {}, "b": {} }));

        let result = apply_strict(&overlay, &mut tree);

        assert!(matches!(result, Err(Error::MergeTypeMismatch { .. })));
        // the second action never ran
        assert_eq!(as_json(&tree), json!({ "a": {}, "b": {} }));
    }
}
