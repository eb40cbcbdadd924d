//! Overlay documents: a declarative list of jsonpath-targeted update,
//! remove and copy actions applied to a target document tree.

pub mod apply;
pub mod compare;
pub mod merge;
pub mod validate;

use crate::error::Error;
use crate::path::PathMode;
use crate::tree::{tag, NodeId, NodeKind, Tree};

pub const SUPPORTED_VERSIONS: &[&str] = &["1.0.0", "1.1.0"];

/// Extension field selecting the jsonpath dialect explicitly.
pub const JSONPATH_MODE_KEY: &str = "x-speakeasy-jsonpath";

#[derive(Clone, Debug)]
pub struct Overlay {
    /// The parsed overlay document; `Action::update` payloads point into it.
    pub(crate) tree: Tree,
    pub version: String,
    pub jsonpath_mode: Option<PathMode>,
    pub info: Info,
    pub extends: Option<String>,
    pub actions: Vec<Action>,
}

#[derive(Clone, Debug, Default)]
pub struct Info {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
}

/// One overlay operation. When several of remove/update/copy are present
/// the engine dispatches by priority: remove, then update, then copy.
#[derive(Clone, Debug, Default)]
pub struct Action {
    pub target: String,
    pub description: Option<String>,
    pub remove: bool,
    /// Sub-tree in the overlay's own tree to merge into each selected node.
    pub update: Option<NodeId>,
    /// Jsonpath selecting a single source node in the target document.
    pub copy: Option<String>,
}

impl Overlay {
    pub fn from_tree(tree: Tree) -> Result<Overlay, Error> {
        let root = tree.content_root().ok_or(Error::EmptyTree)?;

        if tree.kind(root) != NodeKind::Mapping {
            return Err(Error::OverlayFormat(
                "overlay document must be an object".to_string(),
            ));
        }

        let version = tree.get_str(root, "overlay").unwrap_or("").to_string();

        let jsonpath_mode = match tree.get_str(root, JSONPATH_MODE_KEY) {
            Some("rfc9535") => Some(PathMode::Rfc9535),
            Some("legacy") => Some(PathMode::Legacy),
            Some(other) => {
                log::warn!("unknown {} value: {}", JSONPATH_MODE_KEY, other);
                None
            }
            None => None,
        };

        let info = match tree.get(root, "info") {
            Some(node) if tree.kind(node) == NodeKind::Mapping => Info {
                title: tree.get_str(node, "title").unwrap_or("").to_string(),
                version: tree.get_str(node, "version").unwrap_or("").to_string(),
                description: tree.get_str(node, "description").map(|s| s.to_string()),
            },
            _ => Info::default(),
        };

        let extends = tree.get_str(root, "extends").map(|s| s.to_string());

        let mut actions = Vec::new();
        if let Some(list) = tree.get(root, "actions") {
            let items = tree.items(list).ok_or_else(|| {
                Error::OverlayFormat("actions must be an array".to_string())
            })?;

            for (i, &item) in items.iter().enumerate() {
                if tree.kind(item) != NodeKind::Mapping {
                    return Err(Error::OverlayFormat(format!(
                        "action {} must be an object",
                        i + 1
                    )));
                }

                actions.push(Action {
                    target: tree.get_str(item, "target").unwrap_or("").to_string(),
                    description: tree.get_str(item, "description").map(|s| s.to_string()),
                    remove: tree.get_str(item, "remove") == Some("true"),
                    update: tree.get(item, "update"),
                    copy: tree.get_str(item, "copy").map(|s| s.to_string()),
                });
            }
        }

        Ok(Overlay {
            tree,
            version,
            jsonpath_mode,
            info,
            extends,
            actions,
        })
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Serializes the overlay back into a document tree, preserving action
    /// order and importing update payloads.
    pub fn to_tree(&self) -> Tree {
        let mut out = Tree::new();
        let mut pairs = Vec::new();

        let k = out.scalar("overlay", tag::STR);
        let v = out.scalar(&self.version, tag::STR);
        pairs.push((k, v));

        if let Some(mode) = self.jsonpath_mode {
            let k = out.scalar(JSONPATH_MODE_KEY, tag::STR);
            let v = out.scalar(
                match mode {
                    PathMode::Rfc9535 => "rfc9535",
                    PathMode::Legacy => "legacy",
                },
                tag::STR,
            );
            pairs.push((k, v));
        }

        let mut info_pairs = Vec::new();
        let k = out.scalar("title", tag::STR);
        let v = out.scalar(&self.info.title, tag::STR);
        info_pairs.push((k, v));
        let k = out.scalar("version", tag::STR);
        let v = out.scalar(&self.info.version, tag::STR);
        info_pairs.push((k, v));
        if let Some(description) = &self.info.description {
            let k = out.scalar("description", tag::STR);
            let v = out.scalar(description, tag::STR);
            info_pairs.push((k, v));
        }
        let info = out.mapping(info_pairs);
        let k = out.scalar("info", tag::STR);
        pairs.push((k, info));

        if let Some(extends) = &self.extends {
            let k = out.scalar("extends", tag::STR);
            let v = out.scalar(extends, tag::STR);
            pairs.push((k, v));
        }

        let mut action_items = Vec::new();
        for action in &self.actions {
            let mut action_pairs = Vec::new();

            let k = out.scalar("target", tag::STR);
            let v = out.scalar(&action.target, tag::STR);
            action_pairs.push((k, v));

            if let Some(description) = &action.description {
                let k = out.scalar("description", tag::STR);
                let v = out.scalar(description, tag::STR);
                action_pairs.push((k, v));
            }

            if action.remove {
                let k = out.scalar("remove", tag::STR);
                let v = out.scalar("true", tag::BOOL);
                action_pairs.push((k, v));
            }

            if let Some(update) = action.update {
                let k = out.scalar("update", tag::STR);
                let v = out.import(&self.tree, update);
                action_pairs.push((k, v));
            }

            if let Some(copy) = &action.copy {
                let k = out.scalar("copy", tag::STR);
                let v = out.scalar(copy, tag::STR);
                action_pairs.push((k, v));
            }

            action_items.push(out.mapping(action_pairs));
        }
        let actions = out.sequence(action_items);
        let k = out.scalar("actions", tag::STR);
        pairs.push((k, actions));

        let root = out.mapping(pairs);
        out.document(root);
        out
    }
}
