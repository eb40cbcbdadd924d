//! Bridges between the document tree and serde value models.
//!
//! The parser collaborators hand the cores `serde_yaml::Value` /
//! `serde_json::Value` data; these conversions resolve scalar tags on the
//! way in and re-type scalars by tag on the way out.

use serde_yaml::value::TaggedValue;

use super::{tag, Content, NodeId, Tree};

impl Tree {
    /// Builds a tree (with a document root) from a parsed yaml value.
    pub fn from_yaml_value(value: &serde_yaml::Value) -> Tree {
        let mut tree = Tree::new();
        let content = tree.build_yaml(value);
        tree.document(content);
        tree
    }

    /// Builds a tree (with a document root) from a parsed json value.
    pub fn from_json_value(value: &serde_json::Value) -> Tree {
        let mut tree = Tree::new();
        let content = tree.build_json(value);
        tree.document(content);
        tree
    }

    fn build_yaml(&mut self, value: &serde_yaml::Value) -> NodeId {
        match value {
            serde_yaml::Value::Null => self.scalar("null", tag::NULL),
            serde_yaml::Value::Bool(b) => self.scalar(b.to_string(), tag::BOOL),
            serde_yaml::Value::Number(n) => {
                let t = if n.is_f64() { tag::FLOAT } else { tag::INT };
                self.scalar(n.to_string(), t)
            }
            serde_yaml::Value::String(s) => self.scalar(s.clone(), tag::STR),
            serde_yaml::Value::Sequence(items) => {
                let ids = items.iter().map(|i| self.build_yaml(i)).collect();
                self.sequence(ids)
            }
            serde_yaml::Value::Mapping(map) => {
                let pairs = map
                    .iter()
                    .map(|(k, v)| (self.build_yaml(k), self.build_yaml(v)))
                    .collect();
                self.mapping(pairs)
            }
            serde_yaml::Value::Tagged(tagged) => {
                let id = self.build_yaml(&tagged.value);
                self.node_mut(id).tag = tagged.tag.to_string();
                id
            }
        }
    }

    fn build_json(&mut self, value: &serde_json::Value) -> NodeId {
        match value {
            serde_json::Value::Null => self.scalar("null", tag::NULL),
            serde_json::Value::Bool(b) => self.scalar(b.to_string(), tag::BOOL),
            serde_json::Value::Number(n) => {
                let t = if n.is_f64() { tag::FLOAT } else { tag::INT };
                self.scalar(n.to_string(), t)
            }
            serde_json::Value::String(s) => self.scalar(s.clone(), tag::STR),
            serde_json::Value::Array(items) => {
                let ids = items.iter().map(|i| self.build_json(i)).collect();
                self.sequence(ids)
            }
            serde_json::Value::Object(map) => {
                let pairs = map
                    .iter()
                    .map(|(k, v)| {
                        let key = self.scalar(k.clone(), tag::STR);
                        let value = self.build_json(v);
                        (key, value)
                    })
                    .collect();
                self.mapping(pairs)
            }
        }
    }

    /// Re-types the subtree under `id` into a yaml value by scalar tag.
    pub fn to_yaml_value(&self, id: NodeId) -> serde_yaml::Value {
        let node = self.node(id);

        match &node.content {
            Content::Document(content) => self.to_yaml_value(*content),
            Content::Scalar(value) => {
                let plain = scalar_to_yaml(value, &node.tag);
                if node.tag.starts_with("!!") || node.tag.is_empty() {
                    plain
                } else {
                    serde_yaml::Value::Tagged(Box::new(TaggedValue {
                        tag: serde_yaml::value::Tag::new(node.tag.trim_start_matches('!')),
                        value: plain,
                    }))
                }
            }
            Content::Sequence(items) => serde_yaml::Value::Sequence(
                items.iter().map(|i| self.to_yaml_value(*i)).collect(),
            ),
            Content::Mapping(pairs) => {
                let mut map = serde_yaml::Mapping::new();
                for (k, v) in pairs {
                    map.insert(self.to_yaml_value(*k), self.to_yaml_value(*v));
                }
                serde_yaml::Value::Mapping(map)
            }
            Content::Alias(anchor) => {
                log::warn!("alias *{} cannot be represented, emitting null", anchor);
                serde_yaml::Value::Null
            }
        }
    }

    /// Re-types the subtree under `id` into a json value by scalar tag.
    /// Non-string mapping keys are stringified.
    pub fn to_json_value(&self, id: NodeId) -> serde_json::Value {
        let node = self.node(id);

        match &node.content {
            Content::Document(content) => self.to_json_value(*content),
            Content::Scalar(value) => scalar_to_json(value, &node.tag),
            Content::Sequence(items) => serde_json::Value::Array(
                items.iter().map(|i| self.to_json_value(*i)).collect(),
            ),
            Content::Mapping(pairs) => {
                let mut map = serde_json::Map::new();
                for (k, v) in pairs {
                    let key = self
                        .scalar_value(*k)
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| self.to_json_value(*k).to_string());
                    map.insert(key, self.to_json_value(*v));
                }
                serde_json::Value::Object(map)
            }
            Content::Alias(anchor) => {
                log::warn!("alias *{} cannot be represented, emitting null", anchor);
                serde_json::Value::Null
            }
        }
    }
}

fn scalar_to_yaml(value: &str, t: &str) -> serde_yaml::Value {
    match t {
        tag::NULL => serde_yaml::Value::Null,
        tag::BOOL => value
            .parse::<bool>()
            .map(serde_yaml::Value::Bool)
            .unwrap_or_else(|_| serde_yaml::Value::String(value.to_string())),
        tag::INT => value
            .parse::<i64>()
            .map(|i| serde_yaml::Value::Number(i.into()))
            .or_else(|_| value.parse::<u64>().map(|u| serde_yaml::Value::Number(u.into())))
            .unwrap_or_else(|_| serde_yaml::Value::String(value.to_string())),
        tag::FLOAT => value
            .parse::<f64>()
            .map(|f| serde_yaml::Value::Number(f.into()))
            .unwrap_or_else(|_| serde_yaml::Value::String(value.to_string())),
        tag::STR => serde_yaml::Value::String(value.to_string()),
        // custom tags carry no resolved type, re-apply plain resolution
        _ => match value {
            "null" | "~" => serde_yaml::Value::Null,
            "true" => serde_yaml::Value::Bool(true),
            "false" => serde_yaml::Value::Bool(false),
            _ => value
                .parse::<i64>()
                .map(|i| serde_yaml::Value::Number(i.into()))
                .or_else(|_| value.parse::<f64>().map(|f| serde_yaml::Value::Number(f.into())))
                .unwrap_or_else(|_| serde_yaml::Value::String(value.to_string())),
        },
    }
}

fn scalar_to_json(value: &str, t: &str) -> serde_json::Value {
    match t {
        tag::NULL => serde_json::Value::Null,
        tag::BOOL => value
            .parse::<bool>()
            .map(serde_json::Value::Bool)
            .unwrap_or_else(|_| serde_json::Value::String(value.to_string())),
        tag::INT => value
            .parse::<i64>()
            .map(|i| serde_json::Value::Number(i.into()))
            .unwrap_or_else(|_| serde_json::Value::String(value.to_string())),
        tag::FLOAT => serde_json::Number::from_f64(value.parse::<f64>().unwrap_or(f64::NAN))
            .map(serde_json::Value::Number)
            .unwrap_or_else(|| serde_json::Value::String(value.to_string())),
        _ => serde_json::Value::String(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_round_trip_preserves_order_and_types() {
        let value = json!({
            "openapi": "3.1.0",
            "count": 3,
            "ratio": 0.5,
            "flag": true,
            "nothing": null,
            "tags": [ { "name": "a" } ]
        });

        let tree = Tree::from_json_value(&value);
        let back = tree.to_json_value(tree.root().unwrap());

        assert_eq!(back, value);
    }

    #[test]
    fn test_yaml_round_trip() {
        let value: serde_yaml::Value =
            serde_yaml::from_str("a: 1\nb:\n  - x\n  - true\nc: null\n").unwrap();

        let tree = Tree::from_yaml_value(&value);
        let back = tree.to_yaml_value(tree.root().unwrap());

        assert_eq!(back, value);
    }

    #[test]
    fn test_scalar_tags_are_resolved() {
        let tree = Tree::from_json_value(&json!({ "a": "text", "b": 1, "c": false }));
        let root = tree.content_root().unwrap();

        let a = tree.get(root, "a").unwrap();
        let b = tree.get(root, "b").unwrap();
        let c = tree.get(root, "c").unwrap();

        assert_eq!(tree.node(a).tag, tag::STR);
        assert_eq!(tree.node(b).tag, tag::INT);
        assert_eq!(tree.node(c).tag, tag::BOOL);
        assert_eq!(tree.node(root).tag, tag::MAP);
    }

    #[test]
    fn test_custom_tag_survives_yaml_round_trip() {
        let value: serde_yaml::Value = serde_yaml::from_str("a: !custom 12\n").unwrap();

        let tree = Tree::from_yaml_value(&value);
        let back = tree.to_yaml_value(tree.root().unwrap());

        assert_eq!(back, value);
    }
}
