use std::io::Read;
use std::{fs, path::PathBuf};

use serde::Deserialize;
pub use url::Url;

use crate::error::Error;
use crate::tree::Tree;

/// A loaded document: the structure-preserving tree plus its origin url.
#[derive(Clone, Debug)]
pub struct Document {
    tree: Tree,
    url: Url,
}

impl Document {
    pub fn load_url(url: Url) -> Result<Document, Error> {
        log::info!("loading: {}", url);

        let content = match url.scheme() {
            "file" => {
                let path = if cfg!(windows) {
                    let path = url.path();
                    path[1..path.len()].to_string()
                } else {
                    url.path().to_string()
                };

                fs::read_to_string(&path).map_err(|_| Error::DocumentRead {
                    url: url.to_string(),
                })?
            }
            s => {
                return Err(Error::DocumentInvalidScheme {
                    url: url.to_string(),
                    scheme: s.to_string(),
                })
            }
        };

        let is_json = url
            .path_segments()
            .and_then(|c| c.last().map(|s| s.to_string()))
            .map(|name| name.ends_with(".json"))
            .unwrap_or(false);

        let tree = if is_json {
            parse_json(&content)?
        } else {
            parse_yaml(&content)?
        };

        Ok(Document { tree, url })
    }

    /// Reads a document from any reader, used by the cli for the `-` stdin
    /// convention. Content is sniffed as json when it starts with `{` or `[`.
    pub fn from_reader(mut reader: impl Read) -> Result<Document, Error> {
        let mut content = String::new();
        reader
            .read_to_string(&mut content)
            .map_err(|_| Error::DocumentRead {
                url: "stdin".to_string(),
            })?;

        let tree = match content.trim_start().chars().next() {
            Some('{') | Some('[') => parse_json(&content)?,
            _ => parse_yaml(&content)?,
        };

        Ok(Document {
            tree,
            url: Url::parse("document://stdin").unwrap(),
        })
    }

    pub fn from_tree(tree: Tree) -> Document {
        Document {
            tree,
            url: Url::parse("document://inline").unwrap(),
        }
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    pub fn into_tree(self) -> Tree {
        self.tree
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// 2-space-indent yaml encoding of the document.
    pub fn to_yaml_string(&self) -> Result<String, Error> {
        let root = self.tree.root().ok_or(Error::EmptyTree)?;
        serde_yaml::to_string(&self.tree.to_yaml_value(root))
            .map_err(|e| Error::SerializeDocument(e.to_string()))
    }

    pub fn to_json_string(&self) -> Result<String, Error> {
        let root = self.tree.root().ok_or(Error::EmptyTree)?;
        serde_json::to_string_pretty(&self.tree.to_json_value(root))
            .map_err(|e| Error::SerializeDocument(e.to_string()))
    }
}

fn parse_yaml(content: &str) -> Result<Tree, Error> {
    let docs = serde_yaml::Deserializer::from_str(content)
        .map(|d| serde_yaml::Value::deserialize(d).map_err(Error::DeserializeYaml))
        .collect::<Result<Vec<_>, _>>()?;

    match docs.len() {
        1 => Ok(Tree::from_yaml_value(&docs[0])),
        n => Err(Error::MultiDocument(n)),
    }
}

fn parse_json(content: &str) -> Result<Tree, Error> {
    let value: serde_json::Value =
        serde_json::from_str(content).map_err(Error::DeserializeJson)?;

    Ok(Tree::from_json_value(&value))
}

pub fn path_to_url(path: String) -> Result<Url, Error> {
    if path == "-" {
        return Err(Error::DocumentPathIsStdin);
    }

    let real_path = PathBuf::from(&path);

    if real_path.exists() {
        let fixed = format!(
            "file://{}",
            real_path.canonicalize().unwrap().to_str().unwrap()
        );

        Url::parse(&fixed).map_err(|_| Error::DocumentInvalidPath { path })
    } else {
        Err(Error::DocumentInvalidPath { path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_from_reader_detects_json() {
        let doc = Document::from_reader("{\"a\": 1}".as_bytes()).unwrap();
        let root = doc.tree().content_root().unwrap();

        assert_eq!(doc.tree().get_str(root, "a"), None);
        assert_eq!(
            doc.tree()
                .get(root, "a")
                .and_then(|v| doc.tree().scalar_value(v)),
            Some("1")
        );
    }

    #[test]
    fn test_from_reader_detects_yaml() {
        let doc = Document::from_reader("a: hello\n".as_bytes()).unwrap();
        let root = doc.tree().content_root().unwrap();

        assert_eq!(doc.tree().get_str(root, "a"), Some("hello"));
    }

    #[test]
    fn test_multi_document_yaml_is_rejected() {
        let result = Document::from_reader("a: 1\n---\nb: 2\n".as_bytes());

        assert!(matches!(result, Err(Error::MultiDocument(2))));
    }

    #[test]
    fn test_yaml_output_uses_two_space_indent() {
        let doc = Document::from_reader("tags:\n  - name: a\n".as_bytes()).unwrap();

        assert_eq!(doc.to_yaml_string().unwrap(), "tags:\n- name: a\n");
    }

    #[test_case("./not-existing.yaml".to_string() ; "relative")]
    #[test_case("/not-existing.yaml".to_string() ; "absolute")]
    fn test_path_to_url_fails_when_file_does_not_exist(path: String) {
        assert!(path_to_url(path).is_err());
    }

    #[test]
    fn test_stdin_path_is_reserved() {
        assert!(matches!(
            path_to_url("-".to_string()),
            Err(Error::DocumentPathIsStdin)
        ));
    }
}
