use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot read document: {url}")]
    DocumentRead { url: String },

    #[error("document path is invalid: {path}")]
    DocumentInvalidPath { path: String },

    #[error("document url scheme is not supported: {url}, scheme: {scheme}")]
    DocumentInvalidScheme { url: String, scheme: String },

    #[error("document path - is reserved for stdin only")]
    DocumentPathIsStdin,

    #[error("cannot deserialize yaml document: {0}")]
    DeserializeYaml(serde_yaml::Error),

    #[error("cannot deserialize json document: {0}")]
    DeserializeJson(serde_json::Error),

    #[error("cannot serialize document: {0}")]
    SerializeDocument(String),

    #[error("expected exactly one yaml document, found {0}")]
    MultiDocument(usize),

    #[error("document has no root node")]
    EmptyTree,

    #[error("jsonpath parse error in {expr}: {reason}")]
    PathParse { expr: String, reason: String },

    #[error("overlay format is invalid: {0}")]
    OverlayFormat(String),

    #[error("overlay validation failed:\n{}", numbered(.0))]
    OverlayValidation(Vec<String>),

    #[error("overlay apply failed:\n{}", numbered(.errors))]
    OverlayApply {
        errors: Vec<String>,
        warnings: Vec<String>,
    },

    #[error("key \"{key}\": type mismatch: target is {target} but update is {update}")]
    MergeKeyTypeMismatch {
        key: String,
        target: &'static str,
        update: &'static str,
    },

    #[error("type mismatch: target is {target} but update is {update}")]
    MergeTypeMismatch {
        target: &'static str,
        update: &'static str,
    },

    #[error("action {index}: selected nodes have mixed kinds: {first} and {second}")]
    MixedTargetKinds {
        index: usize,
        first: &'static str,
        second: &'static str,
    },

    #[error("node identity lookup missed, the tree is malformed")]
    DetachedNode,

    #[error("openapi document format is invalid")]
    InvalidOpenapiDocument,
}

fn numbered(items: &[String]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, message)| format!("  {}. {}", i + 1, message))
        .collect::<Vec<_>>()
        .join("\n")
}
