//! JSONPath evaluation over the document tree.
//!
//! Two implementations sit behind [`PathEvaluator`]: the historical
//! yaml-path dialect ([`legacy::LegacyPath`]) and an rfc 9535 evaluator
//! ([`rfc9535::Rfc9535Path`]) extended with a trailing `~` property-name
//! selector. Which one an overlay uses is decided by its version and the
//! optional `x-speakeasy-jsonpath` mode field.

pub mod legacy;
pub mod rfc9535;

use crate::error::Error;
use crate::tree::{NodeId, Tree};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathMode {
    Legacy,
    Rfc9535,
}

pub trait PathEvaluator {
    /// Resolves `expr` against the subtree rooted at `root` and returns the
    /// selected node handles in document order, deduplicated by identity.
    /// The evaluator never mutates and never clones the input tree.
    fn query(&self, expr: &str, tree: &Tree, root: NodeId) -> Result<Vec<NodeId>, Error>;
}

/// Evaluator selection: overlay 1.0.0 defaults to legacy (rfc 9535 is
/// opt-in), 1.1.0 and later default to rfc 9535 (legacy is opt-out).
/// Unparsable version strings fall back to legacy.
pub fn mode_for(version: &str, requested: Option<PathMode>) -> PathMode {
    if let Some(mode) = requested {
        return mode;
    }

    match semver::Version::parse(version) {
        Ok(v) if v >= semver::Version::new(1, 1, 0) => PathMode::Rfc9535,
        _ => PathMode::Legacy,
    }
}

pub fn evaluator(mode: PathMode) -> Box<dyn PathEvaluator> {
    match mode {
        PathMode::Legacy => Box::new(legacy::LegacyPath),
        PathMode::Rfc9535 => Box::new(rfc9535::Rfc9535Path),
    }
}

/// True when the expression contains a filter selector (`?` outside of any
/// quoted string), used for the legacy-migration warning.
pub fn has_filter(expr: &str) -> bool {
    let mut quote = None;
    let mut escaped = false;

    for c in expr.chars() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if let Some(q) = quote {
            if c == q {
                quote = None;
            }
        } else if c == '\'' || c == '"' {
            quote = Some(c);
        } else if c == '?' {
            return true;
        }
    }

    false
}
