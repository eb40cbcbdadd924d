//! Mermaid diagram views: the condensed dag, per-scc subgraphs, and an ego
//! graph around a chosen schema.

use std::fmt::Write;

use crate::analysis::report::Report;

use super::sanitize;

/// Condensed dag, layered top-down.
pub fn condensed(report: &Report) -> String {
    let mut out = String::from("graph TD\n");

    for (i, scc) in report.cycles.sccs.iter().enumerate() {
        let label = scc.members.join(", ");
        if scc.trivial {
            let _ = writeln!(out, "  scc{}[\"{}\"]", i, label);
        } else {
            let _ = writeln!(out, "  scc{}[[\"{}\"]]", i, label);
        }
    }

    for (from, to) in &report.cycles.condensation.edges {
        let _ = writeln!(out, "  scc{} --> scc{}", from, to);
    }

    out
}

/// One left-right subgraph per non-trivial scc, edges restricted to the
/// component.
pub fn scc_views(report: &Report) -> String {
    let mut out = String::new();

    for scc in report.cycles.sccs.iter().filter(|s| !s.trivial) {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("graph LR\n");

        for member in &scc.members {
            let _ = writeln!(out, "  {}[\"{}\"]", sanitize(member), member);
        }

        for edge in &report.graph.edges {
            let inside = scc.members.iter().any(|m| m == &edge.from)
                && scc.members.iter().any(|m| m == &edge.to);
            if inside {
                let _ = writeln!(
                    out,
                    "  {} -->|{}| {}",
                    sanitize(&edge.from),
                    edge_label(edge.kind.label(), &edge.field_name),
                    sanitize(&edge.to)
                );
            }
        }
    }

    out
}

/// Neighborhood of one schema; the center uses double-circle notation.
pub fn ego(report: &Report, center: &str) -> String {
    let mut out = String::from("graph LR\n");
    let _ = writeln!(out, "  {}((({})))", sanitize(center), center);

    let mut seen = std::collections::BTreeSet::new();
    for edge in &report.graph.edges {
        if edge.from != center && edge.to != center {
            continue;
        }

        for neighbor in [&edge.from, &edge.to] {
            if neighbor != center && seen.insert(neighbor.clone()) {
                let _ = writeln!(out, "  {}[\"{}\"]", sanitize(neighbor), neighbor);
            }
        }

        let _ = writeln!(
            out,
            "  {} -->|{}| {}",
            sanitize(&edge.from),
            edge_label(edge.kind.label(), &edge.field_name),
            sanitize(&edge.to)
        );
    }

    out
}

fn edge_label(kind: &str, field: &Option<String>) -> String {
    match field {
        Some(field) => format!("{}:{}", kind, field),
        None => kind.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use crate::tree::Tree;
    use serde_json::json;

    fn report() -> Report {
        let tree = Tree::from_json_value(&json!({
            "openapi": "3.1.0",
            "components": {
                "schemas": {
                    "x-item": { "type": "object" },
                    "A": {
                        "type": "object",
                        "properties": {
                            "b": { "$ref": "#/components/schemas/B" },
                            "item": { "$ref": "#/components/schemas/x-item" }
                        }
                    },
                    "B": {
                        "type": "object",
                        "properties": { "a": { "$ref": "#/components/schemas/A" } }
                    }
                }
            }
        }));

        analyze(&tree).unwrap()
    }

    #[test]
    fn test_condensed_starts_with_graph_td() {
        let out = condensed(&report());

        assert!(out.starts_with("graph TD"));
        assert!(out.contains("[[\"A, B\"]]"));
        assert!(out.contains("-->"));
    }

    #[test]
    fn test_scc_view_starts_with_graph_lr() {
        let out = scc_views(&report());

        assert!(out.starts_with("graph LR"));
        assert!(out.contains("A -->|property:b| B"));
        assert!(out.contains("B -->|property:a| A"));
    }

    #[test]
    fn test_ego_view_uses_double_circle_and_sanitized_ids() {
        let out = ego(&report(), "A");

        assert!(out.starts_with("graph LR"));
        assert!(out.contains("A(((A)))"));
        // dashes in ids are sanitized but labels keep the original
        assert!(out.contains("x_item[\"x-item\"]"));
        assert!(out.contains("A -->|property:item| x_item"));
    }
}
