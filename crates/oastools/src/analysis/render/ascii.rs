//! Ascii box art for terminals: a layered dag overview and an ego view
//! with flagged edge labels.

use std::fmt::Write;

use crate::analysis::graph::Edge;
use crate::analysis::report::Report;

/// Output is clamped to this width; over-long rows wrap.
const MAX_WIDTH: usize = 100;
const MAX_LABEL: usize = 28;

/// Layered dag overview. Non-trivial sccs get double-border boxes, trivial
/// nodes single-border ones.
pub fn overview(report: &Report) -> String {
    let mut out = String::new();

    for (depth, layer) in report.cycles.condensation.layers.iter().enumerate() {
        let _ = writeln!(out, "layer {}", depth);

        let mut row: Vec<(String, bool)> = Vec::new();
        for &scc_index in layer {
            let scc = &report.cycles.sccs[scc_index];
            row.push((clamp(&scc.members.join(", ")), !scc.trivial));
        }

        for chunk in wrap_boxes(&row) {
            render_box_row(&mut out, chunk);
        }
    }

    out
}

/// Neighborhood of one schema, each edge labeled
/// `kind:field [req,null,[]]` with only the applicable flags.
pub fn ego(report: &Report, center: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "ego: {}", clamp(center));

    out.push_str("  in:\n");
    let mut any = false;
    for edge in report.graph.incoming(center) {
        let _ = writeln!(
            out,
            "    {} -{}-> {}",
            clamp(&edge.from),
            edge_label(edge),
            clamp(center)
        );
        any = true;
    }
    if !any {
        out.push_str("    (none)\n");
    }

    out.push_str("  out:\n");
    any = false;
    for edge in report.graph.outgoing(center) {
        let _ = writeln!(
            out,
            "    {} -{}-> {}",
            clamp(center),
            edge_label(edge),
            clamp(&edge.to)
        );
        any = true;
    }
    if !any {
        out.push_str("    (none)\n");
    }

    out
}

fn edge_label(edge: &Edge) -> String {
    let mut label = match &edge.field_name {
        Some(field) => format!("{}:{}", edge.kind.label(), field),
        None => edge.kind.label().to_string(),
    };

    let mut flags = Vec::new();
    if edge.is_required {
        flags.push("req");
    }
    if edge.is_nullable {
        flags.push("null");
    }
    if edge.is_array {
        flags.push("[]");
    }
    if !flags.is_empty() {
        let _ = write!(label, " [{}]", flags.join(","));
    }

    clamp(&label)
}

fn clamp(text: &str) -> String {
    if text.chars().count() <= MAX_LABEL {
        text.to_string()
    } else {
        let cut: String = text.chars().take(MAX_LABEL - 1).collect();
        format!("{}…", cut)
    }
}

/// Splits a row of boxes so each rendered line stays under [`MAX_WIDTH`].
fn wrap_boxes(boxes: &[(String, bool)]) -> Vec<&[(String, bool)]> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut width = 0;

    for (i, (label, _)) in boxes.iter().enumerate() {
        let box_width = label.chars().count() + 4 + 2;

        if i > start && width + box_width > MAX_WIDTH {
            chunks.push(&boxes[start..i]);
            start = i;
            width = 0;
        }
        width += box_width;
    }

    if start < boxes.len() {
        chunks.push(&boxes[start..]);
    }

    chunks
}

fn render_box_row(out: &mut String, boxes: &[(String, bool)]) {
    let mut top = String::new();
    let mut middle = String::new();
    let mut bottom = String::new();

    for (label, double) in boxes {
        let inner = label.chars().count() + 2;

        if *double {
            let _ = write!(top, "╔{}╗  ", "═".repeat(inner));
            let _ = write!(middle, "║ {} ║  ", label);
            let _ = write!(bottom, "╚{}╝  ", "═".repeat(inner));
        } else {
            let _ = write!(top, "┌{}┐  ", "─".repeat(inner));
            let _ = write!(middle, "│ {} │  ", label);
            let _ = write!(bottom, "└{}┘  ", "─".repeat(inner));
        }
    }

    let _ = writeln!(out, "{}", top.trim_end());
    let _ = writeln!(out, "{}", middle.trim_end());
    let _ = writeln!(out, "{}", bottom.trim_end());
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
                    "A": {
                        "type": "object",
                        "required": ["b"],
                        "properties": {
                            "b": { "$ref": "#/components/schemas/B" },
                            "items": { "type": "array", "items": { "$ref": "#/components/schemas/C" } }
                        }
                    },
                    "B": {
                        "type": "object",
                        "properties": { "a": { "$ref": "#/components/schemas/A", "nullable": true } }
                    },
                    "C": { "type": "object" }
                }
            }
        }));

        analyze(&tree).unwrap()
    }

    #[test]
    fn test_overview_uses_double_borders_for_sccs() {
        let out = overview(&report());

        assert!(out.contains("╔"));
        assert!(out.contains("║ A, B ║"));
        assert!(out.contains("│ C │"));
        assert!(out.contains("layer 0"));

        for line in out.lines() {
            assert!(line.chars().count() <= MAX_WIDTH);
        }
    }

    #[test]
    fn test_ego_labels_edges_with_flags() {
        let out = ego(&report(), "A");

        assert!(out.starts_with("ego: A"));
        assert!(out.contains("A -property:b [req]-> B"));
        assert!(out.contains("B -property:a [null]-> A"));
        assert!(out.contains("A -items:items [[]]-> C"));
    }

    #[test]
    fn test_ego_with_no_neighbors() {
        let out = ego(&report(), "C");

        assert!(out.contains("  out:\n    (none)\n"));
    }

    #[test]
    fn test_long_labels_are_clamped() {
        let long = "Averyveryverylongschemaidentifierthatexceedsthelimit";

        assert!(clamp(long).chars().count() <= MAX_LABEL);
        assert!(clamp(long).ends_with('…'));
    }
}
