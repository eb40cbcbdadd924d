//! Graphviz rendering of the schema reference graph, tier-colored.

use std::fmt::Write;

use crate::analysis::assess::Tier;
use crate::analysis::report::Report;

const GREEN: &str = "#d4edda";
const YELLOW: &str = "#fff3cd";
const RED: &str = "#f8d7da";

pub fn render(report: &Report) -> String {
    let mut out = String::from("digraph schemas {\n");
    out.push_str("  node[shape=box, style=filled];\n");

    for id in report.graph.nodes.keys() {
        let color = report
            .codegen
            .per_node
            .get(id)
            .map(|d| match d.tier {
                Tier::Green => GREEN,
                Tier::Yellow => YELLOW,
                Tier::Red => RED,
            })
            .unwrap_or(GREEN);

        let _ = writeln!(out, "  \"{}\"[fillcolor=\"{}\"];", id, color);
    }

    for edge in &report.graph.edges {
        let label = match &edge.field_name {
            Some(field) => format!("{}:{}", edge.kind.label(), field),
            None => edge.kind.label().to_string(),
        };

        let _ = writeln!(
            out,
            "  \"{}\" -> \"{}\" [label=\"{}\"];",
            edge.from, edge.to, label
        );
    }

    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use crate::tree::Tree;
    use serde_json::json;

    #[test]
    fn test_dot_output_structure() {
        let tree = Tree::from_json_value(&json!({
            "openapi": "3.1.0",
            "components": {
                "schemas": {
                    "A": {
                        "type": "object",
                        "properties": { "b": { "$ref": "#/components/schemas/B" } }
                    },
                    "B": { "anyOf": [ {"type": "string"}, {"type": "integer"} ] }
                }
            }
        }));
        let report = analyze(&tree).unwrap();

        let dot = render(&report);

        assert!(dot.starts_with("digraph schemas {"));
        assert!(dot.contains("node[shape=box, style=filled];"));
        assert!(dot.contains("\"A\" -> \"B\" [label=\"property:b\"];"));
        assert!(dot.contains("\"A\"[fillcolor=\"#d4edda\"];"));
        assert!(dot.contains("\"B\"[fillcolor=\"#f8d7da\"];"));
        assert!(dot.trim_end().ends_with('}'));
    }
}
