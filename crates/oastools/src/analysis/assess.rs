//! Code-generation difficulty assessment: pattern signals fire per schema,
//! the worst severity decides the tier.

use std::collections::BTreeMap;

use serde::Serialize;

use super::cycles::CycleAnalysis;
use super::graph::{EdgeKind, Graph, UnionKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Tier {
    Green,
    Yellow,
    Red,
}

impl Tier {
    pub fn label(&self) -> &'static str {
        match self {
            Tier::Green => "green",
            Tier::Yellow => "yellow",
            Tier::Red => "red",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    pub id: &'static str,
    pub severity: Tier,
    pub description: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Difficulty {
    pub tier: Tier,
    pub signals: Vec<Signal>,
}

#[derive(Clone, Debug, Default)]
pub struct CodegenReport {
    pub per_node: BTreeMap<String, Difficulty>,
    pub green_count: usize,
    pub yellow_count: usize,
    pub red_count: usize,
    /// Percentage of green schemas, 0..=100.
    pub compatibility_score: f64,
}

pub fn assess(graph: &Graph, cycles: &CycleAnalysis) -> CodegenReport {
    let mut report = CodegenReport::default();

    for (id, node) in &graph.nodes {
        let mut signals = Vec::new();

        let my_cycles: Vec<_> = cycles
            .cycles
            .iter()
            .filter(|c| c.nodes.iter().any(|n| n == id))
            .collect();

        if my_cycles.iter().any(|c| c.has_required_only_path) {
            signals.push(Signal {
                id: "required-cycle",
                severity: Tier::Red,
                description: "participates in a reference cycle where every edge is required"
                    .to_string(),
            });
        } else if !my_cycles.is_empty() {
            signals.push(Signal {
                id: "optional-cycle",
                severity: Tier::Yellow,
                description: "participates in a reference cycle that has break points".to_string(),
            });
        }

        for site in &node.union_sites {
            if site.kind == UnionKind::OneOf && !site.has_discriminator {
                signals.push(Signal {
                    id: "oneOf-no-discriminator",
                    severity: Tier::Yellow,
                    description: format!(
                        "oneOf with {} alternatives at {} has no discriminator",
                        site.width, site.path
                    ),
                });
            }
        }

        if node.union_sites.iter().any(|s| s.kind == UnionKind::AnyOf) {
            signals.push(Signal {
                id: "anyOf",
                severity: Tier::Red,
                description: "anyOf allows overlapping alternatives most generators cannot express"
                    .to_string(),
            });
        }

        for site in node.union_sites.iter().filter(|s| s.width > 5) {
            signals.push(Signal {
                id: "large-union",
                severity: Tier::Yellow,
                description: format!(
                    "union of width {} at {} is hard to map onto one type",
                    site.width, site.path
                ),
            });
        }

        if node.union_sites.len() >= 2 {
            let product: u64 = node
                .union_sites
                .iter()
                .map(|s| s.width.max(1) as u64)
                .product();

            if product > 100 {
                signals.push(Signal {
                    id: "combinatorial-explosion",
                    severity: Tier::Red,
                    description: format!("{} variant combinations across union sites", product),
                });
            } else if product > 20 {
                signals.push(Signal {
                    id: "combinatorial-explosion",
                    severity: Tier::Yellow,
                    description: format!("{} variant combinations across union sites", product),
                });
            }
        }

        let non_null_types = node.types.iter().filter(|t| *t != "null").count();
        if non_null_types > 1 {
            signals.push(Signal {
                id: "mixed-types",
                severity: Tier::Red,
                description: format!("declares {} non-null types", non_null_types),
            });
        }

        let has_additional = graph
            .outgoing(id)
            .any(|e| e.kind == EdgeKind::AdditionalProperties);
        if has_additional && node.property_count >= 1 {
            signals.push(Signal {
                id: "mixed-map-struct",
                severity: Tier::Yellow,
                description: "mixes named properties with additionalProperties".to_string(),
            });
        }

        let all_of_edges = graph.outgoing(id).filter(|e| e.kind == EdgeKind::AllOf).count();
        if all_of_edges > 2 {
            signals.push(Signal {
                id: "deep-allOf",
                severity: Tier::Yellow,
                description: format!("composed from {} allOf parents", all_of_edges),
            });
        }

        if node.property_count > 30 {
            signals.push(Signal {
                id: "high-property-count",
                severity: Tier::Yellow,
                description: format!("{} direct properties", node.property_count),
            });
        }

        let tier = signals
            .iter()
            .map(|s| s.severity)
            .max()
            .unwrap_or(Tier::Green);

        match tier {
            Tier::Green => report.green_count += 1,
            Tier::Yellow => report.yellow_count += 1,
            Tier::Red => report.red_count += 1,
        }

        report.per_node.insert(id.clone(), Difficulty { tier, signals });
    }

    let total = graph.nodes.len();
    report.compatibility_score = if total == 0 {
        100.0
    } else {
        report.green_count as f64 / total as f64 * 100.0
    };

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::cycles::analyze_cycles;
    use crate::analysis::graph::build_graph;
    use crate::tree::Tree;
    use serde_json::json;

    fn report_of(schemas: serde_json::Value) -> CodegenReport {
        let tree = Tree::from_json_value(&json!({
            "openapi": "3.1.0",
            "components": { "schemas": schemas }
        }));
        let graph = build_graph(&tree).unwrap();
        let cycles = analyze_cycles(&graph);

        assess(&graph, &cycles)
    }

    fn ref_to(name: &str) -> serde_json::Value {
        json!({ "$ref": format!("#/components/schemas/{}", name) })
    }

    fn signal_ids(report: &CodegenReport, id: &str) -> Vec<&'static str> {
        report.per_node[id].signals.iter().map(|s| s.id).collect()
    }

    #[test]
    fn test_plain_schema_is_green() {
        let report = report_of(json!({
            "Simple": { "type": "object", "properties": { "a": { "type": "string" } } }
        }));

        assert_eq!(report.per_node["Simple"].tier, Tier::Green);
        assert_eq!(report.compatibility_score, 100.0);
    }

    #[test]
    fn test_nullable_cycle_is_yellow() {
        // scenario: required edge one way, optional back edge
        let report = report_of(json!({
            "A": { "type": "object", "required": ["b"], "properties": { "b": ref_to("B") } },
            "B": { "type": "object", "properties": { "a": ref_to("A") } }
        }));

        assert_eq!(report.per_node["A"].tier, Tier::Yellow);
        assert_eq!(report.per_node["B"].tier, Tier::Yellow);
        assert_eq!(signal_ids(&report, "A"), vec!["optional-cycle"]);
    }

    #[test]
    fn test_required_cycle_is_red() {
        let report = report_of(json!({
            "Person": {
                "type": "object",
                "required": ["company"],
                "properties": { "company": ref_to("Company") }
            },
            "Company": {
                "type": "object",
                "required": ["owner"],
                "properties": { "owner": ref_to("Person") }
            }
        }));

        assert_eq!(report.per_node["Person"].tier, Tier::Red);
        assert_eq!(report.per_node["Company"].tier, Tier::Red);
        assert_eq!(signal_ids(&report, "Person"), vec!["required-cycle"]);
    }

    #[test]
    fn test_one_of_without_discriminator() {
        let report = report_of(json!({
            "Animal": {
                "oneOf": [ { "type": "object" }, { "type": "string" } ]
            }
        }));

        assert_eq!(report.per_node["Animal"].tier, Tier::Yellow);
        let signal = &report.per_node["Animal"].signals[0];
        assert_eq!(signal.id, "oneOf-no-discriminator");
        assert!(signal.description.contains("2 alternatives"));
        assert!(signal.description.contains("root"));
    }

    #[test]
    fn test_one_of_with_discriminator_is_green() {
        let report = report_of(json!({
            "Animal": {
                "oneOf": [ { "type": "object" }, { "type": "object" } ],
                "discriminator": { "propertyName": "kind" }
            }
        }));

        assert_eq!(report.per_node["Animal"].tier, Tier::Green);
    }

    #[test]
    fn test_any_of_is_red() {
        let report = report_of(json!({
            "Loose": { "anyOf": [ { "type": "string" }, { "type": "integer" } ] }
        }));

        assert_eq!(report.per_node["Loose"].tier, Tier::Red);
        assert!(signal_ids(&report, "Loose").contains(&"anyOf"));
    }

    #[test]
    fn test_large_union() {
        let report = report_of(json!({
            "Wide": {
                "oneOf": [
                    {"type":"object"}, {"type":"string"}, {"type":"integer"},
                    {"type":"number"}, {"type":"boolean"}, {"type":"array"}
                ],
                "discriminator": { "propertyName": "kind" }
            }
        }));

        assert!(signal_ids(&report, "Wide").contains(&"large-union"));
    }

    #[test]
    fn test_combinatorial_explosion_tiers() {
        let five = json!([
            {"type":"object"}, {"type":"string"}, {"type":"integer"},
            {"type":"number"}, {"type":"boolean"}
        ]);

        // 5 * 5 = 25 -> yellow
        let yellow = report_of(json!({
            "Y": {
                "type": "object",
                "properties": {
                    "a": { "oneOf": five, "discriminator": { "propertyName": "k" } },
                    "b": { "oneOf": five, "discriminator": { "propertyName": "k" } }
                }
            }
        }));
        let signal = yellow.per_node["Y"]
            .signals
            .iter()
            .find(|s| s.id == "combinatorial-explosion")
            .unwrap();
        assert_eq!(signal.severity, Tier::Yellow);
        assert!(signal.description.contains("25"));

        // 5 * 5 * 5 = 125 -> red
        let red = report_of(json!({
            "R": {
                "type": "object",
                "properties": {
                    "a": { "oneOf": five, "discriminator": { "propertyName": "k" } },
                    "b": { "oneOf": five, "discriminator": { "propertyName": "k" } },
                    "c": { "oneOf": five, "discriminator": { "propertyName": "k" } }
                }
            }
        }));
        let signal = red.per_node["R"]
            .signals
            .iter()
            .find(|s| s.id == "combinatorial-explosion")
            .unwrap();
        assert_eq!(signal.severity, Tier::Red);
    }

    #[test]
    fn test_mixed_types_is_red() {
        let report = report_of(json!({
            "Mixed": { "type": ["string", "integer"] }
        }));

        assert!(signal_ids(&report, "Mixed").contains(&"mixed-types"));
        assert_eq!(report.per_node["Mixed"].tier, Tier::Red);
    }

    #[test]
    fn test_nullable_type_array_is_not_mixed() {
        let report = report_of(json!({
            "Nullable": { "type": ["string", "null"] }
        }));

        assert_eq!(report.per_node["Nullable"].tier, Tier::Green);
    }

    #[test]
    fn test_mixed_map_struct() {
        let report = report_of(json!({
            "M": {
                "type": "object",
                "properties": { "known": { "type": "string" } },
                "additionalProperties": ref_to("V")
            },
            "V": { "type": "object" }
        }));

        assert!(signal_ids(&report, "M").contains(&"mixed-map-struct"));
    }

    #[test]
    fn test_deep_all_of() {
        let report = report_of(json!({
            "D": {
                "allOf": [ ref_to("A"), ref_to("B"), ref_to("C") ]
            },
            "A": { "type": "object" },
            "B": { "type": "object" },
            "C": { "type": "object" }
        }));

        assert!(signal_ids(&report, "D").contains(&"deep-allOf"));
    }

    #[test]
    fn test_high_property_count() {
        let mut props = serde_json::Map::new();
        for i in 0..31 {
            props.insert(format!("p{}", i), json!({ "type": "string" }));
        }

        let report = report_of(json!({ "Big": { "type": "object", "properties": props } }));

        assert_eq!(report.per_node["Big"].tier, Tier::Yellow);
        let signal = &report.per_node["Big"].signals[0];
        assert_eq!(signal.id, "high-property-count");
        assert!(signal.description.contains("31"));
    }

    #[test]
    fn test_compatibility_score() {
        let report = report_of(json!({
            "Good": { "type": "object" },
            "AlsoGood": { "type": "string" },
            "Bad": { "anyOf": [ {"type": "string"}, {"type": "integer"} ] },
            "Ugly": { "type": ["string", "integer"] }
        }));

        assert_eq!(report.green_count, 2);
        assert_eq!(report.red_count, 2);
        assert_eq!(report.compatibility_score, 50.0);
    }
}
