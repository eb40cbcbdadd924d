//! The consolidated analysis report and its json view.

use std::collections::BTreeMap;

use crate::tree::Tree;

use super::assess::CodegenReport;
use super::cycles::CycleAnalysis;
use super::graph::Graph;
use super::metrics::SchemaMetrics;
use super::suggest::Suggestion;

#[derive(Clone, Debug)]
pub struct Report {
    pub document_title: String,
    pub document_version: String,
    pub openapi_version: String,
    pub graph: Graph,
    pub cycles: CycleAnalysis,
    pub metrics: BTreeMap<String, SchemaMetrics>,
    pub codegen: CodegenReport,
    pub suggestions: Vec<Suggestion>,
    pub summary: Summary,
}

#[derive(Clone, Debug, Default)]
pub struct Summary {
    pub total_schemas: usize,
    pub total_edges: usize,
    pub inline_schemas: usize,
    /// Non-trivial strongly-connected components.
    pub scc_count: usize,
    pub largest_scc_size: usize,
    pub schemas_in_cycles_pct: f64,
    pub required_only_cycles: usize,
    pub dag_depth: usize,
    pub compatibility_score: f64,
    pub top_fan_in: Vec<(String, usize)>,
    pub top_fan_out: Vec<(String, usize)>,
    pub top_complexity: Vec<(String, i64)>,
}

const TOP_N: usize = 5;

impl Report {
    pub fn assemble(
        tree: &Tree,
        graph: Graph,
        cycles: CycleAnalysis,
        metrics: BTreeMap<String, SchemaMetrics>,
        codegen: CodegenReport,
        suggestions: Vec<Suggestion>,
    ) -> Report {
        let (document_title, document_version, openapi_version) = document_meta(tree);

        let non_trivial: Vec<_> = cycles.sccs.iter().filter(|s| !s.trivial).collect();
        let in_cycles = metrics.values().filter(|m| m.in_scc).count();
        let total = graph.nodes.len();

        let summary = Summary {
            total_schemas: total,
            total_edges: graph.edges.len(),
            inline_schemas: graph.inline_schemas,
            scc_count: non_trivial.len(),
            largest_scc_size: non_trivial.iter().map(|s| s.members.len()).max().unwrap_or(0),
            schemas_in_cycles_pct: if total == 0 {
                0.0
            } else {
                in_cycles as f64 / total as f64 * 100.0
            },
            required_only_cycles: cycles
                .cycles
                .iter()
                .filter(|c| c.has_required_only_path)
                .count(),
            dag_depth: cycles.condensation.depth,
            compatibility_score: codegen.compatibility_score,
            top_fan_in: top_by(&metrics, |m| m.fan_in),
            top_fan_out: top_by(&metrics, |m| m.fan_out),
            top_complexity: top_by(&metrics, |m| m.complexity_score),
        };

        Report {
            document_title,
            document_version,
            openapi_version,
            graph,
            cycles,
            metrics,
            codegen,
            suggestions,
            summary,
        }
    }

    /// Complexity ranking: score descending, ties on id ascending, 1-based.
    pub fn rank_of(&self, id: &str) -> usize {
        let mut ranked: Vec<(&String, i64)> = self
            .metrics
            .iter()
            .map(|(id, m)| (id, m.complexity_score))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

        ranked.iter().position(|(i, _)| *i == id).map(|p| p + 1).unwrap_or(0)
    }

    /// The stable json rendering of the report.
    pub fn to_json_value(&self) -> serde_json::Value {
        let mut nodes = Vec::new();
        for (id, metrics) in &self.metrics {
            let mut node = match serde_json::to_value(metrics) {
                Ok(serde_json::Value::Object(map)) => map,
                _ => serde_json::Map::new(),
            };

            if let Some(difficulty) = self.codegen.per_node.get(id) {
                node.insert(
                    "codegenTier".to_string(),
                    serde_json::Value::String(difficulty.tier.label().to_string()),
                );
                node.insert(
                    "signals".to_string(),
                    serde_json::to_value(&difficulty.signals).unwrap_or_default(),
                );
            }

            node.insert("rank".to_string(), serde_json::json!(self.rank_of(id)));
            nodes.push(serde_json::Value::Object(node));
        }

        serde_json::json!({
            "documentTitle": self.document_title,
            "documentVersion": self.document_version,
            "openapiVersion": self.openapi_version,
            "totalSchemas": self.summary.total_schemas,
            "totalEdges": self.summary.total_edges,
            "inlineSchemas": self.summary.inline_schemas,
            "sccCount": self.summary.scc_count,
            "largestSccSize": self.summary.largest_scc_size,
            "schemasInCyclesPct": self.summary.schemas_in_cycles_pct,
            "requiredOnlyCycles": self.summary.required_only_cycles,
            "compatibilityScore": self.summary.compatibility_score,
            "dagDepth": self.summary.dag_depth,
            "nodes": nodes,
            "edges": self.graph.edges,
            "cycles": self.cycles.cycles,
            "suggestions": self.suggestions,
        })
    }
}

fn document_meta(tree: &Tree) -> (String, String, String) {
    let Some(root) = tree.content_root() else {
        return (String::new(), String::new(), String::new());
    };

    let info = tree.get(root, "info");
    let title = info
        .and_then(|i| tree.get_str(i, "title"))
        .unwrap_or("")
        .to_string();
    let version = info
        .and_then(|i| tree.get_str(i, "version"))
        .unwrap_or("")
        .to_string();
    let openapi = tree.get_str(root, "openapi").unwrap_or("").to_string();

    (title, version, openapi)
}

fn top_by<V: Ord + Copy>(
    metrics: &BTreeMap<String, SchemaMetrics>,
    key: impl Fn(&SchemaMetrics) -> V,
) -> Vec<(String, V)> {
    let mut all: Vec<(String, V)> = metrics
        .iter()
        .map(|(id, m)| (id.clone(), key(m)))
        .collect();

    // ties break on node id, which BTreeMap iteration already ordered
    all.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    all.truncate(TOP_N);
    all
}
