//! Per-schema metrics and the composite complexity score.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use super::cycles::CycleAnalysis;
use super::graph::Graph;

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaMetrics {
    pub id: String,
    /// Distinct referencing neighbors.
    pub fan_in: usize,
    /// Distinct referenced neighbors.
    pub fan_out: usize,
    pub property_count: usize,
    pub required_count: usize,
    pub nesting_depth: usize,
    pub composition_depth: usize,
    pub has_discriminator: bool,
    pub deep_property_count: usize,
    pub max_union_width: usize,
    /// Multiplicative width across every oneOf/anyOf site.
    pub variant_product: u64,
    pub union_site_count: usize,
    /// Number of enumerated cycles this schema participates in.
    pub cycle_membership: usize,
    pub in_scc: bool,
    pub complexity_score: i64,
    /// Non-zero score contributions, for UIs.
    pub breakdown: Vec<ScoreContribution>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreContribution {
    pub label: &'static str,
    pub amount: i64,
}

pub fn compute_metrics(graph: &Graph, cycles: &CycleAnalysis) -> BTreeMap<String, SchemaMetrics> {
    let mut out = BTreeMap::new();

    for (id, node) in &graph.nodes {
        let fan_in = graph
            .incoming(id)
            .map(|e| e.from.as_str())
            .collect::<HashSet<_>>()
            .len();
        let fan_out = graph
            .outgoing(id)
            .map(|e| e.to.as_str())
            .collect::<HashSet<_>>()
            .len();

        let in_scc = cycles
            .scc_of(id)
            .map(|i| !cycles.sccs[i].trivial)
            .unwrap_or(false);
        let cycle_membership = cycles.cycles_containing(id);

        let max_union_width = node.union_sites.iter().map(|s| s.width).max().unwrap_or(0);
        let variant_product = node
            .union_sites
            .iter()
            .map(|s| s.width.max(1) as u64)
            .product::<u64>()
            .max(1);
        let union_site_count = node.union_sites.len();

        let mut metrics = SchemaMetrics {
            id: id.clone(),
            fan_in,
            fan_out,
            property_count: node.property_count,
            required_count: node.required_count,
            nesting_depth: node.nesting_depth,
            composition_depth: node.composition_depth,
            has_discriminator: node.has_discriminator,
            deep_property_count: node.deep_property_count,
            max_union_width,
            variant_product,
            union_site_count,
            cycle_membership,
            in_scc,
            ..SchemaMetrics::default()
        };

        score(&mut metrics);
        out.insert(id.clone(), metrics);
    }

    out
}

/// The authoritative composite score. Both the scalar and the named
/// breakdown are exposed so interfaces can show contributions.
fn score(metrics: &mut SchemaMetrics) {
    let mut contributions: Vec<ScoreContribution> = Vec::new();
    let mut push = |label: &'static str, amount: i64| {
        if amount != 0 {
            contributions.push(ScoreContribution { label, amount });
        }
    };

    push("fan-in", metrics.fan_in as i64);
    push("fan-out", metrics.fan_out as i64);
    push("deep-properties", metrics.deep_property_count as i64);
    push("composition-depth", 3 * metrics.composition_depth as i64);
    push("nesting-depth", 2 * metrics.nesting_depth as i64);

    if metrics.in_scc {
        push("in-scc", 10);
    }

    push("cycle-membership", 5 * metrics.cycle_membership as i64);

    if metrics.variant_product > 1 {
        push("variant-product", 5 * metrics.variant_product.ilog2() as i64);
    }

    if metrics.union_site_count > 1 {
        push("union-sites", 3 * metrics.union_site_count as i64);
    }

    metrics.complexity_score = contributions.iter().map(|c| c.amount).sum();
    metrics.breakdown = contributions;
}
