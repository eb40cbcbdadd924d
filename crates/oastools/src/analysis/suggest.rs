//! Refactor suggestions, ranked by impact.
//!
//! The cut-edge family uses a greedy minimum-edge heuristic over the
//! enumerated cycles: repeatedly pick the edge participating in the most
//! still-open cycles. Feedback-arc-set is np-hard; greedy is good enough
//! and its picks are pinned by tests on fixture documents.

use std::collections::BTreeMap;

use serde::Serialize;

use super::assess::CodegenReport;
use super::cycles::CycleAnalysis;
use super::graph::Graph;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SuggestionKind {
    CutEdge,
    AddDiscriminator,
    SplitScc,
    ReducePropertyCount,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub kind: SuggestionKind,
    pub description: String,
    /// Cycles broken, scc size, or 1 for per-node cleanups.
    pub impact: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

pub fn suggest(graph: &Graph, cycles: &CycleAnalysis, codegen: &CodegenReport) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();

    suggestions.extend(cut_edges(cycles));

    for (id, difficulty) in &codegen.per_node {
        let sites = difficulty
            .signals
            .iter()
            .filter(|s| s.id == "oneOf-no-discriminator")
            .count();

        if sites > 0 {
            suggestions.push(Suggestion {
                kind: SuggestionKind::AddDiscriminator,
                description: format!(
                    "add a discriminator to {} oneOf site(s) of {}",
                    sites, id
                ),
                impact: sites,
                from: None,
                to: None,
                schema: Some(id.clone()),
            });
        }
    }

    for scc in cycles.sccs.iter().filter(|s| s.members.len() > 2) {
        suggestions.push(Suggestion {
            kind: SuggestionKind::SplitScc,
            description: format!(
                "split the {} mutually-referencing schemas: {}",
                scc.members.len(),
                scc.members.join(", ")
            ),
            impact: scc.members.len(),
            from: None,
            to: None,
            schema: None,
        });
    }

    for (id, node) in &graph.nodes {
        if node.property_count > 30 {
            suggestions.push(Suggestion {
                kind: SuggestionKind::ReducePropertyCount,
                description: format!(
                    "{} has {} direct properties, extract cohesive groups into sub-schemas",
                    id, node.property_count
                ),
                impact: 1,
                from: None,
                to: None,
                schema: Some(id.clone()),
            });
        }
    }

    suggestions.sort_by(|a, b| b.impact.cmp(&a.impact));
    suggestions
}

/// Identity of a representative edge within the cycle list.
type EdgeKey = (String, String, &'static str, Option<String>);

fn cut_edges(cycles: &CycleAnalysis) -> Vec<Suggestion> {
    let mut open: Vec<Vec<EdgeKey>> = cycles
        .cycles
        .iter()
        .map(|cycle| {
            cycle
                .edges
                .iter()
                .map(|e| {
                    (
                        e.from.clone(),
                        e.to.clone(),
                        e.kind.label(),
                        e.field_name.clone(),
                    )
                })
                .collect()
        })
        .collect();

    let edge_required: BTreeMap<EdgeKey, bool> = cycles
        .cycles
        .iter()
        .flat_map(|c| c.edges.iter())
        .map(|e| {
            (
                (
                    e.from.clone(),
                    e.to.clone(),
                    e.kind.label(),
                    e.field_name.clone(),
                ),
                e.is_required,
            )
        })
        .collect();

    let mut suggestions = Vec::new();

    while !open.is_empty() {
        // count how many open cycles each edge participates in; ties break
        // on the lexicographically smallest key for reproducibility
        let mut counts: BTreeMap<&EdgeKey, usize> = BTreeMap::new();
        for cycle in &open {
            for key in cycle {
                *counts.entry(key).or_insert(0) += 1;
            }
        }

        let Some((best, broken)) = counts
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(k, v)| ((*k).clone(), *v))
        else {
            break;
        };

        let advice = if edge_required.get(&best).copied().unwrap_or(false) {
            "optional"
        } else {
            "nullable"
        };

        let field = best
            .3
            .as_ref()
            .map(|f| format!("the \"{}\" {} reference", f, best.2))
            .unwrap_or_else(|| format!("the {} reference", best.2));

        suggestions.push(Suggestion {
            kind: SuggestionKind::CutEdge,
            description: format!(
                "make {} from {} to {} {} to break {} cycle(s)",
                field, best.0, best.1, advice, broken
            ),
            impact: broken,
            from: Some(best.0.clone()),
            to: Some(best.1.clone()),
            schema: None,
        });

        open.retain(|cycle| !cycle.contains(&best));
    }

    suggestions
}
