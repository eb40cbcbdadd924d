//! Schema reference graph extraction and complexity analysis.
//!
//! The analyzer is a staged pipeline over a parsed openapi tree:
//! build graph, find sccs, enumerate cycles, compute metrics, assess
//! code-generation difficulty, generate suggestions, summarize. It never
//! mutates its input.

pub mod assess;
pub mod cycles;
pub mod graph;
pub mod metrics;
pub mod render;
pub mod report;
pub mod suggest;

use crate::error::Error;
use crate::tree::Tree;

pub use report::Report;

pub fn analyze(tree: &Tree) -> Result<Report, Error> {
    let graph = graph::build_graph(tree)?;
    let cycles = cycles::analyze_cycles(&graph);
    let metrics = metrics::compute_metrics(&graph, &cycles);
    let codegen = assess::assess(&graph, &cycles);
    let suggestions = suggest::suggest(&graph, &cycles, &codegen);

    Ok(Report::assemble(
        tree,
        graph,
        cycles,
        metrics,
        codegen,
        suggestions,
    ))
}
