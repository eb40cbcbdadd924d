//! Plain-text report with fixed section headers.

use std::fmt::Write;

use crate::analysis::assess::Tier;
use crate::analysis::report::Report;

pub fn render(report: &Report) -> String {
    let mut out = String::new();

    section(&mut out, "OVERVIEW");
    let _ = writeln!(
        out,
        "Document: {} {} (openapi {})",
        display_or_dash(&report.document_title),
        display_or_dash(&report.document_version),
        display_or_dash(&report.openapi_version),
    );
    let _ = writeln!(
        out,
        "Schemas: {} ({} inline), edges: {}",
        report.summary.total_schemas, report.summary.inline_schemas, report.summary.total_edges
    );
    let _ = writeln!(out, "Dag depth: {}", report.summary.dag_depth);

    section(&mut out, "CYCLE HEALTH");
    let _ = writeln!(
        out,
        "Sccs: {} (largest: {}), schemas in cycles: {:.1}%",
        report.summary.scc_count,
        report.summary.largest_scc_size,
        report.summary.schemas_in_cycles_pct
    );
    let _ = writeln!(
        out,
        "Cycles: {} ({} required-only){}",
        report.cycles.cycles.len(),
        report.summary.required_only_cycles,
        if report.cycles.truncated {
            " [truncated]"
        } else {
            ""
        }
    );
    for cycle in &report.cycles.cycles {
        let marker = if cycle.has_required_only_path {
            "required"
        } else {
            "breakable"
        };
        let _ = writeln!(out, "  {} [{}]", cycle.nodes.join(" -> "), marker);
    }

    section(&mut out, "CODEGEN COMPATIBILITY");
    let _ = writeln!(
        out,
        "Score: {:.1}% (green {}, yellow {}, red {})",
        report.summary.compatibility_score,
        report.codegen.green_count,
        report.codegen.yellow_count,
        report.codegen.red_count
    );
    for (id, difficulty) in &report.codegen.per_node {
        if difficulty.tier == Tier::Green {
            continue;
        }

        let _ = writeln!(out, "  {} [{}]", id, difficulty.tier.label());
        for signal in &difficulty.signals {
            let _ = writeln!(out, "    - {}: {}", signal.id, signal.description);
        }
    }

    section(&mut out, "MOST COMPLEX");
    let _ = writeln!(out, "{:<5} {:<40} {:>6}", "rank", "schema", "score");
    for (i, (id, score)) in report.summary.top_complexity.iter().enumerate() {
        let _ = writeln!(out, "{:<5} {:<40} {:>6}", i + 1, id, score);
    }
    let _ = writeln!(out, "Referenced most: {}", ranking(&report.summary.top_fan_in));
    let _ = writeln!(out, "References most: {}", ranking(&report.summary.top_fan_out));

    section(&mut out, "SUGGESTIONS");
    if report.suggestions.is_empty() {
        out.push_str("nothing to suggest\n");
    }
    for (i, suggestion) in report.suggestions.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. [impact {}] {}",
            i + 1,
            suggestion.impact,
            suggestion.description
        );
    }

    out
}

fn section(out: &mut String, title: &str) {
    if !out.is_empty() {
        out.push('\n');
    }
    out.push_str(title);
    out.push('\n');
    out.push_str(&"=".repeat(title.len()));
    out.push('\n');
}

fn display_or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

fn ranking(top: &[(String, usize)]) -> String {
    if top.is_empty() {
        return "-".to_string();
    }

    top.iter()
        .map(|(id, count)| format!("{} ({})", id, count))
        .collect::<Vec<_>>()
        .join(", ")
}
