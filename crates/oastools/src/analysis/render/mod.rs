//! Report renderers: json, graphviz dot, plain text, mermaid diagrams and
//! ascii box art.

pub mod ascii;
pub mod dot;
pub mod mermaid;
pub mod text;

use crate::error::Error;

use super::report::Report;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Dot,
    Text,
    Mermaid,
    Ascii,
}

#[derive(Clone, Debug, Default)]
pub struct RenderOptions {
    /// Center the mermaid/ascii ego view on this schema.
    pub ego: Option<String>,
}

pub fn render(report: &Report, format: OutputFormat, options: &RenderOptions) -> Result<String, Error> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&report.to_json_value())
            .map_err(|e| Error::SerializeDocument(e.to_string())),
        OutputFormat::Dot => Ok(dot::render(report)),
        OutputFormat::Text => Ok(text::render(report)),
        OutputFormat::Mermaid => Ok(match &options.ego {
            Some(id) => mermaid::ego(report, id),
            None => {
                let mut out = mermaid::condensed(report);
                let sccs = mermaid::scc_views(report);
                if !sccs.is_empty() {
                    out.push('\n');
                    out.push_str(&sccs);
                }
                out
            }
        }),
        OutputFormat::Ascii => Ok(match &options.ego {
            Some(id) => ascii::ego(report, id),
            None => ascii::overview(report),
        }),
    }
}

/// Mermaid/dot node id: `-`, `.` and spaces become `_`.
pub(crate) fn sanitize(id: &str) -> String {
    id.replace(['-', '.', ' '], "_")
}
