use clap::{Parser, ValueEnum};

use crate::error::Error;
use oastools::analysis::render::{render, OutputFormat, RenderOptions};
use oastools::analysis::analyze;

#[derive(Clone, Debug, Parser)]
pub struct Opts {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, Parser)]
enum Command {
    /// Analyzes the schema reference graph of an openapi document
    Analyze(AnalyzeOpts),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum Format {
    Json,
    Dot,
    Text,
    Mermaid,
    Ascii,
}

#[derive(Clone, Debug, Parser)]
struct AnalyzeOpts {
    /// Path to json/yaml file with openapi specification
    file: String,

    /// Returned format
    #[arg(value_enum, short, long, default_value = "text")]
    output: Format,

    /// Center the mermaid/ascii diagram on this schema
    #[clap(long)]
    ego: Option<String>,

    /// Path of output file, default output to stdout
    #[clap(long)]
    to_file: Option<String>,

    #[clap(flatten)]
    verbose: crate::commands::Verbosity,
}

pub fn execute(opts: Opts) -> Result<(), Error> {
    match opts.command {
        Command::Analyze(opts) => {
            opts.verbose.start()?;

            let document = crate::commands::load_document(&opts.file)?;
            let report = analyze(document.tree())?;

            if let Some(ego) = &opts.ego {
                if !report.graph.nodes.contains_key(ego) {
                    return Err(Error::UnknownSchema(ego.clone()));
                }
            }

            let format = match opts.output {
                Format::Json => OutputFormat::Json,
                Format::Dot => OutputFormat::Dot,
                Format::Text => OutputFormat::Text,
                Format::Mermaid => OutputFormat::Mermaid,
                Format::Ascii => OutputFormat::Ascii,
            };

            let rendered = render(
                &report,
                format,
                &RenderOptions {
                    ego: opts.ego.clone(),
                },
            )?;

            crate::commands::write_result(&rendered, opts.to_file.as_deref())
        }
    }
}
