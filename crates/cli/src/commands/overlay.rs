use clap::Parser;

use crate::error::Error;
use oastools::document::{Document, Url};
use oastools::overlay::{apply, compare, validate, Overlay};

#[derive(Clone, Debug, Parser)]
pub struct Opts {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, Parser)]
enum Command {
    /// Validates an overlay document
    Validate(ValidateOpts),

    /// Applies an overlay to a target document
    Apply(ApplyOpts),

    /// Creates an overlay that transforms one document into another
    Compare(CompareOpts),
}

#[derive(Clone, Debug, Parser)]
struct ValidateOpts {
    /// Path to json/yaml overlay file
    file: String,

    #[clap(flatten)]
    verbose: crate::commands::Verbosity,
}

#[derive(Clone, Debug, Parser)]
struct ApplyOpts {
    /// Path to json/yaml overlay file
    file: String,

    /// Path to the target document, defaults to the overlay's extends file url
    #[clap(long, short)]
    spec: Option<String>,

    /// Fail on unmatched targets and kind mismatches
    #[clap(long)]
    strict: bool,

    #[clap(flatten)]
    output: crate::commands::Output,

    #[clap(flatten)]
    verbose: crate::commands::Verbosity,
}

#[derive(Clone, Debug, Parser)]
struct CompareOpts {
    /// Path to the original json/yaml document
    before: String,

    /// Path to the changed json/yaml document
    after: String,

    #[clap(flatten)]
    output: crate::commands::Output,

    #[clap(flatten)]
    verbose: crate::commands::Verbosity,
}

pub fn execute(opts: Opts) -> Result<(), Error> {
    match opts.command {
        Command::Validate(opts) => {
            opts.verbose.start()?;

            let document = crate::commands::load_document(&opts.file)?;
            let overlay = Overlay::from_tree(document.into_tree())?;

            validate::validate(&overlay)?;

            log::info!("\x1b[0;32mSuccessful validation!\x1b[0m");
            Ok(())
        }
        Command::Apply(opts) => {
            opts.verbose.start()?;

            let document = crate::commands::load_document(&opts.file)?;
            let overlay = Overlay::from_tree(document.into_tree())?;

            let mut target = match &opts.spec {
                Some(path) => crate::commands::load_document(path)?,
                None => {
                    let extends = overlay.extends.as_deref().ok_or(Error::MissingTarget)?;
                    let url = Url::parse(extends).map_err(|_| Error::MissingTarget)?;
                    Document::load_url(url)?
                }
            };

            let report = if opts.strict {
                apply::apply_strict(&overlay, target.tree_mut())?
            } else {
                apply::apply(&overlay, target.tree_mut())?
            };

            for (i, warning) in report.warnings.iter().enumerate() {
                eprintln!("{}. {}", i + 1, warning);
            }

            let root = target
                .tree()
                .root()
                .ok_or(oastools::error::Error::EmptyTree)?;
            opts.output.show(&target.tree().to_json_value(root))
        }
        Command::Compare(opts) => {
            opts.verbose.start()?;

            let before = crate::commands::load_document(&opts.before)?;
            let after = crate::commands::load_document(&opts.after)?;

            let overlay = compare::compare(before.tree(), after.tree())?;
            let tree = overlay.to_tree();
            let root = tree.root().ok_or(oastools::error::Error::EmptyTree)?;

            opts.output.show(&tree.to_json_value(root))
        }
    }
}
