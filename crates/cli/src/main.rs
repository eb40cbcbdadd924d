use clap::{Parser, Subcommand};

pub mod commands;
pub mod error;

#[derive(Parser)]
#[command(author, version, about)]
struct Opts {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Overlay validation, application and comparison
    Overlay(commands::overlay::Opts),

    /// Openapi document analysis
    Spec(commands::spec::Opts),
}

fn main() {
    let opts: Opts = Opts::parse();

    let result = match opts.command {
        Command::Overlay(opts) => commands::overlay::execute(opts),
        Command::Spec(opts) => commands::spec::execute(opts),
    };

    std::process::exit(match result {
        Ok(_) => 0,
        Err(e) => {
            println!("\x1b[0;31mError occurred:\x1b[0m {e}");
            1
        }
    })
}
