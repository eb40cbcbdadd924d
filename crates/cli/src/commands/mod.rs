use std::fs::File;
use std::io::prelude::*;

use clap::Parser;
use env_logger::Builder as LoggerBuilder;
use serde_json::Value;

pub mod overlay;
pub mod spec;

use crate::error::Error;
use oastools::document::{path_to_url, Document};

#[derive(Clone, Debug, Parser)]
pub struct Verbosity {
    /// Verbosity level, increase by multiplying v occurrences (warning, info, debug, trace)
    #[clap(
        long,
        short,
        action = clap::ArgAction::Count
    )]
    verbose: u8,
}

impl Verbosity {
    pub fn start(self: &Verbosity) -> Result<(), Error> {
        LoggerBuilder::new()
            .filter(
                None,
                match self.verbose {
                    4 => log::LevelFilter::Trace,
                    3 => log::LevelFilter::Debug,
                    2 => log::LevelFilter::Info,
                    1 => log::LevelFilter::Warn,
                    0 => log::LevelFilter::Error,
                    _ => log::LevelFilter::Trace,
                },
            )
            .try_init()
            .map_err(|e| Error::LoggerStart(e.to_string()))?;

        Ok(())
    }
}

#[derive(Clone, Debug, Parser)]
pub(crate) struct Output {
    /// Returned format
    #[arg(short, long, default_value = "yaml")]
    output: String,

    /// Path of output file, default output to stdout
    #[clap(long)]
    to_file: Option<String>,
}

impl Output {
    pub fn show(self: &Output, value: &Value) -> Result<(), Error> {
        let result = match self.output.as_str() {
            "json" => serde_json::to_string_pretty(value)
                .map_err(oastools::error::Error::DeserializeJson)?,
            "yaml" => serde_yaml::to_string(value)
                .map_err(|e| oastools::error::Error::SerializeDocument(e.to_string()))?,
            other => {
                return Err(Error::Oastools(oastools::error::Error::SerializeDocument(
                    format!("output format not supported: {}", other),
                )))
            }
        };

        self.write(&result)
    }

    pub fn write(self: &Output, result: &str) -> Result<(), Error> {
        write_result(result, self.to_file.as_deref())
    }
}

pub(crate) fn write_result(result: &str, to_file: Option<&str>) -> Result<(), Error> {
    match to_file {
        Some(filename) => {
            let as_error = |_| {
                Error::Oastools(oastools::error::Error::DocumentInvalidPath {
                    path: filename.to_string(),
                })
            };

            let mut file = File::create(filename).map_err(as_error)?;
            file.write_all(result.as_bytes()).map_err(as_error)?;
        }
        None => {
            println!("{result}");
        }
    };

    Ok(())
}

/// Loads a document from a path; `-` reads stdin.
pub fn load_document(path: &str) -> Result<Document, Error> {
    if path == "-" {
        return Document::from_reader(std::io::stdin()).map_err(Error::Oastools);
    }

    Document::load_url(path_to_url(path.to_string())?).map_err(Error::Oastools)
}
