use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Oastools(#[from] oastools::error::Error),

    #[error("Cannot start logger: {0}")]
    LoggerStart(String),

    #[error("Overlay has no extends url, provide the target document with --spec")]
    MissingTarget,

    #[error("Unknown schema: {0}")]
    UnknownSchema(String),
}
