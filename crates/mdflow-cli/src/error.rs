use mdflow_core::jobs::error::ValidationError;
use mdflow_core::sim::config::ConfigError;
use mdflow_core::sim::error::SimError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Pipeline(#[from] SimError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to parse file '{path}': {source}", path = path.display())]
    FileParsing {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Validation finished with {failed} of {total} records rejected (first: {first})")]
    RecordsRejected {
        failed: usize,
        total: usize,
        first: ValidationError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
