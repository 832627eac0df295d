use thiserror::Error;

use super::engine::EngineError;
use super::reporter::ReportError;
use std::path::PathBuf;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("no structural input matched pattern '{pattern}'")]
    InputNotFound { pattern: String },

    #[error("invalid input discovery pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("input pattern '{pattern}' matched {count} candidates, but the selection policy requires exactly one")]
    AmbiguousInput { pattern: String, count: usize },

    #[error("failed to build simulation system: {source}")]
    SystemBuild {
        #[source]
        source: EngineError,
    },

    #[error("engine failure during {phase} phase: {source}")]
    Engine {
        phase: &'static str,
        #[source]
        source: EngineError,
    },

    #[error("reporter failure: {source}")]
    Report {
        #[from]
        source: ReportError,
    },

    #[error("failed to write final state to '{path}': {source}", path = path.display())]
    FinalState {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
