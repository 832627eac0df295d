use std::path::PathBuf;
use thiserror::Error;

/// A rejection of one record, tagged with the record's position in the batch
/// and the offending field.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ValidationError {
    #[error("record {index}: missing required key '{key}'")]
    Structural { index: usize, key: &'static str },

    #[error("record {index}: field '{field}' is malformed: {message}")]
    Malformed {
        index: usize,
        field: String,
        message: String,
    },

    #[error("record {index}: input '{field}' references missing file '{path}'", path = path.display())]
    MissingFile {
        index: usize,
        field: String,
        path: PathBuf,
    },

    #[error("record {index}: unknown lifecycle state '{value}'")]
    InvalidState { index: usize, value: String },

    #[error("record {index}: input '{field}' rejected: {reason}")]
    Field {
        index: usize,
        field: String,
        reason: String,
    },
}

impl ValidationError {
    /// The batch index of the record this error belongs to.
    pub fn index(&self) -> usize {
        match self {
            Self::Structural { index, .. }
            | Self::Malformed { index, .. }
            | Self::MissingFile { index, .. }
            | Self::InvalidState { index, .. }
            | Self::Field { index, .. } => *index,
        }
    }
}
