use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// A declarative file descriptor: a class/kind tag plus a filesystem path.
///
/// Path existence is checked at validation time, not at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    #[serde(rename = "class")]
    pub kind: String,
    pub filepath: PathBuf,
}

/// Lifecycle state of one job record.
///
/// A closed enum: unknown strings are rejected at validation time instead of
/// being carried around as open text. Terminal states admit no transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Processing,
    Running,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Legal lifecycle transitions. Failure is reachable from any live state.
    pub fn can_transition_to(&self, next: JobState) -> bool {
        match self {
            Self::Queued => matches!(next, Self::Processing | Self::Running | Self::Failed),
            Self::Processing => matches!(next, Self::Running | Self::Completed | Self::Failed),
            Self::Running => matches!(next, Self::Completed | Self::Failed),
            Self::Completed | Self::Failed => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobState {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "processing" => Ok(Self::Processing),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(()),
        }
    }
}

/// Whether an input field was actively validated or passed through because no
/// validator is registered for its name. Recorded so that passthrough is never
/// mistaken for active validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOutcome {
    Validated,
    Passthrough,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedInput {
    pub file: FileRef,
    pub outcome: FieldOutcome,
}

/// One unit of declared computational work, after validation.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    pub inputs: BTreeMap<String, ValidatedInput>,
    /// Output descriptors are accepted structurally, without per-key checks.
    pub outputs: BTreeMap<String, Value>,
    pub tool: String,
    pub state: JobState,
    pub err_msg: String,
}

impl JobRecord {
    /// Re-serializes to the original declarative shape, modulo any transform a
    /// registered field validator applied.
    pub fn to_value(&self) -> Value {
        let inputs: serde_json::Map<String, Value> = self
            .inputs
            .iter()
            .map(|(name, input)| {
                (
                    name.clone(),
                    serde_json::to_value(&input.file).expect("FileRef serialization is infallible"),
                )
            })
            .collect();
        let outputs: serde_json::Map<String, Value> = self
            .outputs
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        json!({
            "inputs": inputs,
            "outputs": outputs,
            "tool": self.tool,
            "state": self.state.as_str(),
            "errMsg": self.err_msg,
        })
    }
}
