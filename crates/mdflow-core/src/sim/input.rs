use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, warn};

use super::error::SimError;

/// Policy applied when input discovery yields more than one candidate.
///
/// The historical behavior is first-lexicographic selection, which is
/// deterministic only while the candidate set is stable; `RequireUnique` trades
/// that fragility for a hard failure on ambiguity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionPolicy {
    FirstLexicographic,
    RequireUnique,
}

/// The resolved structural input for one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuralInput {
    pub path: PathBuf,
    /// Every candidate the pattern matched, sorted lexicographically. Kept for
    /// diagnostics so an ambiguous selection can be reported precisely.
    pub candidates: Vec<PathBuf>,
}

/// Resolves the structural input file from a glob pattern.
///
/// Fails fast with [`SimError::InputNotFound`] when nothing matches, before
/// any expensive system construction happens downstream.
pub fn discover(pattern: &str, policy: SelectionPolicy) -> Result<StructuralInput, SimError> {
    let paths = glob::glob(pattern).map_err(|source| SimError::Pattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut candidates: Vec<PathBuf> = paths
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect();
    candidates.sort();

    if candidates.is_empty() {
        return Err(SimError::InputNotFound {
            pattern: pattern.to_string(),
        });
    }

    if candidates.len() > 1 {
        match policy {
            SelectionPolicy::RequireUnique => {
                return Err(SimError::AmbiguousInput {
                    pattern: pattern.to_string(),
                    count: candidates.len(),
                });
            }
            SelectionPolicy::FirstLexicographic => {
                warn!(
                    pattern,
                    count = candidates.len(),
                    "Input pattern is ambiguous; selecting the lexicographically first candidate."
                );
            }
        }
    }

    let path = candidates[0].clone();
    debug!(path = %path.display(), "Structural input resolved.");
    Ok(StructuralInput { path, candidates })
}
