use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

use super::error::ValidationError;
use super::record::{FieldOutcome, FileRef, JobRecord, JobState, ValidatedInput};
use super::registry::ValidatorRegistry;

const REQUIRED_KEYS: [&str; 5] = ["inputs", "outputs", "tool", "state", "errMsg"];

/// Validates a batch of raw job records independently.
///
/// The result sequence always has the same length and order as the input; one
/// record's rejection never discards its siblings.
pub fn validate_records(
    records: &[Value],
    registry: &ValidatorRegistry,
) -> Vec<Result<JobRecord, ValidationError>> {
    records
        .iter()
        .enumerate()
        .map(|(index, raw)| validate_record(index, raw, registry))
        .collect()
}

fn validate_record(
    index: usize,
    raw: &Value,
    registry: &ValidatorRegistry,
) -> Result<JobRecord, ValidationError> {
    let record = raw.as_object().ok_or_else(|| ValidationError::Malformed {
        index,
        field: "<record>".to_string(),
        message: "record is not a JSON object".to_string(),
    })?;

    for key in REQUIRED_KEYS {
        if !record.contains_key(key) {
            return Err(ValidationError::Structural { index, key });
        }
    }

    let inputs_raw = record["inputs"]
        .as_object()
        .ok_or_else(|| malformed(index, "inputs", "expected an object"))?;
    let mut inputs = BTreeMap::new();
    for (name, value) in inputs_raw {
        inputs.insert(name.clone(), validate_input(index, name, value, registry)?);
    }

    let outputs = record["outputs"]
        .as_object()
        .ok_or_else(|| malformed(index, "outputs", "expected an object"))?
        .iter()
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    let tool = record["tool"]
        .as_str()
        .ok_or_else(|| malformed(index, "tool", "expected a string"))?
        .to_string();

    let state_raw = record["state"]
        .as_str()
        .ok_or_else(|| malformed(index, "state", "expected a string"))?;
    let state: JobState = state_raw
        .parse()
        .map_err(|_| ValidationError::InvalidState {
            index,
            value: state_raw.to_string(),
        })?;

    let err_msg = record["errMsg"]
        .as_str()
        .ok_or_else(|| malformed(index, "errMsg", "expected a string"))?
        .to_string();

    Ok(JobRecord {
        inputs,
        outputs,
        tool,
        state,
        err_msg,
    })
}

fn validate_input(
    index: usize,
    name: &str,
    value: &Value,
    registry: &ValidatorRegistry,
) -> Result<ValidatedInput, ValidationError> {
    let file: FileRef =
        serde_json::from_value(value.clone()).map_err(|e| ValidationError::Malformed {
            index,
            field: name.to_string(),
            message: e.to_string(),
        })?;

    // Existence is part of FileRef validation, checked before any per-field
    // rule runs.
    if !file.filepath.is_file() {
        return Err(ValidationError::MissingFile {
            index,
            field: name.to_string(),
            path: file.filepath.clone(),
        });
    }

    match registry.get(name) {
        Some(validator) => {
            let file = validator(file).map_err(|reason| ValidationError::Field {
                index,
                field: name.to_string(),
                reason,
            })?;
            Ok(ValidatedInput {
                file,
                outcome: FieldOutcome::Validated,
            })
        }
        None => {
            debug!(
                record = index,
                field = name,
                "No validator registered for input field; passing value through unchanged."
            );
            Ok(ValidatedInput {
                file,
                outcome: FieldOutcome::Passthrough,
            })
        }
    }
}

fn malformed(index: usize, field: &str, message: &str) -> ValidationError {
    ValidationError::Malformed {
        index,
        field: field.to_string(),
        message: message.to_string(),
    }
}
