use crate::cli::ValidateArgs;
use crate::error::{CliError, Result};
use mdflow_core::jobs::record::FieldOutcome;
use mdflow_core::jobs::registry::ValidatorRegistry;
use mdflow_core::jobs::validate::validate_records;
use serde_json::{Value, json};
use std::fs::File;
use std::io::BufReader;
use tracing::info;

pub fn run(args: ValidateArgs) -> Result<()> {
    let file = File::open(&args.records)?;
    let raw: Vec<Value> =
        serde_json::from_reader(BufReader::new(file)).map_err(|e| CliError::FileParsing {
            path: args.records.clone(),
            source: e.into(),
        })?;

    let registry = ValidatorRegistry::builtin();
    info!(records = raw.len(), "Validating job records.");
    let results = validate_records(&raw, &registry);

    let failed: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();

    if args.json {
        let report: Vec<Value> = results
            .iter()
            .enumerate()
            .map(|(index, result)| match result {
                Ok(record) => json!({
                    "index": index,
                    "ok": true,
                    "record": record.to_value(),
                }),
                Err(error) => json!({
                    "index": index,
                    "ok": false,
                    "error": error.to_string(),
                }),
            })
            .collect();
        let rendered =
            serde_json::to_string_pretty(&report).map_err(|e| CliError::Other(e.into()))?;
        println!("{}", rendered);
    } else {
        for (index, result) in results.iter().enumerate() {
            match result {
                Ok(record) => {
                    let passthrough = record
                        .inputs
                        .values()
                        .filter(|i| i.outcome == FieldOutcome::Passthrough)
                        .count();
                    let note = if passthrough > 0 {
                        format!(" ({} input(s) passed through unvalidated)", passthrough)
                    } else {
                        String::new()
                    };
                    println!(
                        "record {}: ok - tool {}, state {}{}",
                        index, record.tool, record.state, note
                    );
                }
                Err(error) => println!("record {}: rejected - {}", index, error),
            }
        }
        println!(
            "{} of {} records valid.",
            results.len() - failed.len(),
            results.len()
        );
    }

    match failed.first() {
        Some(&first) => Err(CliError::RecordsRejected {
            failed: failed.len(),
            total: results.len(),
            first: first.clone(),
        }),
        None => Ok(()),
    }
}
