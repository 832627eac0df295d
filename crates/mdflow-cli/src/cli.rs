use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "mdflow - staged molecular-simulation pipelines and batch job-record validation.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one staged simulation pipeline (build, minimize, equilibrate, produce, finalize).
    Simulate(SimulateArgs),
    /// Validate a batch of job-description records against the declared schema.
    Validate(ValidateArgs),
}

/// Arguments for the `simulate` subcommand.
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Path to the simulation configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    // --- Overrides ---
    /// Override the structural input discovery pattern from the config file.
    #[arg(short, long, value_name = "GLOB")]
    pub input_pattern: Option<String>,

    /// Override the output directory from the config file.
    #[arg(short, long, value_name = "PATH")]
    pub output_dir: Option<PathBuf>,

    /// Override the number of production steps.
    #[arg(short, long, value_name = "INT")]
    pub steps: Option<u64>,

    /// Override the number of equilibration steps.
    #[arg(long, value_name = "INT")]
    pub equilibration_steps: Option<u64>,

    /// Fix the velocity-assignment seed for reproducible trajectories.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,
}

/// Arguments for the `validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to a JSON file holding an array of job records.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub records: PathBuf,

    /// Emit machine-readable JSON results instead of a per-record summary.
    #[arg(long)]
    pub json: bool,
}
