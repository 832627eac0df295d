use crate::cli::SimulateArgs;
use crate::config::FileSimulationConfig;
use crate::error::Result;
use crate::progress::CliProgressHandler;
use mdflow_core::sim::config::ComputePlatform;
use mdflow_core::sim::engine::NullEngine;
use mdflow_core::sim::pipeline;
use mdflow_core::sim::progress::ProgressReporter;
use mdflow_core::sim::reporter;
use tracing::{info, warn};

pub fn run(args: SimulateArgs) -> Result<()> {
    let file_config = FileSimulationConfig::from_file(&args.config)?;
    info!("Merging configuration from file and CLI arguments...");
    let config = file_config.into_core(&args)?;

    if config.platform.platform != ComputePlatform::Reference {
        warn!(
            platform = ?config.platform.platform,
            "No compute backend is linked into this build; falling back to the reference engine."
        );
    }
    let mut engine = NullEngine::new();

    let reporters = reporter::standard_suite(&config.reporting);
    let progress_handler = CliProgressHandler::new();
    let progress = ProgressReporter::with_callback(progress_handler.callback());

    println!("Starting simulation pipeline...");
    info!(
        pattern = %config.input.pattern,
        equilibration = config.run.equilibration_steps,
        production = config.run.production_steps,
        "Invoking the core pipeline."
    );

    let final_state = pipeline::run(&config, &mut engine, reporters, &progress)?;

    println!(
        "Simulation complete, final state written to {}",
        final_state.artifact_path.display()
    );
    Ok(())
}
