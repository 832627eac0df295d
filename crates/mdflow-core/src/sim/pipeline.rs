use std::fmt;
use std::time::Instant;
use tracing::{info, instrument};

use super::config::SimulationConfig;
use super::engine::{EngineError, SimulationEngine};
use super::error::SimError;
use super::input::{self, StructuralInput};
use super::output::{self, FinalState};
use super::progress::{Progress, ProgressReporter};
use super::reporter::{ReportContext, Reporter};

pub const FINAL_STATE_FILENAME: &str = "final_state.xyz";

/// The ordered stages of one pipeline run. Strictly sequential: no phase is
/// skipped, repeated, or reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelinePhase {
    Build,
    Minimize,
    Equilibrate,
    Produce,
    Finalize,
}

impl PipelinePhase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Build => "Build",
            Self::Minimize => "Minimize",
            Self::Equilibrate => "Equilibrate",
            Self::Produce => "Produce",
            Self::Finalize => "Finalize",
        }
    }
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn engine_failure(phase: PipelinePhase) -> impl FnOnce(EngineError) -> SimError {
    move |source| SimError::Engine {
        phase: phase.name(),
        source,
    }
}

/// Drives one simulation through its five phases and emits the final-state
/// artifact.
///
/// Reporters are attached only for the production phase; equilibration runs
/// unobserved. Any failure during discovery or build aborts before a single
/// output sink is opened, so no partial artifacts are left behind.
#[instrument(skip_all, name = "simulation_pipeline")]
pub fn run(
    config: &SimulationConfig,
    engine: &mut dyn SimulationEngine,
    mut reporters: Vec<Box<dyn Reporter>>,
    progress: &ProgressReporter,
) -> Result<FinalState, SimError> {
    info!(pattern = %config.input.pattern, "Discovering structural input.");
    let structural_input = input::discover(&config.input.pattern, config.input.policy)?;
    info!(path = %structural_input.path.display(), "Structural input selected.");

    build_system(config, engine, &structural_input, progress)?;
    minimize(engine, progress)?;
    equilibrate(config, engine, progress)?;
    produce(config, engine, &mut reporters, progress)?;
    finalize(config, engine, progress)
}

fn build_system(
    config: &SimulationConfig,
    engine: &mut dyn SimulationEngine,
    structural_input: &StructuralInput,
    progress: &ProgressReporter,
) -> Result<(), SimError> {
    progress.report(Progress::PhaseStart {
        phase: PipelinePhase::Build,
    });
    info!("Building system...");

    engine
        .build(structural_input, config)
        .map_err(|source| SimError::SystemBuild { source })?;

    progress.report(Progress::PhaseFinish);
    Ok(())
}

fn minimize(engine: &mut dyn SimulationEngine, progress: &ProgressReporter) -> Result<(), SimError> {
    progress.report(Progress::PhaseStart {
        phase: PipelinePhase::Minimize,
    });
    info!("Performing energy minimization...");

    engine
        .minimize()
        .map_err(engine_failure(PipelinePhase::Minimize))?;

    progress.report(Progress::PhaseFinish);
    Ok(())
}

fn equilibrate(
    config: &SimulationConfig,
    engine: &mut dyn SimulationEngine,
    progress: &ProgressReporter,
) -> Result<(), SimError> {
    progress.report(Progress::PhaseStart {
        phase: PipelinePhase::Equilibrate,
    });
    let steps = config.run.equilibration_steps;
    info!(steps, "Equilibrating...");

    // Velocity assignment runs even for zero steps: it is the deterministic
    // RNG anchor shared by configs that differ only in downstream step counts.
    engine
        .assign_velocities(
            config.integrator.temperature_k,
            config.integrator.random_seed,
        )
        .map_err(engine_failure(PipelinePhase::Equilibrate))?;
    engine
        .advance(steps)
        .map_err(engine_failure(PipelinePhase::Equilibrate))?;

    progress.report(Progress::PhaseFinish);
    Ok(())
}

fn produce(
    config: &SimulationConfig,
    engine: &mut dyn SimulationEngine,
    reporters: &mut [Box<dyn Reporter>],
    progress: &ProgressReporter,
) -> Result<(), SimError> {
    progress.report(Progress::PhaseStart {
        phase: PipelinePhase::Produce,
    });
    let total = config.run.production_steps;
    info!(steps = total, reporters = reporters.len(), "Simulating...");

    // The step counter restarts at zero here: reporter intervals are relative
    // to production start, not to the steps equilibration already consumed.
    progress.report(Progress::StepsStart { total });
    let start = Instant::now();
    let mut step: u64 = 0;

    while step < total {
        let next_due = reporters
            .iter()
            .filter(|r| r.interval() > 0)
            .map(|r| step + (r.interval() - step % r.interval()))
            .min()
            .unwrap_or(total)
            .min(total);

        engine
            .advance(next_due - step)
            .map_err(engine_failure(PipelinePhase::Produce))?;
        step = next_due;

        let ctx = ReportContext {
            step,
            total_steps: total,
            time_ps: step as f64 * config.integrator.timestep_ps,
            elapsed: start.elapsed(),
        };
        for reporter in reporters.iter_mut() {
            if reporter.interval() > 0 && step % reporter.interval() == 0 {
                reporter.report(&ctx, &mut *engine)?;
            }
        }
        progress.report(Progress::StepsAdvance { completed: step });
    }

    for reporter in reporters.iter_mut() {
        reporter.finish()?;
    }
    progress.report(Progress::StepsFinish);
    progress.report(Progress::PhaseFinish);
    Ok(())
}

fn finalize(
    config: &SimulationConfig,
    engine: &mut dyn SimulationEngine,
    progress: &ProgressReporter,
) -> Result<FinalState, SimError> {
    progress.report(Progress::PhaseStart {
        phase: PipelinePhase::Finalize,
    });

    let wrap = engine.uses_periodic_boundaries();
    let positions = engine
        .positions(wrap)
        .map_err(engine_failure(PipelinePhase::Finalize))?;
    let labels = engine
        .atom_labels()
        .map_err(engine_failure(PipelinePhase::Finalize))?;

    let artifact = config.reporting.output_dir.join(FINAL_STATE_FILENAME);
    let final_state = output::write_final_state(&artifact, &labels, &positions)?;

    info!(
        path = %final_state.artifact_path.display(),
        atoms = final_state.atom_count,
        "Simulation complete; final state written."
    );
    progress.report(Progress::Message(format!(
        "Simulation complete, final state written to {}",
        final_state.artifact_path.display()
    )));
    progress.report(Progress::PhaseFinish);
    Ok(final_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::engine::Observables;
    use crate::sim::reporter::{ReportError, standard_suite};
    use nalgebra::Point3;
    use std::cell::RefCell;
    use std::io::Write as _;
    use std::path::Path;
    use std::rc::Rc;

    #[derive(Default)]
    struct ScriptedEngine {
        calls: Rc<RefCell<Vec<String>>>,
        fail_build: bool,
        fail_advance_after: Option<u64>,
        advanced: u64,
    }

    impl ScriptedEngine {
        fn new(calls: Rc<RefCell<Vec<String>>>) -> Self {
            Self {
                calls,
                ..Self::default()
            }
        }

        fn log(&self, entry: String) {
            self.calls.borrow_mut().push(entry);
        }
    }

    impl SimulationEngine for ScriptedEngine {
        fn build(
            &mut self,
            _input: &StructuralInput,
            _config: &SimulationConfig,
        ) -> Result<(), EngineError> {
            self.log("build".to_string());
            if self.fail_build {
                Err(EngineError::Parameterization {
                    name: "amber14-all.xml".to_string(),
                    message: "unmatched residue template".to_string(),
                })
            } else {
                Ok(())
            }
        }

        fn minimize(&mut self) -> Result<(), EngineError> {
            self.log("minimize".to_string());
            Ok(())
        }

        fn assign_velocities(
            &mut self,
            temperature_k: f64,
            _seed: Option<u64>,
        ) -> Result<(), EngineError> {
            self.log(format!("assign_velocities:{}", temperature_k));
            Ok(())
        }

        fn advance(&mut self, steps: u64) -> Result<(), EngineError> {
            self.log(format!("advance:{}", steps));
            self.advanced += steps;
            if let Some(limit) = self.fail_advance_after {
                if self.advanced > limit {
                    return Err(EngineError::Integration {
                        step: self.advanced,
                        message: "particle coordinate is NaN".to_string(),
                    });
                }
            }
            Ok(())
        }

        fn observables(&self) -> Result<Observables, EngineError> {
            Ok(Observables::default())
        }

        fn positions(&self, _wrap_periodic: bool) -> Result<Vec<Point3<f64>>, EngineError> {
            Ok(vec![Point3::new(0.0, 0.0, 0.0)])
        }

        fn atom_labels(&self) -> Result<Vec<String>, EngineError> {
            Ok(vec!["C".to_string()])
        }

        fn checkpoint(&self) -> Result<Vec<u8>, EngineError> {
            Ok(vec![0u8; 8])
        }

        fn uses_periodic_boundaries(&self) -> bool {
            false
        }
    }

    struct RecordingReporter {
        interval: u64,
        fired_at: Rc<RefCell<Vec<u64>>>,
    }

    impl Reporter for RecordingReporter {
        fn interval(&self) -> u64 {
            self.interval
        }

        fn describe(&self) -> &'static str {
            "recording"
        }

        fn report(
            &mut self,
            ctx: &ReportContext,
            _engine: &mut dyn SimulationEngine,
        ) -> Result<(), ReportError> {
            self.fired_at.borrow_mut().push(ctx.step);
            Ok(())
        }
    }

    fn fixture_config(dir: &Path, equilibration: u64, production: u64) -> SimulationConfig {
        let input = dir.join("protein.pdb");
        let mut file = std::fs::File::create(&input).unwrap();
        writeln!(
            file,
            "ATOM      1  CA  ALA A   1       0.000   0.000   0.000  1.00  0.00           C"
        )
        .unwrap();

        SimulationConfig::builder()
            .input_pattern(format!("{}/*.pdb", dir.display()))
            .forcefields(vec!["amber14-all.xml".to_string()])
            .equilibration_steps(equilibration)
            .production_steps(production)
            .output_dir(dir.join("outputs"))
            .random_seed(Some(42))
            .build()
            .unwrap()
    }

    #[test]
    fn phases_run_in_order_and_velocities_are_assigned_for_zero_equilibration() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixture_config(dir.path(), 0, 6);
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut engine = ScriptedEngine::new(calls.clone());

        let final_state =
            run(&config, &mut engine, Vec::new(), &ProgressReporter::new()).unwrap();

        assert_eq!(
            *calls.borrow(),
            vec![
                "build",
                "minimize",
                "assign_velocities:310",
                "advance:0",
                "advance:6",
            ]
        );
        assert!(final_state.artifact_path.exists());
        assert_eq!(final_state.atom_count, 1);
    }

    #[test]
    fn reporter_step_counter_is_production_relative() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixture_config(dir.path(), 7, 10);
        let mut engine = ScriptedEngine::new(Rc::new(RefCell::new(Vec::new())));
        let fired_at = Rc::new(RefCell::new(Vec::new()));
        let reporters: Vec<Box<dyn Reporter>> = vec![Box::new(RecordingReporter {
            interval: 5,
            fired_at: fired_at.clone(),
        })];

        run(&config, &mut engine, reporters, &ProgressReporter::new()).unwrap();

        // 7 equilibration steps do not shift production intervals.
        assert_eq!(*fired_at.borrow(), vec![5, 10]);
    }

    #[test]
    fn production_advances_in_blocks_between_report_boundaries() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixture_config(dir.path(), 0, 12);
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut engine = ScriptedEngine::new(calls.clone());
        let reporters: Vec<Box<dyn Reporter>> = vec![Box::new(RecordingReporter {
            interval: 5,
            fired_at: Rc::new(RefCell::new(Vec::new())),
        })];

        run(&config, &mut engine, reporters, &ProgressReporter::new()).unwrap();

        let advances: Vec<String> = calls
            .borrow()
            .iter()
            .filter(|c| c.starts_with("advance"))
            .cloned()
            .collect();
        assert_eq!(
            advances,
            vec!["advance:0", "advance:5", "advance:5", "advance:2"]
        );
    }

    #[test]
    fn discovery_failure_leaves_no_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let config = SimulationConfig::builder()
            .input_pattern(format!("{}/*.pdb", dir.path().display()))
            .forcefields(vec!["amber14-all.xml".to_string()])
            .production_steps(10)
            .output_dir(dir.path().join("outputs"))
            .build()
            .unwrap();
        let mut engine = ScriptedEngine::new(Rc::new(RefCell::new(Vec::new())));
        let reporters = standard_suite(&config.reporting);

        let result = run(&config, &mut engine, reporters, &ProgressReporter::new());

        assert!(matches!(result, Err(SimError::InputNotFound { .. })));
        assert!(!config.reporting.output_dir.exists());
    }

    #[test]
    fn build_failure_aborts_before_any_sink_opens() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixture_config(dir.path(), 0, 10);
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut engine = ScriptedEngine::new(calls.clone());
        engine.fail_build = true;
        let reporters = standard_suite(&config.reporting);

        let result = run(&config, &mut engine, reporters, &ProgressReporter::new());

        assert!(matches!(result, Err(SimError::SystemBuild { .. })));
        assert_eq!(*calls.borrow(), vec!["build"]);
        assert!(!config.reporting.output_dir.exists());
    }

    #[test]
    fn production_failure_skips_the_finalize_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixture_config(dir.path(), 0, 10);
        let mut engine = ScriptedEngine::new(Rc::new(RefCell::new(Vec::new())));
        engine.fail_advance_after = Some(4);

        let result = run(&config, &mut engine, Vec::new(), &ProgressReporter::new());

        assert!(matches!(
            result,
            Err(SimError::Engine {
                phase: "Produce",
                ..
            })
        ));
        assert!(!config.reporting.output_dir.join(FINAL_STATE_FILENAME).exists());
    }
}
