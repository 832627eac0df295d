use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use super::config::ReportingSettings;
use super::engine::{EngineError, SimulationEngine};

/// Per-report context handed to every reporter.
///
/// `step` is production-relative: the counter is reset to zero when the
/// production phase begins, so intervals are computed against production
/// start, not against equilibration.
#[derive(Debug, Clone, Copy)]
pub struct ReportContext {
    pub step: u64,
    pub total_steps: u64,
    pub time_ps: f64,
    pub elapsed: Duration,
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write {kind} output to '{path}': {source}", path = path.display())]
    Write {
        kind: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("state-data serialization failed: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// A periodic observer attached only during the production phase.
///
/// Reporters fire independently on their own interval; two reporters firing on
/// the same step are not coordinated or transactional. Output sinks are opened
/// lazily on first emission, so a pipeline that fails before production never
/// creates artifact files.
pub trait Reporter {
    /// Emission interval in production steps. Must be nonzero.
    fn interval(&self) -> u64;

    fn describe(&self) -> &'static str;

    fn report(
        &mut self,
        ctx: &ReportContext,
        engine: &mut dyn SimulationEngine,
    ) -> Result<(), ReportError>;

    /// Flushes and closes the sink. Called once after the production loop.
    fn finish(&mut self) -> Result<(), ReportError> {
        Ok(())
    }
}

fn create_sink(kind: &'static str, path: &Path) -> Result<File, ReportError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ReportError::Write {
            kind,
            path: path.to_path_buf(),
            source,
        })?;
    }
    File::create(path).map_err(|source| ReportError::Write {
        kind,
        path: path.to_path_buf(),
        source,
    })
}

const TRAJECTORY_MAGIC: &[u8; 4] = b"MDFT";

/// Appends binary coordinate frames at a fixed interval.
///
/// Frame layout: magic once at file start, then per frame the production step
/// (u64 LE), atom count (u32 LE), and xyz coordinates in nm (f64 LE each).
pub struct TrajectoryReporter {
    path: PathBuf,
    interval: u64,
    writer: Option<BufWriter<File>>,
}

impl TrajectoryReporter {
    pub fn new(path: PathBuf, interval: u64) -> Self {
        Self {
            path,
            interval,
            writer: None,
        }
    }

    fn writer(&mut self) -> Result<&mut BufWriter<File>, ReportError> {
        if self.writer.is_none() {
            let file = create_sink("trajectory", &self.path)?;
            let mut writer = BufWriter::new(file);
            writer
                .write_all(TRAJECTORY_MAGIC)
                .map_err(|source| self.write_error(source))?;
            self.writer = Some(writer);
        }
        Ok(self.writer.as_mut().expect("writer initialized above"))
    }

    fn write_error(&self, source: io::Error) -> ReportError {
        ReportError::Write {
            kind: "trajectory",
            path: self.path.clone(),
            source,
        }
    }
}

impl Reporter for TrajectoryReporter {
    fn interval(&self) -> u64 {
        self.interval
    }

    fn describe(&self) -> &'static str {
        "trajectory"
    }

    fn report(
        &mut self,
        ctx: &ReportContext,
        engine: &mut dyn SimulationEngine,
    ) -> Result<(), ReportError> {
        let positions = engine.positions(false)?;
        let path = self.path.clone();
        let writer = self.writer()?;

        let io_err = |source: io::Error| ReportError::Write {
            kind: "trajectory",
            path: path.clone(),
            source,
        };
        writer.write_all(&ctx.step.to_le_bytes()).map_err(io_err)?;
        writer
            .write_all(&(positions.len() as u32).to_le_bytes())
            .map_err(io_err)?;
        for point in &positions {
            for coordinate in point.coords.iter() {
                writer
                    .write_all(&coordinate.to_le_bytes())
                    .map_err(io_err)?;
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ReportError> {
        if let Some(writer) = self.writer.as_mut() {
            if let Err(source) = writer.flush() {
                return Err(ReportError::Write {
                    kind: "trajectory",
                    path: self.path.clone(),
                    source,
                });
            }
        }
        Ok(())
    }
}

/// Writes the scalar time-series log as tab-delimited text with the fixed
/// column set: step, time, speed, progress, elapsed/remaining estimates,
/// potential/kinetic/total energy, temperature, volume, density.
pub struct StateDataReporter {
    path: PathBuf,
    interval: u64,
    writer: Option<csv::Writer<File>>,
}

impl StateDataReporter {
    pub const COLUMNS: [&'static str; 12] = [
        "Step",
        "Time (ps)",
        "Speed (ns/day)",
        "Progress (%)",
        "Elapsed Time",
        "Time Remaining",
        "Potential Energy (kJ/mole)",
        "Kinetic Energy (kJ/mole)",
        "Total Energy (kJ/mole)",
        "Temperature (K)",
        "Box Volume (nm^3)",
        "Density (g/mL)",
    ];

    pub fn new(path: PathBuf, interval: u64) -> Self {
        Self {
            path,
            interval,
            writer: None,
        }
    }

    fn writer(&mut self) -> Result<&mut csv::Writer<File>, ReportError> {
        if self.writer.is_none() {
            let file = create_sink("state-data", &self.path)?;
            let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_writer(file);
            writer.write_record(Self::COLUMNS)?;
            self.writer = Some(writer);
        }
        Ok(self.writer.as_mut().expect("writer initialized above"))
    }
}

fn format_clock(duration: Duration) -> String {
    let total = duration.as_secs();
    format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

impl Reporter for StateDataReporter {
    fn interval(&self) -> u64 {
        self.interval
    }

    fn describe(&self) -> &'static str {
        "state-data"
    }

    fn report(
        &mut self,
        ctx: &ReportContext,
        engine: &mut dyn SimulationEngine,
    ) -> Result<(), ReportError> {
        let observables = engine.observables()?;

        let elapsed_secs = ctx.elapsed.as_secs_f64();
        let speed_ns_day = if elapsed_secs > 0.0 {
            (ctx.time_ps / 1000.0) / (elapsed_secs / 86_400.0)
        } else {
            0.0
        };
        let progress = if ctx.total_steps > 0 {
            ctx.step as f64 / ctx.total_steps as f64 * 100.0
        } else {
            100.0
        };
        let remaining = if ctx.step > 0 {
            ctx.elapsed
                .mul_f64((ctx.total_steps - ctx.step) as f64 / ctx.step as f64)
        } else {
            Duration::ZERO
        };

        let writer = self.writer()?;
        writer.write_record([
            ctx.step.to_string(),
            format!("{:.4}", ctx.time_ps),
            format!("{:.3}", speed_ns_day),
            format!("{:.1}", progress),
            format_clock(ctx.elapsed),
            format_clock(remaining),
            format!("{:.4}", observables.potential_energy_kj_mol),
            format!("{:.4}", observables.kinetic_energy_kj_mol),
            format!("{:.4}", observables.total_energy_kj_mol()),
            format!("{:.2}", observables.temperature_k),
            format!("{:.4}", observables.box_volume_nm3),
            format!("{:.5}", observables.density_g_ml),
        ])?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ReportError> {
        if let Some(writer) = self.writer.as_mut() {
            if let Err(source) = writer.flush() {
                return Err(ReportError::Write {
                    kind: "state-data",
                    path: self.path.clone(),
                    source,
                });
            }
        }
        Ok(())
    }
}

/// Persists the engine's opaque resume snapshot, overwriting in place.
///
/// The snapshot is written to a sibling temp file and renamed, so a crash
/// mid-write never truncates the previous checkpoint.
pub struct CheckpointReporter {
    path: PathBuf,
    interval: u64,
}

impl CheckpointReporter {
    pub fn new(path: PathBuf, interval: u64) -> Self {
        Self { path, interval }
    }
}

impl Reporter for CheckpointReporter {
    fn interval(&self) -> u64 {
        self.interval
    }

    fn describe(&self) -> &'static str {
        "checkpoint"
    }

    fn report(
        &mut self,
        _ctx: &ReportContext,
        engine: &mut dyn SimulationEngine,
    ) -> Result<(), ReportError> {
        let snapshot = engine.checkpoint()?;
        let io_err = |source: io::Error| ReportError::Write {
            kind: "checkpoint",
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let staging = self.path.with_extension("chk.tmp");
        fs::write(&staging, &snapshot).map_err(io_err)?;
        fs::rename(&staging, &self.path).map_err(io_err)?;
        Ok(())
    }
}

/// The standard three-reporter suite: trajectory, scalar log, and checkpoint,
/// each on its own interval.
pub fn standard_suite(settings: &ReportingSettings) -> Vec<Box<dyn Reporter>> {
    vec![
        Box::new(TrajectoryReporter::new(
            settings.output_dir.join("trajectory.bin"),
            settings.trajectory_interval,
        )),
        Box::new(StateDataReporter::new(
            settings.output_dir.join("log.tsv"),
            settings.state_data_interval,
        )),
        Box::new(CheckpointReporter::new(
            settings.output_dir.join("checkpoint.chk"),
            settings.checkpoint_interval,
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::config::SimulationConfig;
    use crate::sim::engine::NullEngine;
    use crate::sim::input::StructuralInput;
    use std::io::Write as _;
    use std::path::PathBuf;

    fn built_engine(dir: &Path) -> NullEngine {
        let pdb = dir.join("input.pdb");
        let mut file = File::create(&pdb).unwrap();
        for i in 0..4 {
            writeln!(
                file,
                "ATOM  {:>5}  CA  ALA A{:>4}       0.000   0.000   0.000  1.00  0.00           C",
                i + 1,
                i + 1
            )
            .unwrap();
        }
        let config = SimulationConfig::builder()
            .input_pattern("unused")
            .forcefields(vec!["amber14-all.xml".to_string()])
            .production_steps(10)
            .output_dir(PathBuf::from("unused"))
            .build()
            .unwrap();
        let mut engine = NullEngine::new();
        engine
            .build(
                &StructuralInput {
                    path: pdb,
                    candidates: vec![],
                },
                &config,
            )
            .unwrap();
        engine.assign_velocities(310.0, Some(1)).unwrap();
        engine
    }

    fn ctx(step: u64) -> ReportContext {
        ReportContext {
            step,
            total_steps: 100,
            time_ps: step as f64 * 0.002,
            elapsed: Duration::from_secs(2),
        }
    }

    #[test]
    fn sinks_are_not_created_before_first_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/log.tsv");
        let _reporter = StateDataReporter::new(path.clone(), 10);
        assert!(!path.exists());
        assert!(!path.parent().unwrap().exists());
    }

    #[test]
    fn state_data_log_has_header_and_one_row_per_report() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = built_engine(dir.path());
        let path = dir.path().join("log.tsv");
        let mut reporter = StateDataReporter::new(path.clone(), 10);

        reporter.report(&ctx(10), &mut engine).unwrap();
        reporter.report(&ctx(20), &mut engine).unwrap();
        reporter.finish().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Step\tTime (ps)\tSpeed (ns/day)"));
        assert!(lines[1].starts_with("10\t"));
        assert!(lines[2].starts_with("20\t"));
    }

    #[test]
    fn trajectory_frames_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = built_engine(dir.path());
        let path = dir.path().join("trajectory.bin");
        let mut reporter = TrajectoryReporter::new(path.clone(), 10);

        reporter.report(&ctx(10), &mut engine).unwrap();
        reporter.report(&ctx(20), &mut engine).unwrap();
        reporter.finish().unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], TRAJECTORY_MAGIC);
        // Two frames of header (8 + 4) plus 4 atoms * 24 bytes each.
        assert_eq!(bytes.len(), 4 + 2 * (12 + 4 * 24));
        assert_eq!(u64::from_le_bytes(bytes[4..12].try_into().unwrap()), 10);
    }

    #[test]
    fn checkpoint_overwrites_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = built_engine(dir.path());
        let path = dir.path().join("checkpoint.chk");
        let mut reporter = CheckpointReporter::new(path.clone(), 1000);

        reporter.report(&ctx(10), &mut engine).unwrap();
        let first = fs::read(&path).unwrap();
        engine.advance(3).unwrap();
        reporter.report(&ctx(20), &mut engine).unwrap();
        let second = fs::read(&path).unwrap();

        assert_eq!(first.len(), second.len());
        assert_ne!(first, second);
        assert!(!path.with_extension("chk.tmp").exists());
    }

    #[test]
    fn standard_suite_covers_all_three_artifacts() {
        let settings = ReportingSettings {
            output_dir: PathBuf::from("outputs"),
            trajectory_interval: 10,
            state_data_interval: 10,
            checkpoint_interval: 1000,
        };
        let suite = standard_suite(&settings);
        let kinds: Vec<&str> = suite.iter().map(|r| r.describe()).collect();
        assert_eq!(kinds, vec!["trajectory", "state-data", "checkpoint"]);
        assert_eq!(suite[2].interval(), 1000);
    }

    #[test]
    fn clock_format_is_h_mm_ss() {
        assert_eq!(format_clock(Duration::from_secs(0)), "0:00:00");
        assert_eq!(format_clock(Duration::from_secs(3723)), "1:02:03");
    }
}
