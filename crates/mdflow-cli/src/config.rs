use crate::cli::SimulateArgs;
use crate::error::{CliError, Result};
use mdflow_core::sim::config::{
    ComputePlatform, ConstraintPolicy, NonbondedMethod, PrecisionMode, SimulationConfig,
};
use mdflow_core::sim::input::SelectionPolicy;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The on-disk TOML model for one simulation run. Every section beyond
/// `[input]` and `[run]` is optional; omitted fields fall back to the core
/// builder's documented defaults.
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileSimulationConfig {
    pub input: FileInputSection,
    #[serde(default)]
    pub system: FileSystemSection,
    #[serde(default)]
    pub integrator: FileIntegratorSection,
    #[serde(default)]
    pub barostat: FileBarostatSection,
    pub run: FileRunSection,
    #[serde(default)]
    pub reporting: FileReportingSection,
    #[serde(default)]
    pub platform: FilePlatformSection,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileInputSection {
    pub pattern: String,
    pub selection_policy: Option<SelectionPolicy>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileSystemSection {
    pub forcefields: Option<Vec<String>>,
    pub nonbonded_method: Option<NonbondedMethod>,
    pub nonbonded_cutoff_nm: Option<f64>,
    pub ewald_tolerance: Option<f64>,
    pub constraints: Option<ConstraintPolicy>,
    pub rigid_water: Option<bool>,
    pub constraint_tolerance: Option<f64>,
    pub hydrogen_mass_amu: Option<f64>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileIntegratorSection {
    pub timestep_ps: Option<f64>,
    pub temperature_k: Option<f64>,
    pub friction_per_ps: Option<f64>,
    pub random_seed: Option<u64>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileBarostatSection {
    pub pressure_atm: Option<f64>,
    pub interval_steps: Option<u64>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileRunSection {
    pub production_steps: u64,
    pub equilibration_steps: Option<u64>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileReportingSection {
    pub output_dir: Option<PathBuf>,
    pub trajectory_interval: Option<u64>,
    pub state_data_interval: Option<u64>,
    pub checkpoint_interval: Option<u64>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FilePlatformSection {
    pub name: Option<ComputePlatform>,
    pub precision: Option<PrecisionMode>,
}

const DEFAULT_OUTPUT_DIR: &str = "outputs";
const DEFAULT_FORCEFIELDS: [&str; 2] = ["amber14-all.xml", "amber14/tip3pfb.xml"];

impl FileSimulationConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        debug!(path = %path.display(), "Simulation configuration file parsed.");
        Ok(config)
    }

    /// Merges the file with CLI overrides into a validated core config.
    pub fn into_core(self, args: &SimulateArgs) -> Result<SimulationConfig> {
        let mut builder = SimulationConfig::builder()
            .input_pattern(
                args.input_pattern
                    .clone()
                    .unwrap_or(self.input.pattern),
            )
            .forcefields(self.system.forcefields.unwrap_or_else(|| {
                DEFAULT_FORCEFIELDS.iter().map(|s| s.to_string()).collect()
            }))
            .production_steps(args.steps.unwrap_or(self.run.production_steps))
            .equilibration_steps(
                args.equilibration_steps
                    .or(self.run.equilibration_steps)
                    .unwrap_or(0),
            )
            .output_dir(
                args.output_dir
                    .clone()
                    .or(self.reporting.output_dir)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            )
            .random_seed(args.seed.or(self.integrator.random_seed));

        if let Some(policy) = self.input.selection_policy {
            builder = builder.selection_policy(policy);
        }
        if let Some(method) = self.system.nonbonded_method {
            builder = builder.nonbonded_method(method);
        }
        if let Some(cutoff) = self.system.nonbonded_cutoff_nm {
            builder = builder.nonbonded_cutoff_nm(cutoff);
        }
        if let Some(tolerance) = self.system.ewald_tolerance {
            builder = builder.ewald_tolerance(tolerance);
        }
        if let Some(constraints) = self.system.constraints {
            builder = builder.constraints(constraints);
        }
        if let Some(rigid) = self.system.rigid_water {
            builder = builder.rigid_water(rigid);
        }
        if let Some(tolerance) = self.system.constraint_tolerance {
            builder = builder.constraint_tolerance(tolerance);
        }
        if let Some(mass) = self.system.hydrogen_mass_amu {
            builder = builder.hydrogen_mass_amu(mass);
        }
        if let Some(dt) = self.integrator.timestep_ps {
            builder = builder.timestep_ps(dt);
        }
        if let Some(temperature) = self.integrator.temperature_k {
            builder = builder.temperature_k(temperature);
        }
        if let Some(friction) = self.integrator.friction_per_ps {
            builder = builder.friction_per_ps(friction);
        }
        if let Some(pressure) = self.barostat.pressure_atm {
            builder = builder.pressure_atm(pressure);
        }
        if let Some(interval) = self.barostat.interval_steps {
            builder = builder.barostat_interval(interval);
        }
        if let Some(interval) = self.reporting.trajectory_interval {
            builder = builder.trajectory_interval(interval);
        }
        if let Some(interval) = self.reporting.state_data_interval {
            builder = builder.state_data_interval(interval);
        }
        if let Some(interval) = self.reporting.checkpoint_interval {
            builder = builder.checkpoint_interval(interval);
        }
        if let Some(platform) = self.platform.name {
            builder = builder.platform(platform);
        }
        if let Some(precision) = self.platform.precision {
            builder = builder.precision(precision);
        }

        Ok(builder.build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
[input]
pattern = "inputs/protein/*.pdb"

[run]
production-steps = 100
"#;

    const FULL: &str = r#"
[input]
pattern = "inputs/protein/*.pdb"
selection-policy = "require-unique"

[system]
forcefields = ["amber14-all.xml", "amber14/tip3pfb.xml"]
nonbonded-method = "pme"
nonbonded-cutoff-nm = 1.0
ewald-tolerance = 0.0005
constraints = "h-bonds"
rigid-water = true
constraint-tolerance = 0.000001
hydrogen-mass-amu = 1.5

[integrator]
timestep-ps = 0.002
temperature-k = 310.0
friction-per-ps = 1.0
random-seed = 42

[barostat]
pressure-atm = 1.0
interval-steps = 25

[run]
production-steps = 100
equilibration-steps = 0

[reporting]
output-dir = "outputs"
trajectory-interval = 10
state-data-interval = 10
checkpoint-interval = 1000

[platform]
name = "cuda"
precision = "single"
"#;

    fn no_overrides() -> SimulateArgs {
        SimulateArgs {
            config: PathBuf::from("unused.toml"),
            input_pattern: None,
            output_dir: None,
            steps: None,
            equilibration_steps: None,
            seed: None,
        }
    }

    #[test]
    fn minimal_file_uses_core_defaults() {
        let file: FileSimulationConfig = toml::from_str(MINIMAL).unwrap();
        let config = file.into_core(&no_overrides()).unwrap();

        assert_eq!(config.input.pattern, "inputs/protein/*.pdb");
        assert_eq!(config.system.forcefields.len(), 2);
        assert_eq!(config.system.nonbonded_method, NonbondedMethod::Pme);
        assert_eq!(config.run.production_steps, 100);
        assert_eq!(config.reporting.output_dir, PathBuf::from("outputs"));
    }

    #[test]
    fn full_file_parses_every_section() {
        let file: FileSimulationConfig = toml::from_str(FULL).unwrap();
        let config = file.into_core(&no_overrides()).unwrap();

        assert_eq!(config.input.policy, SelectionPolicy::RequireUnique);
        assert_eq!(config.integrator.random_seed, Some(42));
        assert_eq!(config.platform.platform, ComputePlatform::Cuda);
        assert_eq!(config.barostat.interval_steps, 25);
    }

    #[test]
    fn cli_overrides_take_precedence_over_the_file() {
        let file: FileSimulationConfig = toml::from_str(FULL).unwrap();
        let mut args = no_overrides();
        args.steps = Some(5000);
        args.seed = Some(7);
        args.output_dir = Some(PathBuf::from("elsewhere"));

        let config = file.into_core(&args).unwrap();
        assert_eq!(config.run.production_steps, 5000);
        assert_eq!(config.integrator.random_seed, Some(7));
        assert_eq!(config.reporting.output_dir, PathBuf::from("elsewhere"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let text = format!("{}\n[system]\nmystery-knob = 1\n", MINIMAL);
        assert!(toml::from_str::<FileSimulationConfig>(&text).is_err());
    }

    #[test]
    fn from_file_reports_parse_failures_with_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "this is not toml at all [").unwrap();

        let result = FileSimulationConfig::from_file(&path);
        assert!(matches!(result, Err(CliError::FileParsing { .. })));
    }
}
