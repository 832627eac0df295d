use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use super::input::SelectionPolicy;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for {parameter}: {message}")]
    InvalidValue {
        parameter: &'static str,
        message: String,
    },
}

/// How non-bonded interactions are truncated. Periodic variants imply a
/// periodic simulation box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NonbondedMethod {
    NoCutoff,
    CutoffNonPeriodic,
    CutoffPeriodic,
    Pme,
}

impl NonbondedMethod {
    pub fn is_periodic(&self) -> bool {
        matches!(self, Self::CutoffPeriodic | Self::Pme)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConstraintPolicy {
    None,
    HBonds,
    AllBonds,
    HAngles,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComputePlatform {
    Reference,
    Cpu,
    Cuda,
    OpenCl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrecisionMode {
    Single,
    Mixed,
    Double,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputSettings {
    /// Glob pattern used to discover the structural input file.
    pub pattern: String,
    pub policy: SelectionPolicy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SystemSettings {
    /// Force-field source identifiers, passed through to the engine.
    pub forcefields: Vec<String>,
    pub nonbonded_method: NonbondedMethod,
    pub nonbonded_cutoff_nm: f64,
    pub ewald_tolerance: f64,
    pub constraints: ConstraintPolicy,
    pub rigid_water: bool,
    pub constraint_tolerance: f64,
    /// Hydrogen-mass repartitioning target, in atomic mass units.
    pub hydrogen_mass_amu: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntegratorSettings {
    pub timestep_ps: f64,
    pub temperature_k: f64,
    pub friction_per_ps: f64,
    /// Seed for velocity assignment. `None` lets the engine self-seed.
    pub random_seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarostatSettings {
    pub pressure_atm: f64,
    pub interval_steps: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub equilibration_steps: u64,
    pub production_steps: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportingSettings {
    pub output_dir: PathBuf,
    pub trajectory_interval: u64,
    pub state_data_interval: u64,
    pub checkpoint_interval: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlatformSettings {
    pub platform: ComputePlatform,
    pub precision: PrecisionMode,
}

/// Immutable description of one simulation run. Construct through
/// [`SimulationConfigBuilder`], which enforces the physical invariants.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub input: InputSettings,
    pub system: SystemSettings,
    pub integrator: IntegratorSettings,
    pub barostat: BarostatSettings,
    pub run: RunSettings,
    pub reporting: ReportingSettings,
    pub platform: PlatformSettings,
}

#[derive(Default)]
pub struct SimulationConfigBuilder {
    input_pattern: Option<String>,
    selection_policy: Option<SelectionPolicy>,
    forcefields: Option<Vec<String>>,
    nonbonded_method: Option<NonbondedMethod>,
    nonbonded_cutoff_nm: Option<f64>,
    ewald_tolerance: Option<f64>,
    constraints: Option<ConstraintPolicy>,
    rigid_water: Option<bool>,
    constraint_tolerance: Option<f64>,
    hydrogen_mass_amu: Option<f64>,
    timestep_ps: Option<f64>,
    temperature_k: Option<f64>,
    friction_per_ps: Option<f64>,
    random_seed: Option<u64>,
    pressure_atm: Option<f64>,
    barostat_interval: Option<u64>,
    equilibration_steps: Option<u64>,
    production_steps: Option<u64>,
    output_dir: Option<PathBuf>,
    trajectory_interval: Option<u64>,
    state_data_interval: Option<u64>,
    checkpoint_interval: Option<u64>,
    platform: Option<ComputePlatform>,
    precision: Option<PrecisionMode>,
}

impl SimulationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.input_pattern = Some(pattern.into());
        self
    }
    pub fn selection_policy(mut self, policy: SelectionPolicy) -> Self {
        self.selection_policy = Some(policy);
        self
    }
    pub fn forcefields(mut self, sources: Vec<String>) -> Self {
        self.forcefields = Some(sources);
        self
    }
    pub fn nonbonded_method(mut self, method: NonbondedMethod) -> Self {
        self.nonbonded_method = Some(method);
        self
    }
    pub fn nonbonded_cutoff_nm(mut self, cutoff: f64) -> Self {
        self.nonbonded_cutoff_nm = Some(cutoff);
        self
    }
    pub fn ewald_tolerance(mut self, tolerance: f64) -> Self {
        self.ewald_tolerance = Some(tolerance);
        self
    }
    pub fn constraints(mut self, policy: ConstraintPolicy) -> Self {
        self.constraints = Some(policy);
        self
    }
    pub fn rigid_water(mut self, rigid: bool) -> Self {
        self.rigid_water = Some(rigid);
        self
    }
    pub fn constraint_tolerance(mut self, tolerance: f64) -> Self {
        self.constraint_tolerance = Some(tolerance);
        self
    }
    pub fn hydrogen_mass_amu(mut self, mass: f64) -> Self {
        self.hydrogen_mass_amu = Some(mass);
        self
    }
    pub fn timestep_ps(mut self, dt: f64) -> Self {
        self.timestep_ps = Some(dt);
        self
    }
    pub fn temperature_k(mut self, temperature: f64) -> Self {
        self.temperature_k = Some(temperature);
        self
    }
    pub fn friction_per_ps(mut self, friction: f64) -> Self {
        self.friction_per_ps = Some(friction);
        self
    }
    pub fn random_seed(mut self, seed: Option<u64>) -> Self {
        self.random_seed = seed;
        self
    }
    pub fn pressure_atm(mut self, pressure: f64) -> Self {
        self.pressure_atm = Some(pressure);
        self
    }
    pub fn barostat_interval(mut self, interval: u64) -> Self {
        self.barostat_interval = Some(interval);
        self
    }
    pub fn equilibration_steps(mut self, steps: u64) -> Self {
        self.equilibration_steps = Some(steps);
        self
    }
    pub fn production_steps(mut self, steps: u64) -> Self {
        self.production_steps = Some(steps);
        self
    }
    pub fn output_dir(mut self, dir: PathBuf) -> Self {
        self.output_dir = Some(dir);
        self
    }
    pub fn trajectory_interval(mut self, interval: u64) -> Self {
        self.trajectory_interval = Some(interval);
        self
    }
    pub fn state_data_interval(mut self, interval: u64) -> Self {
        self.state_data_interval = Some(interval);
        self
    }
    pub fn checkpoint_interval(mut self, interval: u64) -> Self {
        self.checkpoint_interval = Some(interval);
        self
    }
    pub fn platform(mut self, platform: ComputePlatform) -> Self {
        self.platform = Some(platform);
        self
    }
    pub fn precision(mut self, precision: PrecisionMode) -> Self {
        self.precision = Some(precision);
        self
    }

    pub fn build(self) -> Result<SimulationConfig, ConfigError> {
        let input = InputSettings {
            pattern: self
                .input_pattern
                .ok_or(ConfigError::MissingParameter("input_pattern"))?,
            policy: self
                .selection_policy
                .unwrap_or(SelectionPolicy::FirstLexicographic),
        };
        let system = SystemSettings {
            forcefields: self
                .forcefields
                .ok_or(ConfigError::MissingParameter("forcefields"))?,
            nonbonded_method: self.nonbonded_method.unwrap_or(NonbondedMethod::Pme),
            nonbonded_cutoff_nm: self.nonbonded_cutoff_nm.unwrap_or(1.0),
            ewald_tolerance: self.ewald_tolerance.unwrap_or(0.0005),
            constraints: self.constraints.unwrap_or(ConstraintPolicy::HBonds),
            rigid_water: self.rigid_water.unwrap_or(true),
            constraint_tolerance: self.constraint_tolerance.unwrap_or(1e-6),
            hydrogen_mass_amu: self.hydrogen_mass_amu.unwrap_or(1.5),
        };
        let integrator = IntegratorSettings {
            timestep_ps: self.timestep_ps.unwrap_or(0.002),
            temperature_k: self.temperature_k.unwrap_or(310.0),
            friction_per_ps: self.friction_per_ps.unwrap_or(1.0),
            random_seed: self.random_seed,
        };
        let barostat = BarostatSettings {
            pressure_atm: self.pressure_atm.unwrap_or(1.0),
            interval_steps: self.barostat_interval.unwrap_or(25),
        };
        let run = RunSettings {
            equilibration_steps: self.equilibration_steps.unwrap_or(0),
            production_steps: self
                .production_steps
                .ok_or(ConfigError::MissingParameter("production_steps"))?,
        };
        let reporting = ReportingSettings {
            output_dir: self
                .output_dir
                .ok_or(ConfigError::MissingParameter("output_dir"))?,
            trajectory_interval: self.trajectory_interval.unwrap_or(10),
            state_data_interval: self.state_data_interval.unwrap_or(10),
            checkpoint_interval: self.checkpoint_interval.unwrap_or(1000),
        };
        let platform = PlatformSettings {
            platform: self.platform.unwrap_or(ComputePlatform::Reference),
            precision: self.precision.unwrap_or(PrecisionMode::Single),
        };

        let config = SimulationConfig {
            input,
            system,
            integrator,
            barostat,
            run,
            reporting,
            platform,
        };
        config.validate()?;
        Ok(config)
    }
}

impl SimulationConfig {
    pub fn builder() -> SimulationConfigBuilder {
        SimulationConfigBuilder::new()
    }

    /// Checks the physical invariants. Builder output always passes; configs
    /// assembled by hand (e.g. deserialized) should call this before use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(parameter: &'static str, value: f64) -> Result<(), ConfigError> {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(ConfigError::InvalidValue {
                    parameter,
                    message: format!("must be positive and finite, got {}", value),
                })
            }
        }

        positive("nonbonded_cutoff_nm", self.system.nonbonded_cutoff_nm)?;
        positive("ewald_tolerance", self.system.ewald_tolerance)?;
        positive("constraint_tolerance", self.system.constraint_tolerance)?;
        positive("hydrogen_mass_amu", self.system.hydrogen_mass_amu)?;
        positive("timestep_ps", self.integrator.timestep_ps)?;
        positive("temperature_k", self.integrator.temperature_k)?;
        positive("friction_per_ps", self.integrator.friction_per_ps)?;

        if self.system.forcefields.is_empty() {
            return Err(ConfigError::InvalidValue {
                parameter: "forcefields",
                message: "at least one force-field source is required".to_string(),
            });
        }

        for (parameter, value) in [
            ("barostat_interval", self.barostat.interval_steps),
            ("trajectory_interval", self.reporting.trajectory_interval),
            ("state_data_interval", self.reporting.state_data_interval),
            ("checkpoint_interval", self.reporting.checkpoint_interval),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    parameter,
                    message: "interval must be at least one step".to_string(),
                });
            }
        }

        Ok(())
    }
}
