use nalgebra::Point3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::io;
use thiserror::Error;
use tracing::debug;

use super::config::SimulationConfig;
use super::input::StructuralInput;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to read structural input: {0}")]
    InputParse(String),

    #[error("force field '{name}' cannot parameterize the system: {message}")]
    Parameterization { name: String, message: String },

    #[error("operation requires a built system, but none exists")]
    NotBuilt,

    #[error("integration failure at step {step}: {message}")]
    Integration { step: u64, message: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Instantaneous scalar observables of the simulated system, in the units the
/// state-data log reports them.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Observables {
    pub potential_energy_kj_mol: f64,
    pub kinetic_energy_kj_mol: f64,
    pub temperature_k: f64,
    pub box_volume_nm3: f64,
    pub density_g_ml: f64,
}

impl Observables {
    pub fn total_energy_kj_mol(&self) -> f64 {
        self.potential_energy_kj_mol + self.kinetic_energy_kj_mol
    }
}

/// Seam to the external numerical engine.
///
/// The pipeline owns the phase ordering; the engine owns everything numerical:
/// parameterization, integration, electrostatics, and periodic-boundary
/// handling. Implementations are stateful — `build` must be called before any
/// other operation, and each call observes the state left by the previous one.
pub trait SimulationEngine {
    /// Constructs the computational system from the resolved input and the
    /// force-field / nonbonded / constraint / barostat / integrator settings.
    /// Pure construction: no simulated time advances.
    fn build(&mut self, input: &StructuralInput, config: &SimulationConfig)
    -> Result<(), EngineError>;

    /// Relaxes the current configuration to a local energy minimum. No
    /// step/time semantics are exposed.
    fn minimize(&mut self) -> Result<(), EngineError>;

    /// Draws velocities from the Maxwell-Boltzmann distribution at the target
    /// temperature. A fixed seed makes downstream trajectories reproducible.
    fn assign_velocities(&mut self, temperature_k: f64, seed: Option<u64>)
    -> Result<(), EngineError>;

    /// Advances dynamics by exactly `steps` integration steps.
    fn advance(&mut self, steps: u64) -> Result<(), EngineError>;

    fn observables(&self) -> Result<Observables, EngineError>;

    /// Current positions in nm. `wrap_periodic` folds atoms back into the
    /// primary periodic image and is only meaningful for periodic systems.
    fn positions(&self, wrap_periodic: bool) -> Result<Vec<Point3<f64>>, EngineError>;

    /// Per-atom element labels, parallel to `positions`.
    fn atom_labels(&self) -> Result<Vec<String>, EngineError>;

    /// Opaque resume snapshot. Resume itself is an engine capability; the
    /// pipeline only persists the bytes.
    fn checkpoint(&self) -> Result<Vec<u8>, EngineError>;

    fn uses_periodic_boundaries(&self) -> bool;
}

const DEFAULT_BOX_EDGE_NM: f64 = 5.0;

struct NullSystem {
    positions: Vec<Point3<f64>>,
    labels: Vec<String>,
    potential_kj_mol: f64,
    temperature_k: f64,
    periodic: bool,
    box_edge_nm: f64,
    step: u64,
}

/// A deterministic stand-in engine that performs no physics.
///
/// It reads just enough of a PDB-shaped input to size the system (one particle
/// per ATOM/HETATM record) and then evolves synthetic, seed-reproducible
/// state. Real engines implement [`SimulationEngine`] against their own
/// numerics; this one exists so the pipeline, its reporters, and the CLI can
/// run end-to-end without a compute backend.
pub struct NullEngine {
    rng: StdRng,
    system: Option<NullSystem>,
}

impl NullEngine {
    pub fn new() -> Self {
        Self {
            rng: StdRng::seed_from_u64(0),
            system: None,
        }
    }

    fn system(&self) -> Result<&NullSystem, EngineError> {
        self.system.as_ref().ok_or(EngineError::NotBuilt)
    }

    fn system_mut(&mut self) -> Result<&mut NullSystem, EngineError> {
        self.system.as_mut().ok_or(EngineError::NotBuilt)
    }
}

impl Default for NullEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationEngine for NullEngine {
    fn build(
        &mut self,
        input: &StructuralInput,
        config: &SimulationConfig,
    ) -> Result<(), EngineError> {
        let text = fs::read_to_string(&input.path)?;
        let atoms: Vec<&str> = text
            .lines()
            .filter(|line| line.starts_with("ATOM") || line.starts_with("HETATM"))
            .collect();
        if atoms.is_empty() {
            return Err(EngineError::InputParse(format!(
                "no atom records found in '{}'",
                input.path.display()
            )));
        }

        // Particles on a cubic lattice; element taken from PDB column 77-78
        // when present, otherwise carbon.
        let per_edge = (atoms.len() as f64).cbrt().ceil().max(1.0) as usize;
        let spacing = DEFAULT_BOX_EDGE_NM / per_edge as f64;
        let mut positions = Vec::with_capacity(atoms.len());
        let mut labels = Vec::with_capacity(atoms.len());
        for (i, line) in atoms.iter().enumerate() {
            let x = (i % per_edge) as f64 * spacing;
            let y = ((i / per_edge) % per_edge) as f64 * spacing;
            let z = (i / (per_edge * per_edge)) as f64 * spacing;
            positions.push(Point3::new(x, y, z));

            let element = line
                .get(76..78)
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .unwrap_or("C");
            labels.push(element.to_string());
        }

        debug!(
            atoms = atoms.len(),
            forcefields = ?config.system.forcefields,
            "Null engine built a synthetic system."
        );

        self.system = Some(NullSystem {
            positions,
            labels,
            potential_kj_mol: 1000.0,
            temperature_k: 0.0,
            periodic: config.system.nonbonded_method.is_periodic(),
            box_edge_nm: DEFAULT_BOX_EDGE_NM,
            step: 0,
        });
        Ok(())
    }

    fn minimize(&mut self) -> Result<(), EngineError> {
        let system = self.system_mut()?;
        system.potential_kj_mol *= 0.1;
        Ok(())
    }

    fn assign_velocities(
        &mut self,
        temperature_k: f64,
        seed: Option<u64>,
    ) -> Result<(), EngineError> {
        // Reseeding here is the deterministic RNG anchor: two configs that
        // differ only in downstream step counts share identical draws.
        self.rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let system = self.system_mut()?;
        system.temperature_k = temperature_k;
        Ok(())
    }

    fn advance(&mut self, steps: u64) -> Result<(), EngineError> {
        let Self { rng, system } = self;
        let system = system.as_mut().ok_or(EngineError::NotBuilt)?;
        for _ in 0..steps {
            let dx = rng.gen_range(-0.01..0.01);
            let dy = rng.gen_range(-0.01..0.01);
            let dz = rng.gen_range(-0.01..0.01);
            for point in &mut system.positions {
                point.x += dx;
                point.y += dy;
                point.z += dz;
            }
            system.step += 1;
        }
        Ok(())
    }

    fn observables(&self) -> Result<Observables, EngineError> {
        let system = self.system()?;
        let volume = system.box_edge_nm.powi(3);
        let kinetic = 0.0124 * system.temperature_k * system.positions.len() as f64;
        Ok(Observables {
            potential_energy_kj_mol: system.potential_kj_mol,
            kinetic_energy_kj_mol: kinetic,
            temperature_k: system.temperature_k,
            box_volume_nm3: volume,
            density_g_ml: 12.011 * system.positions.len() as f64 / (602.2 * volume),
        })
    }

    fn positions(&self, wrap_periodic: bool) -> Result<Vec<Point3<f64>>, EngineError> {
        let system = self.system()?;
        let mut positions = system.positions.clone();
        if wrap_periodic && system.periodic {
            let edge = system.box_edge_nm;
            for point in &mut positions {
                point.x = point.x.rem_euclid(edge);
                point.y = point.y.rem_euclid(edge);
                point.z = point.z.rem_euclid(edge);
            }
        }
        Ok(positions)
    }

    fn atom_labels(&self) -> Result<Vec<String>, EngineError> {
        Ok(self.system()?.labels.clone())
    }

    fn checkpoint(&self) -> Result<Vec<u8>, EngineError> {
        let system = self.system()?;
        let mut bytes = Vec::with_capacity(8 + system.positions.len() * 24);
        bytes.extend_from_slice(&system.step.to_le_bytes());
        for point in &system.positions {
            for coordinate in point.coords.iter() {
                bytes.extend_from_slice(&coordinate.to_le_bytes());
            }
        }
        Ok(bytes)
    }

    fn uses_periodic_boundaries(&self) -> bool {
        self.system.as_ref().is_some_and(|s| s.periodic)
    }
}
