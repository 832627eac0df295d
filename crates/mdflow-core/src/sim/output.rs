use nalgebra::Point3;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::error::SimError;

/// The artifact produced by a successful pipeline run.
#[derive(Debug, Clone)]
pub struct FinalState {
    pub artifact_path: PathBuf,
    pub atom_count: usize,
}

/// Writes the final coordinates as XYZ-style text (count line, comment line,
/// then one `element x y z` row per atom, coordinates in nm).
pub fn write_final_state(
    path: &Path,
    labels: &[String],
    positions: &[Point3<f64>],
) -> Result<FinalState, SimError> {
    debug_assert_eq!(labels.len(), positions.len());

    let io_err = |source: std::io::Error| SimError::FinalState {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let mut writer = BufWriter::new(File::create(path).map_err(io_err)?);

    writeln!(writer, "{}", positions.len()).map_err(io_err)?;
    writeln!(writer, "mdflow final state (coordinates in nm)").map_err(io_err)?;
    for (label, point) in labels.iter().zip(positions) {
        writeln!(
            writer,
            "{} {:.6} {:.6} {:.6}",
            label, point.x, point.y, point.z
        )
        .map_err(io_err)?;
    }
    writer.flush().map_err(io_err)?;

    Ok(FinalState {
        artifact_path: path.to_path_buf(),
        atom_count: positions.len(),
    })
}
