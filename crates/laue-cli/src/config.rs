//! TOML configuration deserialisation for simulation jobs.

use anyhow::Context;
use serde::Deserialize;

use laue_core::{
    BravaisLattice, Lattice, RecordMode, SimulationParams, TwoBeamCondition,
};

/// Top-level job configuration.
#[derive(Debug, Deserialize)]
pub struct JobConfig {
    pub simulation: SimulationConfig,
    pub crystal: CrystalConfig,
    #[serde(default)]
    pub tilt: TiltConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Simulation parameters from TOML.
#[derive(Debug, Deserialize)]
pub struct SimulationConfig {
    /// Accelerating voltage (V).
    pub beam_energy: f64,
    /// Slab thickness (Å).
    pub crystal_thickness: f64,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Crystal rotation about the beam axis (degrees).
    #[serde(default)]
    pub rotation: f64,
    /// Scattering cutoff (Å⁻¹).
    pub k_max: f64,
    /// Beam angular spread (Å⁻¹); 0 = coherent.
    #[serde(default)]
    pub part_k_max: f64,
    #[serde(default = "default_part_k_extent")]
    pub part_k_extent: u32,
    pub num_unit_cells: usize,
    pub num_pixels: usize,
    /// Imaginary-potential fraction; omit to disable absorption.
    #[serde(default)]
    pub absorption: Option<f64>,
    /// Two-beam condition as 2 or 3 Miller indices; the third index is
    /// folded into the projection and ignored.
    #[serde(default)]
    pub two_beam: Option<Vec<i32>>,
    /// Room-temperature Debye-Waller B factor (Å²).
    #[serde(default = "default_debye_waller")]
    pub debye_waller_b: f64,
    /// Compute backend: "auto" or "cpu". Default: "auto".
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Recording mode: "final" or "depth". Default: "final".
    #[serde(default = "default_mode")]
    pub mode: String,
}

fn default_temperature() -> f64 {
    295.0
}
fn default_part_k_extent() -> u32 {
    3
}
fn default_debye_waller() -> f64 {
    0.45
}
fn default_backend() -> String {
    "auto".into()
}
fn default_mode() -> String {
    "final".into()
}

/// Crystal description from TOML.
#[derive(Debug, Deserialize)]
pub struct CrystalConfig {
    /// Lattice constants a, b, c (Å).
    pub constants: [f64; 3],
    #[serde(default)]
    pub bravais: BravaisLattice,
    /// Fractional atomic positions.
    pub positions: Vec<[f64; 3]>,
    /// Atomic numbers matched to `positions`.
    pub atomic_numbers: Vec<u32>,
}

/// Tilt sweep: one axis spec per tilt direction (mrad).
#[derive(Debug, Deserialize, Default)]
pub struct TiltConfig {
    #[serde(default)]
    pub x: TiltAxis,
    #[serde(default)]
    pub y: TiltAxis,
}

/// Tilt axis specification: either a range or an explicit list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TiltAxis {
    Range { range: [f64; 2], points: usize },
    List { values: Vec<f64> },
}

impl Default for TiltAxis {
    fn default() -> Self {
        TiltAxis::List { values: vec![0.0] }
    }
}

impl TiltAxis {
    /// Materialise the axis into explicit tilt values.
    pub fn values(&self) -> Vec<f64> {
        match self {
            TiltAxis::Range { range, points } => {
                let n = (*points).max(1);
                (0..n)
                    .map(|i| {
                        range[0] + (range[1] - range[0]) * i as f64 / (n - 1).max(1) as f64
                    })
                    .collect()
            }
            TiltAxis::List { values } => values.clone(),
        }
    }
}

/// Output configuration.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Output directory (default: "./output").
    #[serde(default = "default_output_dir")]
    pub directory: String,
    /// Whether to save intensities as CSV (default: true).
    #[serde(default = "default_true")]
    pub save_intensities: bool,
    /// Whether to also save intensities as JSON (default: false).
    #[serde(default)]
    pub save_json: bool,
    /// Whether to save the exit wavefunction of each tilt (default: false).
    #[serde(default)]
    pub save_exit_wave: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            save_intensities: true,
            save_json: false,
            save_exit_wave: false,
        }
    }
}

fn default_output_dir() -> String {
    "./output".into()
}
fn default_true() -> bool {
    true
}

impl JobConfig {
    /// Assemble the engine configuration from the parsed job file.
    pub fn to_params(&self) -> anyhow::Result<SimulationParams> {
        let two_beam = match &self.simulation.two_beam {
            None => None,
            Some(indices) if indices.len() == 2 || indices.len() == 3 => {
                Some(TwoBeamCondition {
                    h: indices[0],
                    k: indices[1],
                })
            }
            Some(indices) => anyhow::bail!(
                "two_beam needs 2 or 3 Miller indices, got {}",
                indices.len()
            ),
        };

        Ok(SimulationParams {
            lattice: Lattice {
                constants: self.crystal.constants,
                positions: self.crystal.positions.clone(),
                atomic_numbers: self.crystal.atomic_numbers.clone(),
            },
            bravais: self.crystal.bravais,
            beam_energy: self.simulation.beam_energy,
            crystal_thickness: self.simulation.crystal_thickness,
            temperature: self.simulation.temperature,
            rotation: self.simulation.rotation,
            k_max: self.simulation.k_max,
            part_k_max: self.simulation.part_k_max,
            part_k_extent: self.simulation.part_k_extent,
            num_unit_cells: self.simulation.num_unit_cells,
            num_pixels: self.simulation.num_pixels,
            absorption: self.simulation.absorption,
            two_beam,
            debye_waller_b: self.simulation.debye_waller_b,
        })
    }

    /// The requested recording mode.
    pub fn record_mode(&self) -> anyhow::Result<RecordMode> {
        match self.simulation.mode.as_str() {
            "final" => Ok(RecordMode::Final),
            "depth" => Ok(RecordMode::Depth),
            other => anyhow::bail!("Unknown mode '{}'. Valid modes: final, depth", other),
        }
    }
}

/// Load and parse a TOML job configuration file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<JobConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let config: JobConfig = toml::from_str(&content)
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(config)
}
