//! Core types shared across the Laue framework: the immutable simulation
//! configuration and the result containers produced by tilt evaluations.

use ndarray::{Array1, Array2};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::lattice::{BravaisLattice, Lattice};

/// The reflection retained by the two-beam approximation, alongside (000).
///
/// A third Miller index may be supplied in configuration files; it is fixed
/// by the single-unit-cell projection and ignored by the 2-D engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwoBeamCondition {
    pub h: i32,
    pub k: i32,
}

/// Parameters defining a simulation configuration.
///
/// One value of this struct fully determines the cached transmission
/// functions, propagator kernels, and reflection maps; tilt angles are
/// supplied per evaluation and never invalidate the caches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationParams {
    /// Crystal description: constants, fractional basis, atomic numbers.
    pub lattice: Lattice,
    /// Bravais lattice controlling the reflection selection rule.
    #[serde(default)]
    pub bravais: BravaisLattice,
    /// Accelerating voltage (V).
    pub beam_energy: f64,
    /// Slab thickness along the beam (Å).
    pub crystal_thickness: f64,
    /// Specimen temperature (K); enters through Debye-Waller damping.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Crystal rotation about the beam axis (degrees), applied before tilt.
    #[serde(default)]
    pub rotation: f64,
    /// Scattering cutoff (Å⁻¹).
    pub k_max: f64,
    /// Beam angular-spread width in reciprocal space (Å⁻¹); 0 = coherent.
    #[serde(default)]
    pub part_k_max: f64,
    /// Truncation of the angular-spread Gaussian (standard deviations).
    #[serde(default = "default_part_k_extent")]
    pub part_k_extent: u32,
    /// Unit cells per supercell edge (power of two, ≥ 2).
    pub num_unit_cells: usize,
    /// Grid pixels per supercell edge (power of two, divisible by
    /// `num_unit_cells`).
    pub num_pixels: usize,
    /// Imaginary-potential fraction; `None` disables absorption.
    #[serde(default)]
    pub absorption: Option<f64>,
    /// When present, switches the propagator to the reduced two-beam mode.
    #[serde(default)]
    pub two_beam: Option<TwoBeamCondition>,
    /// Room-temperature Debye-Waller B factor (Å²).
    #[serde(default = "default_debye_waller")]
    pub debye_waller_b: f64,
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

/// Incident-beam tilt (milliradians).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tilt {
    pub angle_x: f64,
    pub angle_y: f64,
}

impl Tilt {
    pub fn none() -> Self {
        Self {
            angle_x: 0.0,
            angle_y: 0.0,
        }
    }
}

/// What a tilt evaluation records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordMode {
    /// Intensities at the exit surface only.
    Final,
    /// Intensities after every slice.
    Depth,
}

/// Per-reflection intensities from one tilt evaluation.
///
/// The variant mirrors the requested [`RecordMode`]; reflection ordering
/// matches [`Simulation::reflections`](crate::Simulation::reflections).
#[derive(Debug, Clone)]
pub enum IntensityRecord {
    /// Shape: (reflections,).
    Final(Array1<f64>),
    /// Shape: (slices, reflections); the last row is the exit surface.
    Depth(Array2<f64>),
}

impl IntensityRecord {
    /// The exit-surface intensities, whichever mode produced the record.
    pub fn exit_intensities(&self) -> Array1<f64> {
        match self {
            IntensityRecord::Final(values) => values.clone(),
            IntensityRecord::Depth(series) => match series.nrows() {
                0 => Array1::zeros(series.ncols()),
                n => series.row(n - 1).to_owned(),
            },
        }
    }
}

/// Complete result of one tilt evaluation.
#[derive(Debug, Clone)]
pub struct TiltEvaluation {
    /// The tilt this was computed for (mrad).
    pub tilt: Tilt,
    /// Per-reflection intensities.
    pub intensities: IntensityRecord,
    /// Real-space exit wavefunction on the simulation grid, exposed
    /// read-only for external imaging collaborators.
    pub exit_wave: Array2<Complex64>,
}
