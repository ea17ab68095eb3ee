//! Error types for simulation setup and execution.

use thiserror::Error;

use crate::lattice::BravaisLattice;

/// Configuration errors, detected eagerly when a [`Simulation`](crate::Simulation)
/// is constructed, before any Fourier-transform work is planned.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("num_pixels must be a power of two, got {0}")]
    PixelsNotPowerOfTwo(usize),

    #[error("num_unit_cells must be a power of two no smaller than 2, got {0}")]
    UnitCellsNotPowerOfTwo(usize),

    #[error("num_pixels ({pixels}) must be divisible by num_unit_cells ({cells})")]
    GridIndivisible { pixels: usize, cells: usize },

    #[error("lattice basis contains no atoms")]
    EmptyBasis,

    #[error("{positions} atomic positions but {numbers} atomic numbers")]
    BasisLengthMismatch { positions: usize, numbers: usize },

    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error(
        "k_max ({k_max} Å⁻¹) exceeds the grid Nyquist frequency \
         ({nyquist} Å⁻¹); raise num_pixels or lower k_max"
    )]
    KMaxBeyondNyquist { k_max: f64, nyquist: f64 },

    #[error("crystal_thickness must be non-negative, got {0}")]
    NegativeThickness(f64),

    #[error("temperature must be non-negative, got {0}")]
    NegativeTemperature(f64),

    #[error("part_k_max must be non-negative, got {0}")]
    NegativePartialCoherence(f64),

    #[error("part_k_extent must be positive")]
    ZeroPartialExtent,

    #[error("no electron form factor tabulated for atomic number {0}")]
    UnknownElement(u32),

    #[error("two-beam condition needs 2 or 3 Miller indices, got {0}")]
    TwoBeamIndexCount(usize),

    #[error(
        "two-beam reflection ({h},{k}) is forbidden for the {lattice:?} lattice \
         or lies outside k_max"
    )]
    TwoBeamNotAllowed {
        h: i32,
        k: i32,
        lattice: BravaisLattice,
    },
}

/// Fatal runtime failures of a single tilt evaluation.
///
/// A failed run leaves the cached transmission functions and propagator
/// kernels untouched; other concurrent tilt evaluations are unaffected.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(
        "wavefunction became non-finite after slice {slice} \
         (tilt {tilt_x:.3}, {tilt_y:.3} mrad)"
    )]
    NonFiniteWave {
        slice: usize,
        tilt_x: f64,
        tilt_y: f64,
    },
}
