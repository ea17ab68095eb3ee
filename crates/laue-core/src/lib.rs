//! # Laue Core
//!
//! The numerical backbone of the Laue framework: a multislice engine for
//! simulating electron-beam propagation through cubic crystal slabs,
//! producing diffracted-beam intensities, depth-resolved intensity
//! profiles, and real-space exit wavefunctions.
//!
//! ## Architecture
//!
//! A [`Simulation`] is built once per configuration and is immutable
//! afterwards: it caches the per-layer transmission functions, the
//! propagator kernels, and the reflection pixel maps. Tilt evaluations run
//! against the shared caches via [`Simulation::intensity`], each owning its
//! own evolving wavefunction, so independent tilts may run concurrently
//! without locking.
//!
//! ## Modules
//!
//! - [`lattice`] — atomic basis, Bravais selection rules, layer structure.
//! - [`grid`] — real/reciprocal sampling and the FFT layout convention.
//! - [`scattering`] — electron-optical constants and form-factor data.
//! - [`multislice`] — potentials, transmission functions, propagators, and
//!   the slice loop.
//! - [`reflections`] — reflection enumeration and pixel maps.
//! - [`intensity`] — reduction of wavefunctions to per-reflection
//!   intensities.
//! - [`types`] — configuration and result containers.
//! - [`error`] — configuration and runtime error kinds.

pub mod error;
pub mod grid;
pub mod intensity;
pub mod lattice;
pub mod multislice;
pub mod reflections;
pub mod scattering;
pub mod types;

pub use error::{ConfigError, RunError};
pub use grid::GridSpec;
pub use lattice::{BravaisLattice, Lattice, LatticeModel};
pub use multislice::Simulation;
pub use reflections::{Reflection, ReflectionIndexer};
pub use types::{
    IntensityRecord, RecordMode, SimulationParams, Tilt, TiltEvaluation, TwoBeamCondition,
};
