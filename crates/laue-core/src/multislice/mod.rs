//! The multislice propagation engine.
//!
//! [`Simulation`] holds everything derived from one configuration: the
//! cached per-layer transmission functions, the propagator kernels, and
//! the reflection maps. All of it is immutable after construction, so one
//! `Simulation` can be shared read-only across concurrent tilt
//! evaluations; each call to [`Simulation::intensity`] owns and evolves
//! its own wavefunction.
//!
//! Per slice the loop is: multiply by the layer's transmission function in
//! real space, transform to reciprocal space, multiply by the propagator
//! kernel, transform back. The slice schedule is derived from the crystal
//! thickness: `floor(thickness / z_spacing)` full slices, plus one partial
//! slice with a correspondingly scaled propagator when the thickness does
//! not divide evenly.

pub mod potential;
pub mod propagator;
pub mod transmission;

use std::sync::Arc;

use ndarray::{Array1, Array2};
use num_complex::Complex64;

use laue_compute::FftBackend;

use crate::error::{ConfigError, RunError};
use crate::grid::GridSpec;
use crate::intensity::extract_intensities;
use crate::lattice::LatticeModel;
use crate::reflections::{Reflection, ReflectionIndexer};
use crate::scattering;
use crate::types::{
    IntensityRecord, RecordMode, SimulationParams, Tilt, TiltEvaluation,
};

/// Relative tolerance when deciding whether the thickness divides evenly
/// into slices.
const SLICE_TOL: f64 = 1e-9;

/// An immutable, validated simulation configuration with its cached
/// per-layer transmission functions, propagator kernels, and reflection
/// maps.
pub struct Simulation {
    params: SimulationParams,
    grid: GridSpec,
    model: LatticeModel,
    wavelength: f64,
    sigma: f64,
    transmissions: Vec<Array2<Complex64>>,
    full_kernel: Array2<Complex64>,
    partial_kernel: Option<Array2<Complex64>>,
    n_full_slices: usize,
    partial_dz: f64,
    indexer: ReflectionIndexer,
    backend: Arc<dyn FftBackend>,
}

impl Simulation {
    /// Validate a configuration and build every cached array.
    ///
    /// All configuration errors are detected before any Fourier-transform
    /// work; a failed construction leaves nothing partially initialised
    /// behind.
    pub fn new(
        params: SimulationParams,
        backend: Arc<dyn FftBackend>,
    ) -> Result<Self, ConfigError> {
        if !(params.beam_energy > 0.0) {
            return Err(ConfigError::NonPositive {
                name: "beam_energy",
                value: params.beam_energy,
            });
        }
        if params.crystal_thickness < 0.0 {
            return Err(ConfigError::NegativeThickness(params.crystal_thickness));
        }
        if params.temperature < 0.0 {
            return Err(ConfigError::NegativeTemperature(params.temperature));
        }
        if params.part_k_max < 0.0 {
            return Err(ConfigError::NegativePartialCoherence(params.part_k_max));
        }
        if params.part_k_extent == 0 {
            return Err(ConfigError::ZeroPartialExtent);
        }
        if let Some(mu) = params.absorption {
            if !(mu > 0.0) {
                return Err(ConfigError::NonPositive {
                    name: "absorption",
                    value: mu,
                });
            }
        }

        let model = LatticeModel::new(&params.lattice)?;
        for layer in model.layers() {
            for atom in &layer.atoms {
                scattering::check_element(atom.atomic_number)?;
            }
        }

        let grid = GridSpec::new(
            params.num_pixels,
            params.num_unit_cells,
            model.a(),
            params.k_max,
        )?;

        let wavelength = scattering::electron_wavelength(params.beam_energy);
        let sigma = scattering::interaction_constant(params.beam_energy);

        let indexer = ReflectionIndexer::new(
            params.bravais,
            &grid,
            model.a(),
            params.part_k_max,
            params.part_k_extent,
        );
        if let Some(tb) = params.two_beam {
            if indexer.position(tb.h, tb.k).is_none() {
                return Err(ConfigError::TwoBeamNotAllowed {
                    h: tb.h,
                    k: tb.k,
                    lattice: params.bravais,
                });
            }
            if params.part_k_max > 0.0 {
                log::warn!(
                    "two-beam mode discards amplitude outside (000) and \
                     ({},{}); partial-coherence averaging over neighbouring \
                     bins is effectively inert",
                    tb.h,
                    tb.k
                );
            }
        }

        let potentials = potential::layer_potentials(
            &model,
            &grid,
            params.temperature,
            params.debye_waller_b,
            backend.as_ref(),
        )?;
        let transmissions =
            transmission::transmission_functions(&potentials, sigma, params.absorption);

        // Slice schedule from the crystal thickness.
        let z_spacing = model.z_spacing();
        let ratio = params.crystal_thickness / z_spacing;
        let mut n_full_slices = ratio.floor() as usize;
        let mut partial_dz = params.crystal_thickness - n_full_slices as f64 * z_spacing;
        if partial_dz <= SLICE_TOL * z_spacing {
            partial_dz = 0.0;
        } else if z_spacing - partial_dz <= SLICE_TOL * z_spacing {
            n_full_slices += 1;
            partial_dz = 0.0;
        }

        let build_kernel = |dz: f64| match params.two_beam {
            Some(tb) => propagator::two_beam_kernel(&grid, wavelength, dz, tb),
            None => propagator::fresnel_kernel(&grid, wavelength, dz),
        };
        let full_kernel = build_kernel(z_spacing);
        let partial_kernel = (partial_dz > 0.0).then(|| build_kernel(partial_dz));

        Ok(Self {
            params,
            grid,
            model,
            wavelength,
            sigma,
            transmissions,
            full_kernel,
            partial_kernel,
            n_full_slices,
            partial_dz,
            indexer,
            backend,
        })
    }

    /// Evaluate diffracted intensities for one beam tilt.
    ///
    /// In [`RecordMode::Depth`] an intensity snapshot is taken after every
    /// slice without perturbing the evolving wavefunction, yielding the
    /// full depth series from a single pass.
    pub fn intensity(&self, tilt: Tilt, mode: RecordMode) -> Result<TiltEvaluation, RunError> {
        let n_layers = self.model.num_layers();
        let total_slices = self.num_slices();
        let mut wave = self.incident_wave(tilt);
        let mut depth_rows: Vec<Array1<f64>> = Vec::new();

        for slice in 0..total_slices {
            let layer = slice % n_layers;
            let kernel = if slice < self.n_full_slices {
                &self.full_kernel
            } else {
                self.partial_kernel
                    .as_ref()
                    .expect("partial kernel exists whenever a partial slice is scheduled")
            };

            wave *= &self.transmissions[layer];
            self.backend.forward_fft_2d(&mut wave);
            wave *= kernel;
            self.backend.inverse_fft_2d(&mut wave);

            if !wave.iter().all(|v| v.re.is_finite() && v.im.is_finite()) {
                return Err(RunError::NonFiniteWave {
                    slice,
                    tilt_x: tilt.angle_x,
                    tilt_y: tilt.angle_y,
                });
            }

            if mode == RecordMode::Depth {
                let spectrum = self.spectrum_of(&wave);
                depth_rows.push(extract_intensities(&spectrum, &self.indexer));
            }
        }

        let intensities = match mode {
            RecordMode::Final => {
                let spectrum = self.spectrum_of(&wave);
                IntensityRecord::Final(extract_intensities(&spectrum, &self.indexer))
            }
            RecordMode::Depth => {
                let mut series = Array2::zeros((depth_rows.len(), self.indexer.len()));
                for (i, row) in depth_rows.iter().enumerate() {
                    series.row_mut(i).assign(row);
                }
                IntensityRecord::Depth(series)
            }
        };

        Ok(TiltEvaluation {
            tilt,
            intensities,
            exit_wave: wave,
        })
    }

    /// Normalised reciprocal-space amplitude of a real-space wave: the
    /// forward transform divided by the pixel count, so a unit plane wave
    /// has amplitude 1 in its single bin.
    pub fn spectrum_of(&self, wave: &Array2<Complex64>) -> Array2<Complex64> {
        let mut spectrum = wave.clone();
        self.backend.forward_fft_2d(&mut spectrum);
        let scale = 1.0 / self.grid.len() as f64;
        spectrum.mapv_inplace(|v| v * scale);
        spectrum
    }

    /// Incident plane wave, tilted via a linear phase ramp. The crystal
    /// rotation is realised as the equivalent counter-rotation of the tilt
    /// vector, keeping reflections on exact grid bins.
    fn incident_wave(&self, tilt: Tilt) -> Array2<Complex64> {
        let n = self.grid.num_pixels;
        let (tx, ty) = self.rotated_tilt(tilt);
        if tx == 0.0 && ty == 0.0 {
            return Array2::from_elem((n, n), Complex64::new(1.0, 0.0));
        }
        // mrad → transverse spatial frequency (Å⁻¹).
        let ktx = tx * 1e-3 / self.wavelength;
        let kty = ty * 1e-3 / self.wavelength;
        let px = self.grid.pixel_size;
        Array2::from_shape_fn((n, n), |(i, j)| {
            let phase = 2.0
                * std::f64::consts::PI
                * (ktx * i as f64 * px + kty * j as f64 * px);
            Complex64::new(0.0, phase).exp()
        })
    }

    fn rotated_tilt(&self, tilt: Tilt) -> (f64, f64) {
        if self.params.rotation == 0.0 {
            return (tilt.angle_x, tilt.angle_y);
        }
        let phi = self.params.rotation.to_radians();
        let (s, c) = phi.sin_cos();
        (
            c * tilt.angle_x + s * tilt.angle_y,
            -s * tilt.angle_x + c * tilt.angle_y,
        )
    }

    /// Allowed reflections, in the ordering used by every intensity array.
    pub fn reflections(&self) -> &[Reflection] {
        self.indexer.reflections()
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    pub fn lattice_model(&self) -> &LatticeModel {
        &self.model
    }

    /// Relativistic electron wavelength (Å).
    pub fn wavelength(&self) -> f64 {
        self.wavelength
    }

    /// Interaction constant σ (rad·V⁻¹·Å⁻¹).
    pub fn interaction_constant(&self) -> f64 {
        self.sigma
    }

    /// Total slices applied per run, including a trailing partial slice.
    pub fn num_slices(&self) -> usize {
        self.n_full_slices + usize::from(self.partial_dz > 0.0)
    }
}
