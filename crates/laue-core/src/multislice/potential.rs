//! Projected electrostatic potential of each atomic layer.
//!
//! The potential is assembled in reciprocal space as a structure-factor sum
//! over the layer's atoms and inverse-transformed to the real-space grid.
//! Because the supercell tiles the unit cell M times along each axis, only
//! bins at multiples of M carry amplitude; filling exactly those bins
//! replicates the atomic profiles with exact periodicity and avoids summing
//! real-space tails. Debye-Waller damping multiplies each reciprocal
//! component before the inverse transform.

use ndarray::Array2;
use num_complex::Complex64;

use laue_compute::FftBackend;

use crate::error::ConfigError;
use crate::grid::GridSpec;
use crate::lattice::LatticeModel;
use crate::scattering::{self, POTENTIAL_PREFACTOR};

/// One real-valued projected potential (V·Å) per layer.
pub fn layer_potentials(
    model: &LatticeModel,
    grid: &GridSpec,
    temperature: f64,
    debye_waller_room: f64,
    backend: &dyn FftBackend,
) -> Result<Vec<Array2<f64>>, ConfigError> {
    let a = model.a();
    let b_factor = scattering::debye_waller_b(debye_waller_room, temperature);
    let m = grid.num_unit_cells as i64;
    let n = grid.num_pixels;
    let n_total = grid.len() as f64;
    let h_max = (grid.k_max * a).floor() as i32;
    let cell_area = a * a;

    let mut potentials = Vec::with_capacity(model.num_layers());
    for layer in model.layers() {
        let mut field = Array2::from_elem((n, n), Complex64::new(0.0, 0.0));

        for h in -h_max..=h_max {
            for k in -h_max..=h_max {
                let g_sq = (h * h + k * k) as f64 / cell_area;
                if g_sq > grid.k_max * grid.k_max {
                    continue;
                }
                let s = g_sq.sqrt() / 2.0;
                let damping = (-b_factor * s * s).exp();

                let mut structure_factor = Complex64::new(0.0, 0.0);
                for atom in &layer.atoms {
                    let f = scattering::form_factor(atom.atomic_number, s)
                        .ok_or(ConfigError::UnknownElement(atom.atomic_number))?;
                    let phase = -2.0
                        * std::f64::consts::PI
                        * (h as f64 * atom.x + k as f64 * atom.y);
                    structure_factor += f * Complex64::new(0.0, phase).exp();
                }

                let v_g = POTENTIAL_PREFACTOR / cell_area * damping * structure_factor;
                let row = grid.wrap_pixel(h as i64 * m);
                let col = grid.wrap_pixel(k as i64 * m);
                // The inverse transform divides by the pixel count; scale up
                // so the Fourier coefficients come out as v_g. Accumulate:
                // at exactly the Nyquist bin, +h and −h coincide.
                field[[row, col]] += v_g * n_total;
            }
        }

        backend.inverse_fft_2d(&mut field);
        potentials.push(field.mapv(|v| v.re));
    }

    Ok(potentials)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::Lattice;
    use laue_compute::CpuFftBackend;

    fn build(temperature: f64) -> Vec<Array2<f64>> {
        let lattice = Lattice::simple_cubic(4.0, 14);
        let model = LatticeModel::new(&lattice).unwrap();
        let grid = GridSpec::new(64, 2, 4.0, 1.5).unwrap();
        let backend = CpuFftBackend::new();
        layer_potentials(&model, &grid, temperature, 0.45, &backend).unwrap()
    }

    #[test]
    fn test_potential_peaks_at_atom_positions() {
        let potentials = build(295.0);
        assert_eq!(potentials.len(), 1);
        let v = &potentials[0];

        // One atom at the cell origin, M = 2: peaks at pixels (0,0) and the
        // replicated cell at (32, 32), identical by periodicity.
        let peak = v
            .indexed_iter()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(idx, _)| idx)
            .unwrap();
        assert!(peak == (0, 0) || peak == (0, 32) || peak == (32, 0) || peak == (32, 32));
        assert!((v[[0, 0]] - v[[32, 32]]).abs() < 1e-9);
        assert!((v[[0, 0]] - v[[0, 32]]).abs() < 1e-9);
        assert!(v[[0, 0]] > v[[16, 16]]);
    }

    #[test]
    fn test_higher_temperature_flattens_the_peak() {
        let cold = build(50.0);
        let hot = build(900.0);
        // Stronger Debye-Waller damping suppresses the high-frequency
        // content that sharpens the atomic peak.
        assert!(hot[0][[0, 0]] < cold[0][[0, 0]]);
    }

    #[test]
    fn test_potential_is_m_periodic() {
        let potentials = build(295.0);
        let v = &potentials[0];
        for i in 0..32 {
            for j in 0..32 {
                assert!(
                    (v[[i, j]] - v[[i + 32, j + 32]]).abs() < 1e-9,
                    "potential must repeat with the unit cell"
                );
            }
        }
    }
}
