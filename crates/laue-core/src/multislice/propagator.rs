//! Fresnel free-space propagation kernels in reciprocal space.
//!
//! The band-limit policy for the whole run lives here: the kernel is
//! zeroed outside `k_max`, so every propagation step clips frequencies
//! beyond the cutoff. The wave itself is never masked separately.

use ndarray::Array2;
use num_complex::Complex64;

use crate::grid::GridSpec;
use crate::types::TwoBeamCondition;

/// Paraxial Fresnel kernel exp(−i·π·λ·Δz·(kx² + ky²)) on the k-grid,
/// zeroed outside the band limit.
pub fn fresnel_kernel(grid: &GridSpec, wavelength: f64, dz: f64) -> Array2<Complex64> {
    let n = grid.num_pixels;
    let k_max_sq = grid.k_max * grid.k_max;
    Array2::from_shape_fn((n, n), |(i, j)| {
        let kx = grid.k_at(i);
        let ky = grid.k_at(j);
        let k_sq = kx * kx + ky * ky;
        if k_sq > k_max_sq {
            Complex64::new(0.0, 0.0)
        } else {
            Complex64::new(0.0, -std::f64::consts::PI * wavelength * dz * k_sq).exp()
        }
    })
}

/// Reduced two-beam kernel: identical phases to [`fresnel_kernel`] but
/// only the (000) bin and the selected reflection survive propagation.
///
/// This enforces the two-beam coupled-amplitude approximation. It is a
/// change of physical model, not an optimisation: amplitude scattered into
/// any other beam is discarded at every slice.
pub fn two_beam_kernel(
    grid: &GridSpec,
    wavelength: f64,
    dz: f64,
    condition: TwoBeamCondition,
) -> Array2<Complex64> {
    let n = grid.num_pixels;
    let m = grid.num_unit_cells as i64;
    let row = grid.wrap_pixel(condition.h as i64 * m);
    let col = grid.wrap_pixel(condition.k as i64 * m);

    let mut kernel = Array2::from_elem((n, n), Complex64::new(0.0, 0.0));
    kernel[[0, 0]] = Complex64::new(1.0, 0.0);
    let kx = grid.k_at(row);
    let ky = grid.k_at(col);
    let k_sq = kx * kx + ky * ky;
    kernel[[row, col]] =
        Complex64::new(0.0, -std::f64::consts::PI * wavelength * dz * k_sq).exp();
    kernel
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> GridSpec {
        GridSpec::new(64, 2, 4.0, 1.0).unwrap()
    }

    #[test]
    fn test_unit_phase_at_zero_frequency() {
        let kernel = fresnel_kernel(&grid(), 0.025, 2.0);
        assert!((kernel[[0, 0]] - Complex64::new(1.0, 0.0)).norm() < 1e-14);
    }

    #[test]
    fn test_kernel_magnitude_is_one_inside_band_limit() {
        let g = grid();
        let kernel = fresnel_kernel(&g, 0.025, 2.0);
        for (idx, v) in kernel.indexed_iter() {
            let kx = g.k_at(idx.0);
            let ky = g.k_at(idx.1);
            if kx * kx + ky * ky <= g.k_max * g.k_max {
                assert!((v.norm() - 1.0).abs() < 1e-14);
            } else {
                assert_eq!(v.norm(), 0.0);
            }
        }
    }

    #[test]
    fn test_band_limit_clips_corners() {
        // The corner of the k-grid lies beyond k_max for this sampling.
        let g = grid();
        let kernel = fresnel_kernel(&g, 0.025, 2.0);
        assert_eq!(kernel[[32, 32]].norm(), 0.0);
    }

    #[test]
    fn test_zero_spacing_kernel_is_identity_inside_band() {
        let g = grid();
        let kernel = fresnel_kernel(&g, 0.025, 0.0);
        for v in kernel.iter() {
            assert!(v.norm() == 0.0 || (v - Complex64::new(1.0, 0.0)).norm() < 1e-14);
        }
    }

    #[test]
    fn test_two_beam_kernel_keeps_exactly_two_bins() {
        let g = grid();
        let kernel = two_beam_kernel(
            &g,
            0.025,
            2.0,
            TwoBeamCondition { h: 1, k: 0 },
        );
        let nonzero: Vec<_> = kernel
            .indexed_iter()
            .filter(|(_, v)| v.norm() > 0.0)
            .map(|(idx, _)| idx)
            .collect();
        assert_eq!(nonzero.len(), 2);
        assert!(nonzero.contains(&(0, 0)));
        assert!(nonzero.contains(&(2, 0)));
    }
}
