//! Conversion of projected potentials into complex transmission functions.

use ndarray::Array2;
use num_complex::Complex64;

/// Build one transmission function per layer:
/// t(x, y) = exp(i·σ·V(x, y) − μ·σ·V(x, y)) where μ is the phenomenological
/// absorption fraction (an imaginary potential proportional to the real
/// one). With μ = None the transmission is a pure phase grating.
///
/// The functions depend only on the configuration, not on tilt, so they
/// are computed once and reused across every repetition of the layer in
/// the unit-cell stack and across concurrent tilt evaluations.
pub fn transmission_functions(
    potentials: &[Array2<f64>],
    sigma: f64,
    absorption: Option<f64>,
) -> Vec<Array2<Complex64>> {
    let mu = absorption.unwrap_or(0.0);
    potentials
        .iter()
        .map(|v| v.mapv(|p| Complex64::new(-mu * sigma * p, sigma * p).exp()))
        .collect()
}
