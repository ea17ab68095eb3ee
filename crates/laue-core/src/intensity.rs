//! Reduction of a reciprocal-space wavefunction into per-reflection
//! intensities using the precomputed pixel maps.

use ndarray::{Array1, Array2};
use num_complex::Complex64;

use crate::reflections::ReflectionIndexer;

/// Per-reflection intensities from a normalised reciprocal-space amplitude.
///
/// `spectrum` must be the forward transform of the real-space wave divided
/// by the total pixel count, so an untilted unit plane wave gives amplitude
/// 1 in the (0, 0) bin. Each reflection's intensity is the weighted sum of
/// |amplitude|² over its pixel map; output ordering matches
/// [`ReflectionIndexer::reflections`]. Values are non-negative and are not
/// normalised to any particular total; the caller interprets them relative
/// to the incident intensity, nominally 1 at zero thickness.
pub fn extract_intensities(
    spectrum: &Array2<Complex64>,
    indexer: &ReflectionIndexer,
) -> Array1<f64> {
    Array1::from_iter((0..indexer.len()).map(|i| {
        indexer
            .pixels(i)
            .iter()
            .map(|p| p.weight * spectrum[[p.row, p.col]].norm_sqr())
            .sum()
    }))
}
