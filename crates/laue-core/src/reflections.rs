//! Reflection indexing: enumerates the Miller indices allowed by the
//! Bravais selection rule within the scattering cutoff, and maps each one
//! to its grid pixel(s): a single pixel for a coherent beam, a normalised
//! Gaussian-weighted neighbourhood under partial coherence.

use crate::grid::GridSpec;
use crate::lattice::BravaisLattice;

/// One allowed diffracted beam.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reflection {
    pub h: i32,
    pub k: i32,
    /// |g| = √(h² + k²) / a (Å⁻¹).
    pub g: f64,
}

/// A grid pixel contributing to one reflection's intensity.
#[derive(Debug, Clone, Copy)]
pub struct WeightedPixel {
    pub row: usize,
    pub col: usize,
    /// Non-negative; weights sum to 1 across a reflection's pixel set.
    pub weight: f64,
}

/// Immutable reflection list plus per-reflection pixel maps, computed once
/// per configuration and shared read-only across tilt evaluations.
#[derive(Debug, Clone)]
pub struct ReflectionIndexer {
    reflections: Vec<Reflection>,
    maps: Vec<Vec<WeightedPixel>>,
}

impl ReflectionIndexer {
    pub fn new(
        bravais: BravaisLattice,
        grid: &GridSpec,
        lattice_constant: f64,
        part_k_max: f64,
        part_k_extent: u32,
    ) -> Self {
        // Half the spacing between adjacent integer reflections. Beyond
        // this, neighbouring Gaussians overlap and the weight assignment
        // becomes ambiguous.
        let half_spacing = 0.5 / lattice_constant;
        if part_k_max > half_spacing {
            log::warn!(
                "part_k_max = {:.4} Å⁻¹ exceeds half the reflection spacing \
                 ({:.4} Å⁻¹); partial-coherence weights of neighbouring \
                 reflections overlap and intensities may alias",
                part_k_max,
                half_spacing
            );
        }

        let h_max = (grid.k_max * lattice_constant).floor() as i32;
        let mut reflections = Vec::new();
        for h in -h_max..=h_max {
            for k in -h_max..=h_max {
                let g = ((h * h + k * k) as f64).sqrt() / lattice_constant;
                if g <= grid.k_max && bravais.allows(h, k) {
                    reflections.push(Reflection { h, k, g });
                }
            }
        }
        reflections.sort_by(|a, b| {
            let ga = a.h * a.h + a.k * a.k;
            let gb = b.h * b.h + b.k * b.k;
            ga.cmp(&gb).then(a.h.cmp(&b.h)).then(a.k.cmp(&b.k))
        });

        let maps = reflections
            .iter()
            .map(|r| pixel_map(r, grid, part_k_max, part_k_extent))
            .collect();

        Self { reflections, maps }
    }

    /// Allowed reflections, ordered by |g| then (h, k); (0, 0) is first.
    pub fn reflections(&self) -> &[Reflection] {
        &self.reflections
    }

    pub fn len(&self) -> usize {
        self.reflections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reflections.is_empty()
    }

    /// Pixel map of reflection `index`.
    pub fn pixels(&self, index: usize) -> &[WeightedPixel] {
        &self.maps[index]
    }

    /// Position of (h, k) in the reflection list, if allowed.
    pub fn position(&self, h: i32, k: i32) -> Option<usize> {
        self.reflections.iter().position(|r| r.h == h && r.k == k)
    }
}

/// Map one reflection onto grid pixels.
///
/// The ideal location of (h, k) is the exact grid bin (h·M, k·M). With a
/// coherent beam that single bin carries weight 1. With partial coherence
/// the beam's angular spread is an isotropic Gaussian of width `part_k_max`
/// around the ideal point; every bin within `part_k_extent` standard
/// deviations contributes, weighted by the Gaussian density and normalised
/// so the set sums to 1.
fn pixel_map(
    reflection: &Reflection,
    grid: &GridSpec,
    part_k_max: f64,
    part_k_extent: u32,
) -> Vec<WeightedPixel> {
    let m = grid.num_unit_cells as i64;
    let centre_row = reflection.h as i64 * m;
    let centre_col = reflection.k as i64 * m;

    if part_k_max <= 0.0 {
        return vec![WeightedPixel {
            row: grid.wrap_pixel(centre_row),
            col: grid.wrap_pixel(centre_col),
            weight: 1.0,
        }];
    }

    let sigma_pix = part_k_max / grid.k_pixel;
    let radius = part_k_extent as f64 * sigma_pix;
    let reach = radius.ceil() as i64;

    let mut pixels = Vec::new();
    let mut total = 0.0;
    for dr in -reach..=reach {
        for dc in -reach..=reach {
            let d2 = (dr * dr + dc * dc) as f64;
            if d2 > radius * radius {
                continue;
            }
            let weight = (-d2 / (2.0 * sigma_pix * sigma_pix)).exp();
            total += weight;
            pixels.push(WeightedPixel {
                row: grid.wrap_pixel(centre_row + dr),
                col: grid.wrap_pixel(centre_col + dc),
                weight,
            });
        }
    }
    for p in &mut pixels {
        p.weight /= total;
    }
    pixels
}
