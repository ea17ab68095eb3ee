//! Crystal lattice model: atomic basis, Bravais selection rules, and the
//! depth-ordered layer structure consumed by the multislice loop.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tolerance for identifying coincident fractional coordinates after
/// periodic wraparound.
const COORD_TOL: f64 = 1e-6;

/// The cubic Bravais lattice types supported by the engine.
///
/// Each variant carries the 2-D projection of its structure-factor
/// extinction rule: the third index is fixed by the single-unit-cell
/// projection and folded into the (h, k) plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BravaisLattice {
    SimpleCubic,
    BodyCentered,
    FaceCentered,
    Diamond,
}

impl Default for BravaisLattice {
    fn default() -> Self {
        BravaisLattice::SimpleCubic
    }
}

impl BravaisLattice {
    /// Whether the reflection (h, k) survives this lattice's selection rule.
    pub fn allows(self, h: i32, k: i32) -> bool {
        let both_even = h % 2 == 0 && k % 2 == 0;
        let both_odd = h % 2 != 0 && k % 2 != 0;
        match self {
            BravaisLattice::SimpleCubic => true,
            BravaisLattice::BodyCentered => (h + k) % 2 == 0,
            BravaisLattice::FaceCentered => both_even || both_odd,
            BravaisLattice::Diamond => both_odd || (both_even && (h + k).rem_euclid(4) == 0),
        }
    }
}

/// A cubic crystal: lattice constants plus a fractional atomic basis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lattice {
    /// Lattice constants a, b, c (Å). Cubic in-plane: a = b.
    pub constants: [f64; 3],
    /// Fractional atomic positions, one [x, y, z] triple per atom.
    pub positions: Vec<[f64; 3]>,
    /// Atomic number of each basis atom, matched to `positions`.
    pub atomic_numbers: Vec<u32>,
}

impl Lattice {
    /// Single atom at the origin of a simple cubic cell.
    pub fn simple_cubic(a: f64, atomic_number: u32) -> Self {
        Self {
            constants: [a, a, a],
            positions: vec![[0.0, 0.0, 0.0]],
            atomic_numbers: vec![atomic_number],
        }
    }

    /// Conventional body-centred cubic cell (2-atom basis).
    pub fn body_centered(a: f64, atomic_number: u32) -> Self {
        Self {
            constants: [a, a, a],
            positions: vec![[0.0, 0.0, 0.0], [0.5, 0.5, 0.5]],
            atomic_numbers: vec![atomic_number; 2],
        }
    }

    /// Conventional face-centred cubic cell (4-atom basis).
    pub fn face_centered(a: f64, atomic_number: u32) -> Self {
        Self {
            constants: [a, a, a],
            positions: vec![
                [0.0, 0.0, 0.0],
                [0.5, 0.5, 0.0],
                [0.5, 0.0, 0.5],
                [0.0, 0.5, 0.5],
            ],
            atomic_numbers: vec![atomic_number; 4],
        }
    }

    /// Conventional diamond cell (8-atom basis): fcc plus the (¼,¼,¼) shift.
    pub fn diamond(a: f64, atomic_number: u32) -> Self {
        Self {
            constants: [a, a, a],
            positions: vec![
                [0.0, 0.0, 0.0],
                [0.5, 0.5, 0.0],
                [0.5, 0.0, 0.5],
                [0.0, 0.5, 0.5],
                [0.25, 0.25, 0.25],
                [0.75, 0.75, 0.25],
                [0.75, 0.25, 0.75],
                [0.25, 0.75, 0.75],
            ],
            atomic_numbers: vec![atomic_number; 8],
        }
    }
}

/// One atom within a layer: in-plane fractional position plus species.
#[derive(Debug, Clone, Copy)]
pub struct LayerAtom {
    pub x: f64,
    pub y: f64,
    pub atomic_number: u32,
}

/// A subset of the basis sharing one depth coordinate, ordered by depth.
#[derive(Debug, Clone)]
pub struct Layer {
    /// Fractional depth of the layer within the unit cell.
    pub z: f64,
    pub atoms: Vec<LayerAtom>,
}

/// Validated lattice with atoms grouped into depth-ordered layers.
///
/// Construction wraps all fractional coordinates into [0, 1) and collapses
/// atoms that coincide after wraparound: an atom sitting exactly on a cell
/// edge or corner must be counted once per unit cell, not once per periodic
/// image. Dropped duplicates are logged as a warning since they indicate a
/// problem in the user's structural model.
#[derive(Debug, Clone)]
pub struct LatticeModel {
    constants: [f64; 3],
    layers: Vec<Layer>,
    dropped_duplicates: usize,
}

impl LatticeModel {
    pub fn new(lattice: &Lattice) -> Result<Self, ConfigError> {
        if lattice.positions.is_empty() {
            return Err(ConfigError::EmptyBasis);
        }
        if lattice.positions.len() != lattice.atomic_numbers.len() {
            return Err(ConfigError::BasisLengthMismatch {
                positions: lattice.positions.len(),
                numbers: lattice.atomic_numbers.len(),
            });
        }
        for (axis, &c) in lattice.constants.iter().enumerate() {
            if !(c > 0.0) {
                return Err(ConfigError::NonPositive {
                    name: ["lattice constant a", "lattice constant b", "lattice constant c"]
                        [axis],
                    value: c,
                });
            }
        }

        let wrapped: Vec<([f64; 3], u32)> = lattice
            .positions
            .iter()
            .zip(lattice.atomic_numbers.iter())
            .map(|(p, &z)| ([wrap_unit(p[0]), wrap_unit(p[1]), wrap_unit(p[2])], z))
            .collect();

        // Collapse atoms coincident after wraparound.
        let mut unique: Vec<([f64; 3], u32)> = Vec::with_capacity(wrapped.len());
        let mut dropped = 0usize;
        for (pos, z) in wrapped {
            let duplicate = unique
                .iter()
                .any(|(q, _)| (0..3).all(|i| periodic_close(pos[i], q[i])));
            if duplicate {
                dropped += 1;
                log::warn!(
                    "dropping duplicate atom Z={} at ({:.4}, {:.4}, {:.4}): \
                     coincides with an earlier atom after periodic wraparound",
                    z,
                    pos[0],
                    pos[1],
                    pos[2]
                );
            } else {
                unique.push((pos, z));
            }
        }

        // Group by depth, ordered from the entrance surface down.
        let mut layers: Vec<Layer> = Vec::new();
        let mut sorted = unique;
        sorted.sort_by(|a, b| a.0[2].partial_cmp(&b.0[2]).unwrap_or(std::cmp::Ordering::Equal));
        for (pos, z) in sorted {
            let atom = LayerAtom {
                x: pos[0],
                y: pos[1],
                atomic_number: z,
            };
            match layers.last_mut() {
                Some(layer) if (layer.z - pos[2]).abs() < COORD_TOL => layer.atoms.push(atom),
                _ => layers.push(Layer {
                    z: pos[2],
                    atoms: vec![atom],
                }),
            }
        }

        Ok(Self {
            constants: lattice.constants,
            layers,
            dropped_duplicates: dropped,
        })
    }

    /// In-plane lattice constant a (Å).
    pub fn a(&self) -> f64 {
        self.constants[0]
    }

    /// Unit-cell height c (Å).
    pub fn c(&self) -> f64 {
        self.constants[2]
    }

    /// Depth-ordered layers.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Inter-layer spacing: unit-cell height / number of layers (Å).
    pub fn z_spacing(&self) -> f64 {
        self.constants[2] / self.layers.len() as f64
    }

    /// How many basis atoms were collapsed as periodic-boundary duplicates.
    pub fn dropped_duplicates(&self) -> usize {
        self.dropped_duplicates
    }
}

/// Wrap a fractional coordinate into [0, 1).
fn wrap_unit(x: f64) -> f64 {
    let w = x.rem_euclid(1.0);
    // rem_euclid(1.0) can return 1.0 for inputs just below an integer.
    if w >= 1.0 {
        0.0
    } else {
        w
    }
}

/// Whether two wrapped coordinates coincide, treating 0 and 1-ε as equal.
fn periodic_close(a: f64, b: f64) -> bool {
    let d = (a - b).abs();
    d < COORD_TOL || (1.0 - d) < COORD_TOL
}
