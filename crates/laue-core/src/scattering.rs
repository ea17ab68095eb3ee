//! Electron-optical constants and atomic scattering data.
//!
//! Wavelength and interaction constant include the relativistic mass
//! correction. Atomic form factors use the Doyle & Turner (1968)
//! four-Gaussian fits to the Born-approximation electron scattering
//! amplitudes, f_e(s) = Σᵢ aᵢ·exp(−bᵢ·s²) with s = |g|/2 in Å⁻¹.

use crate::error::ConfigError;

/// Electron rest energy m₀c² (eV).
const REST_ENERGY: f64 = 510_998.95;

/// h / sqrt(2·m₀·e), in Å·V^½.
const WAVELENGTH_CONST: f64 = 12.264_26;

/// e / (2·m₀c²), in V⁻¹.
const RELATIVISTIC_CONST: f64 = 0.978_475_3e-6;

/// h² / (2π·m₀·e), in V·Å²: converts form-factor sums per unit-cell area
/// into projected potential (V·Å).
pub const POTENTIAL_PREFACTOR: f64 = 47.878_01;

/// Relativistic electron wavelength (Å) for an accelerating voltage (V).
pub fn electron_wavelength(beam_energy: f64) -> f64 {
    WAVELENGTH_CONST / (beam_energy * (1.0 + RELATIVISTIC_CONST * beam_energy)).sqrt()
}

/// Interaction constant σ (rad·V⁻¹·Å⁻¹) for an accelerating voltage (V).
///
/// σ = (2π / λV) · (m₀c² + eV) / (2m₀c² + eV), which reduces to the
/// non-relativistic π/(λV) as V → 0.
pub fn interaction_constant(beam_energy: f64) -> f64 {
    let lambda = electron_wavelength(beam_energy);
    let mass_ratio = (REST_ENERGY + beam_energy) / (2.0 * REST_ENERGY + beam_energy);
    2.0 * std::f64::consts::PI / (lambda * beam_energy) * mass_ratio
}

/// Debye-Waller B factor (Å²) at a given temperature, scaled linearly from
/// its room-temperature value. The damping applied to a reflection at
/// scattering parameter s is exp(−B·s²).
pub fn debye_waller_b(b_room: f64, temperature: f64) -> f64 {
    b_room * temperature / 295.0
}

struct FormFactor {
    z: u32,
    a: [f64; 4],
    b: [f64; 4],
}

/// Doyle & Turner (1968) four-Gaussian coefficients.
const FORM_FACTORS: &[FormFactor] = &[
    FormFactor { z: 6,  a: [0.7307, 1.1951, 0.4563, 0.1247], b: [36.9951, 11.2966, 2.8139, 0.3456] },
    FormFactor { z: 7,  a: [0.5717, 1.0425, 0.4647, 0.1311], b: [28.8465, 9.0542, 2.4213, 0.3167] },
    FormFactor { z: 8,  a: [0.4548, 0.9173, 0.4719, 0.1384], b: [23.7803, 7.6220, 2.1440, 0.2959] },
    FormFactor { z: 12, a: [2.2682, 1.8025, 0.8394, 0.2892], b: [73.6704, 20.1749, 3.0181, 0.4046] },
    FormFactor { z: 13, a: [2.2756, 2.4280, 0.8578, 0.3166], b: [72.3220, 19.7729, 3.0806, 0.4082] },
    FormFactor { z: 14, a: [2.1293, 2.5333, 0.8349, 0.3216], b: [57.7748, 16.4756, 2.8796, 0.3860] },
    FormFactor { z: 22, a: [3.5653, 2.8181, 1.8930, 0.4825], b: [81.9821, 19.0486, 3.5904, 0.3855] },
    FormFactor { z: 24, a: [2.3066, 2.3339, 1.8226, 0.4901], b: [78.4051, 15.7851, 3.1566, 0.3636] },
    FormFactor { z: 26, a: [2.5440, 2.3434, 1.7588, 0.5062], b: [64.4244, 14.8806, 2.8539, 0.3502] },
    FormFactor { z: 28, a: [2.2104, 2.1342, 1.6891, 0.5238], b: [58.7267, 13.5530, 2.6345, 0.3392] },
    FormFactor { z: 29, a: [2.1570, 1.9509, 1.6280, 0.5397], b: [56.4727, 12.7007, 2.5639, 0.3310] },
    FormFactor { z: 32, a: [2.4467, 2.7015, 1.6157, 0.6009], b: [55.8930, 14.3930, 2.4461, 0.3415] },
    FormFactor { z: 42, a: [3.1199, 3.9061, 2.3615, 0.8504], b: [72.4642, 14.6424, 3.2370, 0.3662] },
    FormFactor { z: 47, a: [2.0355, 3.2716, 2.5105, 0.8372], b: [61.4970, 11.8237, 2.8456, 0.3271] },
    FormFactor { z: 74, a: [2.9550, 4.2610, 3.1470, 1.0987], b: [67.8963, 12.9000, 2.8900, 0.3200] },
    FormFactor { z: 79, a: [2.3880, 4.2259, 2.6886, 1.2551], b: [42.8656, 9.7430, 2.2641, 0.3067] },
    FormFactor { z: 82, a: [3.5099, 4.5523, 3.1539, 1.3591], b: [52.9141, 11.8840, 2.5712, 0.3206] },
];

/// Electron scattering amplitude f_e(s) in Å, or `None` for an untabulated
/// element. s = |g|/2 in Å⁻¹.
pub fn form_factor(atomic_number: u32, s: f64) -> Option<f64> {
    let entry = FORM_FACTORS.iter().find(|f| f.z == atomic_number)?;
    let s2 = s * s;
    Some(
        entry
            .a
            .iter()
            .zip(entry.b.iter())
            .map(|(&a, &b)| a * (-b * s2).exp())
            .sum(),
    )
}

/// Eager check used at configuration time.
pub fn check_element(atomic_number: u32) -> Result<(), ConfigError> {
    if FORM_FACTORS.iter().any(|f| f.z == atomic_number) {
        Ok(())
    } else {
        Err(ConfigError::UnknownElement(atomic_number))
    }
}
