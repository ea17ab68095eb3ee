//! Compute backend trait and device abstraction.
//!
//! The [`FftBackend`] trait abstracts over execution environments for the
//! hot-path array operation of the multislice loop: the 2-D Fourier
//! transform pair applied once per slice.

use std::sync::Arc;

use ndarray::Array2;
use num_complex::Complex64;
use thiserror::Error;

/// Errors originating from compute backends.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Backend not available: {0}")]
    Unavailable(String),

    #[error("Device error: {0}")]
    DeviceError(String),
}

/// Describes the capabilities of a compute backend.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub backend_type: BackendType,
    pub compute_units: Option<usize>,
}

/// The type of compute backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    Cpu,
}

/// Abstraction over FFT execution backends.
///
/// Physics code in `laue-core` operates against this trait. Both transforms
/// act in place on a standard-layout `Array2`.
///
/// # Transform convention
///
/// The forward transform is unnormalised; the inverse transform divides by
/// the total element count, so `inverse(forward(x)) == x`. The DC component
/// lives at index `[0, 0]`, with frequencies ordered in the standard FFT
/// layout (index `i` maps to the signed frequency `i` for `i <= n/2` and
/// `i - n` above). Every consumer of reciprocal-space data (propagator
/// kernels, reflection indexing) relies on this single convention.
pub trait FftBackend: Send + Sync {
    /// Return information about the device.
    fn device_info(&self) -> DeviceInfo;

    /// In-place forward 2-D Fourier transform (unnormalised).
    fn forward_fft_2d(&self, field: &mut Array2<Complex64>);

    /// In-place inverse 2-D Fourier transform, normalised by `1/len`.
    fn inverse_fft_2d(&self, field: &mut Array2<Complex64>);
}

/// Select a compute backend from a configuration string.
///
/// Accepts `"auto"` or `"cpu"`. The identifier is matched
/// case-insensitively.
pub fn create_backend(kind: &str) -> Result<Arc<dyn FftBackend>, ComputeError> {
    match kind.to_ascii_lowercase().as_str() {
        "auto" | "cpu" => Ok(Arc::new(crate::cpu::CpuFftBackend::new())),
        other => Err(ComputeError::Unavailable(format!(
            "Unknown backend '{}'. Valid identifiers: auto, cpu",
            other
        ))),
    }
}
