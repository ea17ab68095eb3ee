//! CPU compute backend using rustfft, parallelised across lines with Rayon.

use std::sync::Mutex;

use ndarray::Array2;
use num_complex::Complex64;
use rayon::prelude::*;
use rustfft::{Fft, FftDirection, FftPlanner};

use crate::backend::{BackendType, DeviceInfo, FftBackend};

/// CPU backend performing 2-D transforms as a row pass followed by a
/// column pass (via transpose), each parallelised across lines.
pub struct CpuFftBackend {
    planner: Mutex<FftPlanner<f64>>,
    num_threads: usize,
}

impl CpuFftBackend {
    /// Create a new CPU backend using all available threads.
    pub fn new() -> Self {
        Self {
            planner: Mutex::new(FftPlanner::new()),
            num_threads: rayon::current_num_threads(),
        }
    }
}

impl Default for CpuFftBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuFftBackend {
    fn transform(&self, field: &mut Array2<Complex64>, direction: FftDirection) {
        let (rows, cols) = field.dim();
        let (row_fft, col_fft) = {
            let mut planner = self.planner.lock().expect("FFT planner mutex poisoned");
            (
                planner.plan_fft(cols, direction),
                planner.plan_fft(rows, direction),
            )
        };

        // Row pass: each row is a contiguous line of the standard-layout array.
        process_lines(
            field
                .as_slice_mut()
                .expect("wavefunction arrays are standard layout"),
            row_fft.as_ref(),
        );

        // Column pass on the transposed copy, then write back.
        let mut transposed = field.t().as_standard_layout().to_owned();
        process_lines(
            transposed
                .as_slice_mut()
                .expect("transposed copy is standard layout"),
            col_fft.as_ref(),
        );
        field.assign(&transposed.t());
    }
}

/// Run one FFT per `fft.len()`-sized line of the buffer, in parallel.
fn process_lines(buffer: &mut [Complex64], fft: &dyn Fft<f64>) {
    let len = fft.len();
    let scratch_len = fft.get_inplace_scratch_len();
    buffer.par_chunks_exact_mut(len).for_each_init(
        || vec![Complex64::new(0.0, 0.0); scratch_len],
        |scratch, line| fft.process_with_scratch(line, scratch),
    );
}

impl FftBackend for CpuFftBackend {
    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            name: format!("CPU ({} threads)", self.num_threads),
            backend_type: BackendType::Cpu,
            compute_units: Some(self.num_threads),
        }
    }

    fn forward_fft_2d(&self, field: &mut Array2<Complex64>) {
        self.transform(field, FftDirection::Forward);
    }

    fn inverse_fft_2d(&self, field: &mut Array2<Complex64>) {
        self.transform(field, FftDirection::Inverse);
        let scale = 1.0 / field.len() as f64;
        field.mapv_inplace(|v| v * scale);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;

    #[test]
    fn test_forward_inverse_roundtrip() {
        let backend = CpuFftBackend::new();
        let n = 16;
        let mut field = Array2::from_shape_fn((n, n), |(i, j)| {
            Complex64::new((i as f64 * 0.37).sin(), (j as f64 * 0.61).cos())
        });
        let original = field.clone();

        backend.forward_fft_2d(&mut field);
        backend.inverse_fft_2d(&mut field);

        for (a, b) in field.iter().zip(original.iter()) {
            assert_abs_diff_eq!(a.re, b.re, epsilon = 1e-12);
            assert_abs_diff_eq!(a.im, b.im, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_uniform_field_transforms_to_dc_delta() {
        let backend = CpuFftBackend::new();
        let n = 8;
        let mut field = Array2::from_elem((n, n), Complex64::new(1.0, 0.0));

        backend.forward_fft_2d(&mut field);

        assert_abs_diff_eq!(field[[0, 0]].re, (n * n) as f64, epsilon = 1e-10);
        assert_abs_diff_eq!(field[[0, 0]].im, 0.0, epsilon = 1e-10);
        for (idx, v) in field.indexed_iter() {
            if idx != (0, 0) {
                assert!(v.norm() < 1e-10, "Non-DC bin {:?} should be empty", idx);
            }
        }
    }

    #[test]
    fn test_single_frequency_lands_on_expected_bin() {
        let backend = CpuFftBackend::new();
        let n = 16;
        // exp(2πi(3x/n + 5y/n)) should land on bin (3, 5).
        let mut field = Array2::from_shape_fn((n, n), |(i, j)| {
            let phase =
                2.0 * std::f64::consts::PI * (3.0 * i as f64 + 5.0 * j as f64) / n as f64;
            Complex64::new(0.0, phase).exp()
        });

        backend.forward_fft_2d(&mut field);

        assert!(field[[3, 5]].norm() > (n * n) as f64 * 0.99);
        assert!(field[[0, 0]].norm() < 1e-9);
    }
}
