//! # Laue Compute
//!
//! Compute backend abstraction for the Laue framework. This crate provides
//! an [`FftBackend`](backend::FftBackend) trait that isolates the physics
//! code in `laue-core` from how the per-slice Fourier transforms are
//! executed. Backends affect throughput only: two backends must produce
//! identical results up to floating-point rounding.

pub mod backend;
pub mod cpu;

pub use backend::{create_backend, BackendType, ComputeError, DeviceInfo, FftBackend};
pub use cpu::CpuFftBackend;
