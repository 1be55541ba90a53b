//! Offline spectral analysis of raw PCM recordings.
//!
//! A recording is cut into overlapping windows, every window is transformed,
//! and the per-bin magnitudes are averaged and reported in dB. The work runs
//! sequentially, on a worker pool, or on the GPU; see [`analysis::run`].

pub mod analysis;
pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod gpu;
pub mod report;
pub mod transform;

pub use error::{AnalyzerError, Result};
