//! Forward real-to-complex transforms.
//!
//! Every backend plans once for a fixed size and reuses the plan and its
//! scratch buffers for each block handed to [`TransformProvider::transform`].

pub mod cpu;
pub mod window;

use rustfft::num_complex::Complex;
use serde::Deserialize;

use crate::error::Result;

pub use cpu::{RealFftTransform, RustFftTransform};

/// A forward DFT of fixed size `N` over real input.
pub trait TransformProvider {
    /// Block length `N` this provider was planned for.
    fn size(&self) -> usize;

    /// Transform exactly `size()` real samples and return the `N/2 + 1`
    /// non-negative-frequency outputs X[k] = Σ x[n]·e^(−2πi·kn/N).
    ///
    /// The returned slice borrows the provider's output buffer and is
    /// overwritten by the next call.
    fn transform(&mut self, block: &[f64]) -> Result<&[Complex<f64>]>;
}

/// Library backend used by the CPU strategies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransformBackend {
    /// Real-to-complex plan (`realfft`).
    #[default]
    #[value(name = "realfft")]
    RealFft,
    /// Complex plan over a zero-imaginary buffer (`rustfft`).
    #[value(name = "rustfft")]
    RustFft,
}

impl TransformBackend {
    pub fn create(self, size: usize) -> Box<dyn TransformProvider + Send> {
        match self {
            TransformBackend::RealFft => Box::new(RealFftTransform::new(size)),
            TransformBackend::RustFft => Box::new(RustFftTransform::new(size)),
        }
    }
}

/// Number of outputs a real transform of `size` produces.
pub fn output_len(size: usize) -> usize {
    size / 2 + 1
}

impl<T: TransformProvider + ?Sized> TransformProvider for Box<T> {
    fn size(&self) -> usize {
        (**self).size()
    }

    fn transform(&mut self, block: &[f64]) -> Result<&[Complex<f64>]> {
        (**self).transform(block)
    }
}
