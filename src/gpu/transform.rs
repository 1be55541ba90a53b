use rustfft::num_complex::Complex;

use super::pipeline::GpuPipeline;
use crate::error::{AnalyzerError, Result};
use crate::transform::window::WindowFunction;
use crate::transform::TransformProvider;

/// The device radix-2 transform behind the CPU [`TransformProvider`] seam.
/// One block per submission, so it is only useful for cross-checking.
pub struct GpuTransform {
    pipeline: GpuPipeline,
    output: Vec<Complex<f64>>,
}

impl GpuTransform {
    pub fn new(size: usize) -> Result<Self> {
        Ok(Self {
            pipeline: GpuPipeline::new(size, WindowFunction::Rectangular)?,
            output: Vec::new(),
        })
    }
}

impl TransformProvider for GpuTransform {
    fn size(&self) -> usize {
        self.pipeline.block_size()
    }

    fn transform(&mut self, block: &[f64]) -> Result<&[Complex<f64>]> {
        if block.len() != self.size() {
            return Err(AnalyzerError::Transform(format!(
                "expected {} samples, got {}",
                self.size(),
                block.len()
            )));
        }
        self.output = self.pipeline.transform(block)?;
        Ok(&self.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::RealFftTransform;
    use approx::assert_relative_eq;

    // Run with `cargo test -- --ignored` on a shader-f64 capable adapter.
    #[test]
    #[ignore = "needs a GPU adapter with shader-f64"]
    fn agrees_with_realfft() {
        let mut gpu = GpuTransform::new(512).expect("GPU adapter with shader-f64");
        let block: Vec<f64> = (0..512)
            .map(|n| {
                let t = n as f64 / 44_100.0;
                (2.0 * std::f64::consts::PI * 1_000.0 * t).sin() + 0.1 * (n % 7) as f64
            })
            .collect();

        let mut cpu = RealFftTransform::new(512);
        let expected = cpu.transform(&block).unwrap().to_vec();
        let actual = gpu.transform(&block).unwrap();
        assert_eq!(actual.len(), expected.len());

        let peak = expected.iter().map(|c| c.norm()).fold(0.0, f64::max);
        for (a, e) in actual.iter().zip(&expected) {
            assert_relative_eq!(a.norm(), e.norm(), max_relative = 1e-6, epsilon = 1e-12 * peak);
        }
    }

    #[test]
    #[ignore = "needs a GPU adapter with shader-f64"]
    fn wrong_length_is_rejected() {
        let mut gpu = GpuTransform::new(64).expect("GPU adapter with shader-f64");
        assert!(matches!(gpu.transform(&[0.0; 32]), Err(AnalyzerError::Transform(_))));
    }
}
