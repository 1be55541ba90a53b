use realfft::{RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

use super::{output_len, TransformProvider};
use crate::error::{AnalyzerError, Result};

fn check_len(expected: usize, block: &[f64]) -> Result<()> {
    if block.len() != expected {
        return Err(AnalyzerError::Transform(format!(
            "block has {} samples, plan expects {}",
            block.len(),
            expected
        )));
    }
    Ok(())
}

/// Real-to-complex transform backed by `realfft`.
pub struct RealFftTransform {
    r2c: Arc<dyn RealToComplex<f64>>,
    input: Vec<f64>,
    output: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
}

impl RealFftTransform {
    pub fn new(size: usize) -> Self {
        let mut planner = RealFftPlanner::<f64>::new();
        let r2c = planner.plan_fft_forward(size);
        let input = r2c.make_input_vec();
        let output = r2c.make_output_vec();
        let scratch = r2c.make_scratch_vec();
        Self {
            r2c,
            input,
            output,
            scratch,
        }
    }
}

impl TransformProvider for RealFftTransform {
    fn size(&self) -> usize {
        self.input.len()
    }

    fn transform(&mut self, block: &[f64]) -> Result<&[Complex<f64>]> {
        check_len(self.input.len(), block)?;
        // the plan uses its input as scratch, so copy in every time
        self.input.copy_from_slice(block);
        self.r2c
            .process_with_scratch(&mut self.input, &mut self.output, &mut self.scratch)
            .map_err(|e| AnalyzerError::Transform(e.to_string()))?;
        Ok(&self.output)
    }
}

/// Complex FFT from `rustfft` run over a buffer with zero imaginary parts.
pub struct RustFftTransform {
    fft: Arc<dyn Fft<f64>>,
    buffer: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
}

impl RustFftTransform {
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        Self {
            fft,
            buffer: vec![Complex::new(0.0, 0.0); size],
            scratch,
        }
    }
}

impl TransformProvider for RustFftTransform {
    fn size(&self) -> usize {
        self.buffer.len()
    }

    fn transform(&mut self, block: &[f64]) -> Result<&[Complex<f64>]> {
        check_len(self.buffer.len(), block)?;
        for (slot, &x) in self.buffer.iter_mut().zip(block) {
            *slot = Complex::new(x, 0.0);
        }
        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);
        Ok(&self.buffer[..output_len(self.buffer.len())])
    }
}
