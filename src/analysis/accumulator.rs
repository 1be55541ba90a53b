use indicatif::ProgressBar;
use rustfft::num_complex::Complex;
use std::ops::Range;

use super::{SpectrumResult, WindowPlan};
use crate::error::{AnalyzerError, Result};
use crate::transform::window::WindowFunction;
use crate::transform::TransformProvider;

/// Fractional bits of the fixed-point magnitude sums.
const FRACTION_BITS: u32 = 80;
const SCALE: f64 = (1u128 << FRACTION_BITS) as f64;

/// Magnitude as a fixed-point integer with 2^-80 resolution.
///
/// Block magnitudes are at most `block_size` for samples in [-1, 1], so the
/// sum of 2^30 windows of a 512-point block still fits in an `i128`.
fn to_fixed(magnitude: f64) -> i128 {
    (magnitude * SCALE).round() as i128
}

/// Running per-bin magnitude sums and the number of windows folded in.
///
/// Sums are kept in fixed point, so adding and merging are exact and the
/// result does not depend on the order windows were folded in. Rounding to
/// `f64` happens once, in [`BinAccumulator::average`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinAccumulator {
    sums: Vec<i128>,
    windows: usize,
}

impl BinAccumulator {
    pub fn new(bins: usize) -> Self {
        Self {
            sums: vec![0; bins],
            windows: 0,
        }
    }

    /// Fold in one window's transform output. Only the first `bins` outputs
    /// are used, so the Nyquist term is ignored.
    pub fn add_spectrum(&mut self, spectrum: &[Complex<f64>]) {
        for (sum, c) in self.sums.iter_mut().zip(spectrum) {
            *sum = sum.saturating_add(to_fixed(c.norm()));
        }
        self.windows += 1;
    }

    /// Fold in one window of precomputed magnitudes.
    pub fn add_magnitudes<T: Copy + Into<f64>>(&mut self, magnitudes: &[T]) {
        for (sum, &m) in self.sums.iter_mut().zip(magnitudes) {
            *sum = sum.saturating_add(to_fixed(m.into()));
        }
        self.windows += 1;
    }

    pub fn merge(&mut self, other: &BinAccumulator) {
        debug_assert_eq!(self.sums.len(), other.sums.len());
        for (sum, &partial) in self.sums.iter_mut().zip(&other.sums) {
            *sum = sum.saturating_add(partial);
        }
        self.windows += other.windows;
    }

    /// Per-bin magnitude sums.
    pub fn sums(&self) -> Vec<f64> {
        self.sums.iter().map(|&s| s as f64 / SCALE).collect()
    }

    pub fn windows(&self) -> usize {
        self.windows
    }

    pub fn bins(&self) -> usize {
        self.sums.len()
    }

    /// Mean magnitude per bin.
    pub fn average(&self, plan: &WindowPlan) -> Result<Vec<f64>> {
        if self.windows == 0 {
            return Err(plan.degenerate());
        }
        let count = self.windows as f64;
        Ok(self.sums().into_iter().map(|s| s / count).collect())
    }

    pub fn into_spectrum(self, plan: &WindowPlan, sample_rate: u32) -> Result<SpectrumResult> {
        let db = self.average(plan)?.into_iter().map(to_db).collect();
        Ok(SpectrumResult::new(db, plan.block_size(), sample_rate, self.windows))
    }
}

/// 20·log10(magnitude); silence maps to -inf.
pub fn to_db(magnitude: f64) -> f64 {
    20.0 * magnitude.log10()
}

/// Slides a window over the samples, transforms each block and sums the
/// magnitudes into a [`BinAccumulator`].
pub struct WindowAccumulator<'a, P> {
    samples: &'a [f64],
    plan: WindowPlan,
    coefficients: Option<Vec<f64>>,
    provider: P,
    block: Vec<f64>,
    bins: BinAccumulator,
    progress: ProgressBar,
}

impl<'a, P: TransformProvider> WindowAccumulator<'a, P> {
    pub fn new(
        samples: &'a [f64],
        plan: WindowPlan,
        window: WindowFunction,
        provider: P,
    ) -> Result<Self> {
        if provider.size() != plan.block_size() {
            return Err(AnalyzerError::Transform(format!(
                "provider planned for {} samples, blocks have {}",
                provider.size(),
                plan.block_size()
            )));
        }
        let coefficients =
            (!window.is_rectangular()).then(|| window.coefficients(plan.block_size()));
        Ok(Self {
            samples,
            plan,
            coefficients,
            provider,
            block: vec![0.0; plan.block_size()],
            bins: BinAccumulator::new(plan.bins()),
            progress: ProgressBar::hidden(),
        })
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Process every window of the plan.
    pub fn accumulate_all(&mut self) -> Result<()> {
        self.accumulate_range(0..self.plan.windows())
    }

    /// Process windows `range.start..range.end`; window `k` starts at `k * hop`.
    pub fn accumulate_range(&mut self, range: Range<usize>) -> Result<()> {
        let block_size = self.plan.block_size();
        for k in range {
            let offset = self.plan.offset(k);
            let source = &self.samples[offset..offset + block_size];
            let spectrum = match &self.coefficients {
                Some(coefficients) => {
                    for ((dst, &x), &w) in self.block.iter_mut().zip(source).zip(coefficients) {
                        *dst = x * w;
                    }
                    self.provider.transform(&self.block)?
                }
                None => self.provider.transform(source)?,
            };
            self.bins.add_spectrum(spectrum);
            self.progress.inc(1);
        }
        Ok(())
    }

    pub fn bins(&self) -> &BinAccumulator {
        &self.bins
    }

    pub fn into_bins(self) -> BinAccumulator {
        self.bins
    }
}

/// Single-threaded run over every window.
pub fn analyze_sequential<P: TransformProvider>(
    samples: &[f64],
    plan: WindowPlan,
    window: WindowFunction,
    provider: P,
    sample_rate: u32,
    progress: ProgressBar,
) -> Result<SpectrumResult> {
    let mut accumulator =
        WindowAccumulator::new(samples, plan, window, provider)?.with_progress(progress);
    accumulator.accumulate_all()?;
    accumulator.into_bins().into_spectrum(&plan, sample_rate)
}
