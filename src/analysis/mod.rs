//! Sliding-window magnitude spectrum and the strategies that compute it.
//!
//! All three strategies produce the same quantity: for every window the
//! block is weighted by the configured window function, transformed, and
//! the rooted magnitudes of bins `0..block_size/2` are summed. The sums are
//! averaged over the window count and converted to dB.

pub mod accumulator;
pub mod parallel;

use indicatif::ProgressBar;

use crate::audio::SampleBuffer;
use crate::config::{AnalyzerConfig, Strategy};
use crate::error::{AnalyzerError, Result};
use crate::gpu::GpuPipeline;

pub use accumulator::{analyze_sequential, to_db, BinAccumulator, WindowAccumulator};
pub use parallel::{Partition, ParallelScheduler};

/// Window geometry over a sample sequence of known length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowPlan {
    sample_count: usize,
    block_size: usize,
    hop: usize,
    windows: usize,
}

impl WindowPlan {
    /// Fails with `DegenerateInput` when not even one block fits.
    pub fn new(sample_count: usize, block_size: usize, hop: usize) -> Result<Self> {
        let hop = hop.max(1);
        let windows = if sample_count < block_size || block_size == 0 {
            0
        } else {
            (sample_count - block_size) / hop + 1
        };
        let plan = Self {
            sample_count,
            block_size,
            hop,
            windows,
        };
        if windows == 0 {
            return Err(plan.degenerate());
        }
        Ok(plan)
    }

    pub fn for_config(config: &AnalyzerConfig, sample_count: usize) -> Result<Self> {
        Self::new(sample_count, config.block_size(), config.hop())
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn hop(&self) -> usize {
        self.hop
    }

    /// Number of windows with `offset + block_size <= sample_count`.
    pub fn windows(&self) -> usize {
        self.windows
    }

    pub fn bins(&self) -> usize {
        self.block_size / 2
    }

    /// Start offset of window `k`.
    pub fn offset(&self, k: usize) -> usize {
        k * self.hop
    }

    pub(crate) fn degenerate(&self) -> AnalyzerError {
        AnalyzerError::DegenerateInput {
            samples: self.sample_count,
            block_size: self.block_size,
        }
    }
}

/// Averaged dB value per bin.
#[derive(Clone, Debug, PartialEq)]
pub struct SpectrumResult {
    db: Vec<f64>,
    block_size: usize,
    sample_rate: u32,
    windows: usize,
}

impl SpectrumResult {
    pub fn new(db: Vec<f64>, block_size: usize, sample_rate: u32, windows: usize) -> Self {
        Self {
            db,
            block_size,
            sample_rate,
            windows,
        }
    }

    pub fn db(&self) -> &[f64] {
        &self.db
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Windows averaged into this result.
    pub fn windows(&self) -> usize {
        self.windows
    }

    /// Centre frequency of `bin` in Hz: `bin * sample_rate / block_size`.
    pub fn frequency(&self, bin: usize) -> f64 {
        bin as f64 * self.sample_rate as f64 / self.block_size as f64
    }

    /// `(frequency, dB)` of every bin strictly above `threshold`.
    pub fn bins_above(&self, threshold: f64) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.db
            .iter()
            .enumerate()
            .filter(move |(_, db)| **db > threshold)
            .map(move |(i, &db)| (self.frequency(i), db))
    }

    /// Loudest bin, ignoring the DC bin when anything else is finite.
    pub fn peak_bin(&self) -> Option<usize> {
        let loudest = |skip: usize| {
            self.db
                .iter()
                .enumerate()
                .skip(skip)
                .filter(|(_, db)| db.is_finite())
                .max_by(|(_, a), (_, b)| a.total_cmp(b))
                .map(|(i, _)| i)
        };
        loudest(1).or_else(|| loudest(0))
    }
}

/// Run the configured strategy over `samples`.
pub fn run(
    config: &AnalyzerConfig,
    samples: &SampleBuffer,
    progress: ProgressBar,
) -> Result<SpectrumResult> {
    let plan = WindowPlan::for_config(config, samples.len())?;
    progress.set_length(plan.windows() as u64);

    log::info!(
        "Analyzing {} samples: block={}, hop={}, windows={}, strategy={:?}, window={:?}",
        plan.sample_count(),
        plan.block_size(),
        plan.hop(),
        plan.windows(),
        config.strategy(),
        config.window()
    );

    let result = match config.strategy() {
        Strategy::Sequential => analyze_sequential(
            samples.samples(),
            plan,
            config.window(),
            config.backend().create(plan.block_size()),
            config.sample_rate(),
            progress.clone(),
        )?,
        Strategy::Threaded => {
            let scheduler =
                ParallelScheduler::new(config.workers(), config.backend(), config.window());
            scheduler
                .run(samples.samples(), plan, progress.clone())?
                .into_spectrum(&plan, config.sample_rate())?
        }
        Strategy::Gpu => {
            let mut pipeline = GpuPipeline::new(plan.block_size(), config.window())?;
            pipeline.analyze(samples.samples(), plan, config.sample_rate(), &progress)?
        }
    };

    progress.finish_and_clear();
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_count_matches_loop_condition() {
        assert_eq!(WindowPlan::new(64, 64, 1).unwrap().windows(), 1);
        assert_eq!(WindowPlan::new(65, 64, 1).unwrap().windows(), 2);
        assert_eq!(WindowPlan::new(1000, 512, 256).unwrap().windows(), 2);
        assert_eq!(WindowPlan::new(1024, 512, 256).unwrap().windows(), 3);
    }

    #[test]
    fn frequency_axis() {
        let result = SpectrumResult::new(vec![0.0; 256], 512, 44_100, 1);
        assert_eq!(result.frequency(0), 0.0);
        assert!((result.frequency(1) - 86.1328125).abs() < 1e-9);
        assert!((result.frequency(256) - 22_050.0).abs() < 1e-9);
    }

    #[test]
    fn threshold_is_strict() {
        let result = SpectrumResult::new(vec![-10.0, 5.0, 5.5, f64::NEG_INFINITY], 8, 8, 1);
        let above: Vec<_> = result.bins_above(5.0).collect();
        assert_eq!(above, vec![(2.0, 5.5)]);
    }

    #[test]
    fn peak_skips_dc_and_silence() {
        let result = SpectrumResult::new(vec![40.0, 3.0, 12.0, f64::NEG_INFINITY], 8, 8, 1);
        assert_eq!(result.peak_bin(), Some(2));

        let silent = SpectrumResult::new(vec![f64::NEG_INFINITY; 4], 8, 8, 1);
        assert_eq!(silent.peak_bin(), None);
    }

    #[test]
    fn run_rejects_short_input() {
        let config = AnalyzerConfig::new("unused", 512, 256, 0.0);
        let samples = SampleBuffer::from_samples(vec![0.0; 100]);
        let err = run(&config, &samples, ProgressBar::hidden()).unwrap_err();
        assert!(matches!(
            err,
            AnalyzerError::DegenerateInput { samples: 100, block_size: 512 }
        ));
    }
}
