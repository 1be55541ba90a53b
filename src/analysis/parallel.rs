use indicatif::ProgressBar;
use rayon::prelude::*;
use std::ops::Range;

use super::{BinAccumulator, WindowAccumulator, WindowPlan};
use crate::error::{AnalyzerError, Result};
use crate::transform::window::WindowFunction;
use crate::transform::TransformBackend;

/// A contiguous run of window starts handled by one worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Partition {
    pub index: usize,
    pub windows: Range<usize>,
}

impl Partition {
    /// Start offsets owned by this partition, `[first * hop, end * hop)`.
    /// The last window read may extend past `end * hop`.
    pub fn offsets(&self, plan: &WindowPlan) -> Range<usize> {
        plan.offset(self.windows.start)..plan.offset(self.windows.end)
    }
}

/// Split the window starts of `plan` into at most `workers` contiguous,
/// non-overlapping partitions of near-equal size.
pub fn partition(plan: &WindowPlan, workers: usize) -> Vec<Partition> {
    let total = plan.windows();
    let count = workers.clamp(1, total.max(1));
    let base = total / count;
    let extra = total % count;

    let mut start = 0;
    (0..count)
        .map(|index| {
            let len = base + usize::from(index < extra);
            let windows = start..start + len;
            start += len;
            Partition { index, windows }
        })
        .collect()
}

/// Runs one [`WindowAccumulator`] per partition on a pool built for this
/// run, then merges the partial sums in partition order.
pub struct ParallelScheduler {
    workers: usize,
    backend: TransformBackend,
    window: WindowFunction,
}

impl ParallelScheduler {
    pub fn new(workers: usize, backend: TransformBackend, window: WindowFunction) -> Self {
        Self {
            workers: workers.max(1),
            backend,
            window,
        }
    }

    pub fn run(
        &self,
        samples: &[f64],
        plan: WindowPlan,
        progress: ProgressBar,
    ) -> Result<BinAccumulator> {
        let partitions = partition(&plan, self.workers);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(partitions.len())
            .thread_name(|i| format!("specan-worker-{}", i))
            .build()
            .map_err(|e| AnalyzerError::WorkerPool(e.to_string()))?;

        log::info!(
            "Threaded run: {} workers over {} windows",
            partitions.len(),
            plan.windows()
        );
        for p in &partitions {
            log::debug!(
                "Partition {}: windows {:?}, offsets {:?}",
                p.index,
                p.windows,
                p.offsets(&plan)
            );
        }

        // Each worker owns its accumulator; nothing is shared until the merge.
        let partials: Vec<BinAccumulator> = pool.install(|| {
            partitions
                .par_iter()
                .map(|p| -> Result<BinAccumulator> {
                    let provider = self.backend.create(plan.block_size());
                    let mut accumulator =
                        WindowAccumulator::new(samples, plan, self.window, provider)?
                            .with_progress(progress.clone());
                    accumulator.accumulate_range(p.windows.clone())?;
                    Ok(accumulator.into_bins())
                })
                .collect::<Result<Vec<_>>>()
        })?;

        let mut merged = BinAccumulator::new(plan.bins());
        for partial in &partials {
            merged.merge(partial);
        }
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze_sequential;
    use crate::transform::RealFftTransform;
    use std::f64::consts::PI;

    fn signal(len: usize) -> Vec<f64> {
        (0..len)
            .map(|n| {
                let t = n as f64 / 44_100.0;
                0.6 * (2.0 * PI * 440.0 * t).sin() + 0.3 * (2.0 * PI * 6_000.0 * t).sin()
            })
            .collect()
    }

    #[test]
    fn partitions_cover_every_window_once() {
        let plan = WindowPlan::new(100_000, 512, 100).unwrap();
        for workers in [1, 2, 3, 7, 16] {
            let parts = partition(&plan, workers);
            assert_eq!(parts.len(), workers);
            assert_eq!(parts[0].windows.start, 0);
            assert_eq!(parts.last().unwrap().windows.end, plan.windows());
            for pair in parts.windows(2) {
                assert_eq!(pair[0].windows.end, pair[1].windows.start);
            }
            let sizes: Vec<usize> = parts.iter().map(|p| p.windows.len()).collect();
            let (min, max) = (sizes.iter().min().unwrap(), sizes.iter().max().unwrap());
            assert!(max - min <= 1);
        }
    }

    #[test]
    fn more_workers_than_windows() {
        let plan = WindowPlan::new(1024, 512, 512).unwrap();
        let parts = partition(&plan, 8);
        assert_eq!(parts.len(), 2);
        assert!(parts.iter().all(|p| p.windows.len() == 1));
    }

    #[test]
    fn partition_offsets_follow_hop() {
        let plan = WindowPlan::new(10_000, 256, 128).unwrap();
        let parts = partition(&plan, 2);
        assert_eq!(parts[0].offsets(&plan).start, 0);
        assert_eq!(parts[0].offsets(&plan).end, parts[1].offsets(&plan).start);
        assert_eq!(parts[1].offsets(&plan).end, plan.windows() * 128);
    }

    #[test]
    fn threaded_equals_sequential() {
        let samples = signal(44_100);
        let plan = WindowPlan::new(samples.len(), 512, 200).unwrap();

        let sequential = analyze_sequential(
            &samples,
            plan,
            WindowFunction::Rectangular,
            RealFftTransform::new(512),
            44_100,
            ProgressBar::hidden(),
        )
        .unwrap();

        for workers in [1, 2, 3, 4, 8] {
            let threaded = ParallelScheduler::new(
                workers,
                TransformBackend::RealFft,
                WindowFunction::Rectangular,
            )
            .run(&samples, plan, ProgressBar::hidden())
            .unwrap();
            assert_eq!(threaded.windows(), plan.windows());
            let threaded = threaded.into_spectrum(&plan, 44_100).unwrap();
            assert_eq!(sequential, threaded, "{} workers", workers);
        }
    }

    #[test]
    fn single_worker_is_bit_identical_to_sequential() {
        let samples = signal(20_000);
        let plan = WindowPlan::new(samples.len(), 256, 64).unwrap();
        let sequential = analyze_sequential(
            &samples,
            plan,
            WindowFunction::Hann,
            RealFftTransform::new(256),
            44_100,
            ProgressBar::hidden(),
        )
        .unwrap();
        let threaded = ParallelScheduler::new(1, TransformBackend::RealFft, WindowFunction::Hann)
            .run(&samples, plan, ProgressBar::hidden())
            .unwrap()
            .into_spectrum(&plan, 44_100)
            .unwrap();
        assert_eq!(sequential, threaded);
    }

    #[test]
    fn repeated_runs_are_bit_identical() {
        let samples = signal(30_000);
        let plan = WindowPlan::new(samples.len(), 512, 128).unwrap();
        let scheduler =
            ParallelScheduler::new(4, TransformBackend::RustFft, WindowFunction::Rectangular);
        let first = scheduler.run(&samples, plan, ProgressBar::hidden()).unwrap();
        for _ in 0..5 {
            assert_eq!(scheduler.run(&samples, plan, ProgressBar::hidden()).unwrap(), first);
        }
    }

    #[test]
    fn exact_multiple_split_is_bit_equal_to_sequential() {
        // 4 workers, sample count a multiple of 4, block well inside each partition
        let samples = signal(4 * 8_192);
        let plan = WindowPlan::new(samples.len(), 512, 128).unwrap();
        let sequential = analyze_sequential(
            &samples,
            plan,
            WindowFunction::Rectangular,
            RealFftTransform::new(512),
            44_100,
            ProgressBar::hidden(),
        )
        .unwrap();
        let threaded =
            ParallelScheduler::new(4, TransformBackend::RealFft, WindowFunction::Rectangular)
                .run(&samples, plan, ProgressBar::hidden())
                .unwrap()
                .into_spectrum(&plan, 44_100)
                .unwrap();
        assert_eq!(threaded.windows(), sequential.windows());
        assert_eq!(threaded.db(), sequential.db());
    }
}
