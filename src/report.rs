use std::io::Write;
use std::time::Duration;

use crate::analysis::SpectrumResult;

/// Prints the bins of a [`SpectrumResult`] louder than a threshold,
/// followed by the run time.
///
/// ```text
/// 1033.59Hz 42.117650
///
/// Execution time: 0.012345 seconds
/// ```
pub struct ReportFormatter {
    threshold: f64,
}

impl ReportFormatter {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// One `<frequency>Hz <dB>` line per bin strictly above the threshold.
    pub fn write_bins(
        &self,
        result: &SpectrumResult,
        out: &mut impl Write,
    ) -> std::io::Result<usize> {
        let mut written = 0;
        for (frequency, db) in result.bins_above(self.threshold) {
            writeln!(out, "{:.2}Hz {:.6}", frequency, db)?;
            written += 1;
        }
        Ok(written)
    }

    pub fn write(
        &self,
        result: &SpectrumResult,
        elapsed: Duration,
        out: &mut impl Write,
    ) -> std::io::Result<()> {
        let written = self.write_bins(result, out)?;
        log::debug!("{} of {} bins above {} dB", written, result.db().len(), self.threshold);
        writeln!(out)?;
        writeln!(out, "Execution time: {:.6} seconds", elapsed.as_secs_f64())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{analyze_sequential, WindowPlan};
    use crate::audio::generator::{generate, to_stereo_pcm, SignalSpec, Waveform};
    use crate::audio::SampleBuffer;
    use crate::transform::window::WindowFunction;
    use crate::transform::RealFftTransform;
    use indicatif::ProgressBar;

    fn render(formatter: &ReportFormatter, result: &SpectrumResult) -> String {
        let mut out = Vec::new();
        formatter
            .write(result, Duration::from_millis(1500), &mut out)
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn layout_has_blank_line_and_timing() {
        let result = SpectrumResult::new(vec![-3.0, 12.5, 0.25, 7.0], 8, 8, 1);
        let text = render(&ReportFormatter::new(0.0), &result);
        assert_eq!(
            text,
            concat!(
                "1.00Hz 12.500000\n",
                "2.00Hz 0.250000\n",
                "3.00Hz 7.000000\n",
                "\n",
                "Execution time: 1.500000 seconds\n",
            )
        );
    }

    #[test]
    fn silence_reports_no_bins() {
        let result = SpectrumResult::new(vec![f64::NEG_INFINITY; 256], 512, 44_100, 10);
        let text = render(&ReportFormatter::new(-200.0), &result);
        assert!(text.starts_with("\nExecution time: "));
    }

    #[test]
    fn sine_reports_only_bins_near_its_frequency() {
        let mut spec = SignalSpec::new(Waveform::Sine, 1_000.0, 1.0, 44_100);
        spec.amplitude = 0.8;
        let pcm = to_stereo_pcm(&generate(&spec));
        let samples = SampleBuffer::from_pcm_bytes(&pcm);

        let plan = WindowPlan::new(samples.len(), 512, 256).unwrap();
        let result = analyze_sequential(
            samples.samples(),
            plan,
            WindowFunction::Hann,
            RealFftTransform::new(512),
            44_100,
            ProgressBar::hidden(),
        )
        .unwrap();

        let bin_width: f64 = 44_100.0 / 512.0;
        let nearest = (1_000.0 / bin_width).round() as usize;
        let peak = result.peak_bin().unwrap();
        assert_eq!(peak, nearest);

        let formatter = ReportFormatter::new(result.db()[peak] - 25.0);
        let mut out = Vec::new();
        formatter.write_bins(&result, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        let reported: Vec<f64> = text
            .lines()
            .map(|line| line.split("Hz").next().unwrap().parse().unwrap())
            .collect();
        assert!(reported.contains(&format!("{:.2}", result.frequency(nearest)).parse().unwrap()));
        for f in reported {
            assert!((f - 1_000.0).abs() <= 2.5 * bin_width, "unexpected bin at {} Hz", f);
        }
    }
}
