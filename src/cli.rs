use clap::Parser;
use std::path::PathBuf;

use crate::config::Strategy;
use crate::transform::window::WindowFunction;
use crate::transform::TransformBackend;

#[derive(Parser, Debug)]
#[command(
    name = "analyzer",
    about = "Averaged magnitude spectrum of a raw 16-bit stereo PCM file",
    allow_negative_numbers = true
)]
pub struct Cli {
    /// Raw interleaved 16-bit little-endian stereo PCM, no header
    pub path: PathBuf,

    /// Samples per window (clamped to 64..=512)
    pub block_size: i64,

    /// Samples between window starts (clamped to 1..=block size)
    pub shift: i64,

    /// Report bins louder than this many dB
    pub threshold: f64,

    /// Execution strategy [default: sequential]
    #[arg(long, value_enum)]
    pub strategy: Option<Strategy>,

    /// FFT library for the CPU strategies [default: realfft]
    #[arg(long, value_enum)]
    pub backend: Option<TransformBackend>,

    /// Window function applied to each block [default: rectangular]
    #[arg(long, value_enum)]
    pub window: Option<WindowFunction>,

    /// Worker threads for the threaded strategy (0 = one per core)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Sample rate of the input in Hz [default: 44100]
    #[arg(long)]
    pub sample_rate: Option<u32>,

    /// Path to config file (default: ./specan.toml or ~/.config/specan/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Show a progress bar over windows on stderr
    #[arg(long)]
    pub progress: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positionals_and_options() {
        let cli = Cli::try_parse_from([
            "analyzer",
            "in.raw",
            "512",
            "256",
            "-12.5",
            "--strategy",
            "threaded",
            "--window",
            "hann",
            "--workers",
            "4",
        ])
        .unwrap();
        assert_eq!(cli.path, PathBuf::from("in.raw"));
        assert_eq!(cli.block_size, 512);
        assert_eq!(cli.shift, 256);
        assert_eq!(cli.threshold, -12.5);
        assert_eq!(cli.strategy, Some(Strategy::Threaded));
        assert_eq!(cli.window, Some(WindowFunction::Hann));
        assert_eq!(cli.workers, Some(4));
        assert_eq!(cli.backend, None);
        assert!(!cli.progress);
    }

    #[test]
    fn negative_sizes_reach_the_clamp() {
        let cli = Cli::try_parse_from(["analyzer", "in.raw", "-1", "0", "3"]).unwrap();
        assert_eq!(cli.block_size, -1);
        assert_eq!(cli.shift, 0);
    }

    #[test]
    fn missing_arguments_are_rejected() {
        assert!(Cli::try_parse_from(["analyzer", "in.raw", "512"]).is_err());
        assert!(Cli::try_parse_from(["analyzer", "in.raw", "abc", "1", "0"]).is_err());
        let unknown_backend = ["analyzer", "in.raw", "512", "256", "0", "--backend", "fftw"];
        assert!(Cli::try_parse_from(unknown_backend).is_err());
    }
}
