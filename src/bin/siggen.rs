use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use specan::audio::generator::{self, SignalSpec, Waveform};
use specan::config::DEFAULT_SAMPLE_RATE;

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    /// Mono 16-bit WAV
    Wav,
    /// Headerless interleaved stereo 16-bit PCM, readable by `analyzer`
    Raw,
}

#[derive(Parser, Debug)]
#[command(name = "siggen", about = "Write deterministic test signals for the analyzer")]
struct Cli {
    /// Output file
    output: PathBuf,

    /// Signal family
    #[arg(short, long, value_enum, default_value_t = Waveform::Sine)]
    waveform: Waveform,

    /// Fundamental or carrier frequency in Hz
    #[arg(short, long, default_value_t = 1000.0)]
    frequency: f64,

    /// Length in seconds
    #[arg(short, long, default_value_t = 1.0)]
    duration: f64,

    /// Peak amplitude (0.0-1.0)
    #[arg(short, long, default_value_t = 0.8)]
    amplitude: f64,

    #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE)]
    sample_rate: u32,

    /// Output container
    #[arg(long, value_enum, default_value_t = OutputFormat::Raw)]
    format: OutputFormat,

    /// Seed for the white-noise generator
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    if !(cli.duration > 0.0) {
        anyhow::bail!("Duration must be positive, got {}", cli.duration);
    }

    let spec = SignalSpec {
        amplitude: cli.amplitude.clamp(0.0, 1.0),
        seed: cli.seed,
        ..SignalSpec::new(cli.waveform, cli.frequency, cli.duration, cli.sample_rate.max(1))
    };
    let samples = generator::generate(&spec);

    match cli.format {
        OutputFormat::Wav => generator::write_wav(&cli.output, &samples, spec.sample_rate),
        OutputFormat::Raw => generator::write_raw_stereo(&cli.output, &samples),
    }
    .with_context(|| format!("Failed to write {}", cli.output.display()))?;

    log::info!(
        "Wrote {} samples of {:?} at {} Hz to {}",
        samples.len(),
        spec.waveform,
        spec.sample_rate,
        cli.output.display()
    );
    Ok(())
}
