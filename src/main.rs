use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Instant;

use specan::analysis;
use specan::audio::SampleBuffer;
use specan::cli::Cli;
use specan::config::{self, AnalysisDefaults, AnalyzerConfig};
use specan::report::ReportFormatter;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    // Config file values apply only where the CLI left an option unset
    let mut defaults = AnalysisDefaults::default();
    if let Some(path) = config::find_config(cli.config.as_deref()) {
        match config::load_config(&path) {
            Some(cfg) => {
                log::info!("Loaded config from {}", path.display());
                defaults = cfg.analysis;
            }
            None => log::warn!("Failed to load config from {}", path.display()),
        }
    }

    let config = AnalyzerConfig::new(&cli.path, cli.block_size, cli.shift, cli.threshold)
        .with_sample_rate(cli.sample_rate.unwrap_or(defaults.sample_rate))
        .with_strategy(cli.strategy.unwrap_or(defaults.strategy))
        .with_backend(cli.backend.unwrap_or(defaults.backend))
        .with_window(cli.window.unwrap_or(defaults.window))
        .with_workers(cli.workers.unwrap_or(defaults.workers));

    if config.block_size() as i64 != cli.block_size || config.hop() as i64 != cli.shift {
        log::warn!(
            "Clamped block size {} -> {}, shift {} -> {}",
            cli.block_size,
            config.block_size(),
            cli.shift,
            config.hop()
        );
    }

    let progress = if cli.progress {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} windows ({eta} remaining)",
                )?
                .progress_chars("=>-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let start = Instant::now();
    let samples = SampleBuffer::load(config.source_path())
        .with_context(|| format!("Failed to load {}", config.source_path().display()))?;
    let result = analysis::run(&config, &samples, progress).context("Analysis failed")?;
    let elapsed = start.elapsed();

    let formatter = ReportFormatter::new(config.threshold());
    let stdout = std::io::stdout();
    formatter
        .write(&result, elapsed, &mut stdout.lock())
        .context("Failed to write report")?;

    Ok(())
}
