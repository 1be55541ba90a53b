use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::transform::window::WindowFunction;
use crate::transform::TransformBackend;

pub const MIN_BLOCK_SIZE: usize = 64;
pub const MAX_BLOCK_SIZE: usize = 512;
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Which execution strategy computes the spectrum.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Sequential,
    Threaded,
    Gpu,
}

/// Settings for one analysis run. Requested block size and hop are clamped
/// on construction and the value is read-only afterwards.
#[derive(Clone, Debug)]
pub struct AnalyzerConfig {
    source_path: PathBuf,
    block_size: usize,
    hop: usize,
    threshold: f64,
    sample_rate: u32,
    window: WindowFunction,
    strategy: Strategy,
    backend: TransformBackend,
    workers: Option<usize>,
}

impl AnalyzerConfig {
    pub fn new(source_path: impl Into<PathBuf>, block_size: i64, hop: i64, threshold: f64) -> Self {
        let block_size = block_size.clamp(MIN_BLOCK_SIZE as i64, MAX_BLOCK_SIZE as i64) as usize;
        let hop = hop.clamp(1, block_size as i64) as usize;
        Self {
            source_path: source_path.into(),
            block_size,
            hop,
            threshold,
            sample_rate: DEFAULT_SAMPLE_RATE,
            window: WindowFunction::default(),
            strategy: Strategy::default(),
            backend: TransformBackend::default(),
            workers: None,
        }
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate.max(1);
        self
    }

    pub fn with_window(mut self, window: WindowFunction) -> Self {
        self.window = window;
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_backend(mut self, backend: TransformBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Zero means "one per logical processing unit".
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = (workers > 0).then_some(workers);
        self
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn hop(&self) -> usize {
        self.hop
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn window(&self) -> WindowFunction {
        self.window
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn backend(&self) -> TransformBackend {
        self.backend
    }

    /// Number of bins reported: `block_size / 2`.
    pub fn bin_count(&self) -> usize {
        self.block_size / 2
    }

    /// Worker count for the threaded strategy.
    pub fn workers(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

/// Optional defaults read from `specan.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub analysis: AnalysisDefaults,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisDefaults {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default)]
    pub strategy: Strategy,
    #[serde(default)]
    pub backend: TransformBackend,
    #[serde(default)]
    pub window: WindowFunction,
    #[serde(default)]
    pub workers: usize,
}

impl Default for AnalysisDefaults {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            strategy: Strategy::default(),
            backend: TransformBackend::default(),
            window: WindowFunction::default(),
            workers: 0,
        }
    }
}

fn default_sample_rate() -> u32 { DEFAULT_SAMPLE_RATE }

pub fn load_config(path: &Path) -> Option<FileConfig> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(cfg) => Some(cfg),
        Err(err) => {
            log::warn!("Ignoring malformed config {}: {}", path.display(), err);
            None
        }
    }
}

/// Explicit path first, then `./specan.toml`, then the user config dirs.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("specan.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("specan").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("specan").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}
