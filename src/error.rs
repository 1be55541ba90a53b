use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = AnalyzerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{operation} failed: {message}")]
    Device {
        operation: &'static str,
        message: String,
    },

    /// Fewer samples than a single window; averaging would divide by zero.
    #[error("input has {samples} samples, fewer than one block of {block_size}")]
    DegenerateInput { samples: usize, block_size: usize },

    #[error("worker pool failed: {0}")]
    WorkerPool(String),

    #[error("transform failed: {0}")]
    Transform(String),

    #[error("wav output failed: {0}")]
    Wav(#[from] hound::Error),
}

impl AnalyzerError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn device(operation: &'static str, message: impl ToString) -> Self {
        Self::Device {
            operation,
            message: message.to_string(),
        }
    }
}
