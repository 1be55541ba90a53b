use std::path::Path;

use crate::error::{AnalyzerError, Result};

/// Bytes per interleaved stereo frame of 16-bit PCM.
const FRAME_BYTES: usize = 4;
const PCM_SCALE: f64 = 32768.0;

/// Left-channel samples of a raw stereo PCM stream, normalized to [-1, 1).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleBuffer {
    samples: Vec<f64>,
}

impl SampleBuffer {
    /// Read a headerless 16-bit little-endian stereo PCM file.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| AnalyzerError::io(path, e))?;
        let buffer = Self::from_pcm_bytes(&bytes);

        log::info!(
            "Loaded {}: {} bytes, {} left-channel samples",
            path.display(),
            bytes.len(),
            buffer.len()
        );
        if bytes.len() % FRAME_BYTES != 0 {
            log::debug!("Dropped {} trailing bytes", bytes.len() % FRAME_BYTES);
        }

        Ok(buffer)
    }

    /// Keep the even-indexed (left) sample of each frame; a trailing partial
    /// frame is dropped.
    pub fn from_pcm_bytes(bytes: &[u8]) -> Self {
        let samples = bytes
            .chunks_exact(FRAME_BYTES)
            .map(|frame| i16::from_le_bytes([frame[0], frame[1]]) as f64 / PCM_SCALE)
            .collect();
        Self { samples }
    }

    pub fn from_samples(samples: Vec<f64>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(left: i16, right: i16) -> [u8; 4] {
        let l = left.to_le_bytes();
        let r = right.to_le_bytes();
        [l[0], l[1], r[0], r[1]]
    }

    #[test]
    fn keeps_left_channel_only() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&frame(16384, -1));
        bytes.extend_from_slice(&frame(-32768, 32767));
        bytes.extend_from_slice(&frame(0, 123));

        let buffer = SampleBuffer::from_pcm_bytes(&bytes);
        assert_eq!(buffer.samples(), &[0.5, -1.0, 0.0]);
    }

    #[test]
    fn drops_trailing_partial_frame() {
        let mut bytes = frame(100, 200).to_vec();
        bytes.extend_from_slice(&[1, 2, 3]);
        let buffer = SampleBuffer::from_pcm_bytes(&bytes);
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.samples()[0], 100.0 / 32768.0);
    }

    #[test]
    fn normalized_range() {
        let mut bytes = Vec::new();
        for v in [i16::MIN, -1, 0, 1, i16::MAX] {
            bytes.extend_from_slice(&frame(v, 0));
        }
        let buffer = SampleBuffer::from_pcm_bytes(&bytes);
        assert!(buffer.samples().iter().all(|&s| (-1.0..1.0).contains(&s)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let path = std::env::temp_dir().join("specan-does-not-exist.pcm");
        match SampleBuffer::load(&path) {
            Err(AnalyzerError::Io { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected Io error, got {:?}", other),
        }
    }

    #[test]
    fn loads_file_from_disk() {
        let path = std::env::temp_dir().join(format!("specan-source-{}.pcm", std::process::id()));
        let mut bytes = Vec::new();
        for v in [1000i16, 2000, 3000] {
            bytes.extend_from_slice(&frame(v, -v));
        }
        std::fs::write(&path, &bytes).unwrap();

        let buffer = SampleBuffer::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.samples()[2], 3000.0 / 32768.0);
    }
}
