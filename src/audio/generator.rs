//! Deterministic test signals for fixtures.
//!
//! Signals are written either as mono 16-bit WAV or as headerless
//! interleaved stereo PCM (left = right) that [`SampleBuffer`] reads back.
//!
//! [`SampleBuffer`]: super::SampleBuffer

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use std::io::Write;
use std::path::Path;

use crate::error::{AnalyzerError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Waveform {
    Sine,
    Sawtooth,
    Square,
    Triangle,
    /// Linear sweep from 20 Hz to 20 kHz over the signal duration.
    Chirp,
    /// Carrier at `frequency`, 100 Hz modulator.
    Am,
    /// Carrier at `frequency`, 100 Hz modulator, index 5.
    Fm,
    WhiteNoise,
    /// Fundamental plus three overtones at 1/2, 0.3 and 0.2 amplitude.
    Harmonics,
    ExponentialDecay,
    /// 10% duty cycle.
    PulseTrain,
    /// Centered at t = 0.5 s.
    Sinc,
}

#[derive(Clone, Debug)]
pub struct SignalSpec {
    pub waveform: Waveform,
    pub frequency: f64,
    pub duration: f64,
    pub sample_rate: u32,
    pub amplitude: f64,
    pub seed: u64,
}

impl SignalSpec {
    pub fn new(waveform: Waveform, frequency: f64, duration: f64, sample_rate: u32) -> Self {
        Self {
            waveform,
            frequency,
            duration,
            sample_rate,
            amplitude: 1.0,
            seed: 0,
        }
    }

    pub fn sample_count(&self) -> usize {
        (self.duration * self.sample_rate as f64).max(0.0) as usize
    }
}

/// Render `spec` to samples in [-amplitude, amplitude].
pub fn generate(spec: &SignalSpec) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(spec.seed);
    let sr = spec.sample_rate as f64;
    (0..spec.sample_count())
        .map(|i| {
            let t = i as f64 / sr;
            spec.amplitude * evaluate(spec, t, &mut rng)
        })
        .collect()
}

fn evaluate(spec: &SignalSpec, t: f64, rng: &mut StdRng) -> f64 {
    let f = spec.frequency;
    let sine = |freq: f64| (2.0 * PI * freq * t).sin();
    match spec.waveform {
        Waveform::Sine => sine(f),
        Waveform::Sawtooth => 2.0 * (t * f - (0.5 + t * f).floor()),
        Waveform::Square => {
            if sine(f) >= 0.0 {
                1.0
            } else {
                -1.0
            }
        }
        Waveform::Triangle => 2.0 * (2.0 * (t * f - (0.5 + t * f).floor())).abs() - 1.0,
        Waveform::Chirp => {
            let (f0, f1) = (20.0, 20_000.0);
            let sweep = spec.duration.max(f64::EPSILON);
            (2.0 * PI * (f0 * t + (f1 - f0) / (2.0 * sweep) * t * t)).sin()
        }
        Waveform::Am => sine(f) * 0.5 * (1.0 + sine(100.0)),
        Waveform::Fm => (2.0 * PI * f * t + 5.0 * sine(100.0)).sin(),
        Waveform::WhiteNoise => rng.gen_range(-1.0..=1.0),
        Waveform::Harmonics => {
            // peak sum is 2.0; keep it in range
            (sine(f) + 0.5 * sine(2.0 * f) + 0.3 * sine(3.0 * f) + 0.2 * sine(4.0 * f)) / 2.0
        }
        Waveform::ExponentialDecay => sine(f) * (-5.0 * t).exp(),
        Waveform::PulseTrain => {
            if t * f - (t * f).floor() < 0.1 {
                1.0
            } else {
                0.0
            }
        }
        Waveform::Sinc => {
            let x = PI * f * (t - 0.5);
            if x.abs() < 1e-12 {
                1.0
            } else {
                x.sin() / x
            }
        }
    }
}

fn to_i16(sample: f64) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0) as i16
}

/// Interleaved stereo 16-bit little-endian PCM, the same signal on both channels.
pub fn to_stereo_pcm(samples: &[f64]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 4);
    for &s in samples {
        let v = to_i16(s).to_le_bytes();
        bytes.extend_from_slice(&v);
        bytes.extend_from_slice(&v);
    }
    bytes
}

pub fn write_raw_stereo(path: &Path, samples: &[f64]) -> Result<()> {
    let mut file = std::fs::File::create(path).map_err(|e| AnalyzerError::io(path, e))?;
    file.write_all(&to_stereo_pcm(samples))
        .map_err(|e| AnalyzerError::io(path, e))?;
    Ok(())
}

pub fn write_wav(path: &Path, samples: &[f64], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &s in samples {
        writer.write_sample(to_i16(s))?;
    }
    writer.finalize()?;
    Ok(())
}
