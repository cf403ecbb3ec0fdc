//! Test signals.

use std::f64::consts::PI;
use std::path::Path;

const SAMPLING_RATE: f64 = 64.0;
const PERIOD: usize = 32;
const AMPLITUDE: f64 = 20.0;

fn sinusoid(size: usize, frequency: f64, amplitude: f64) -> impl Iterator<Item = f64> {
    (0..size).map(move |i| amplitude * (2.0 * PI * frequency * i as f64 / SAMPLING_RATE).sin())
}

/// 1 Hz sine, amplitude 20, sampled at 64 Hz.
pub fn sine(size: usize) -> Vec<f64> {
    sinusoid(size, 1.0, 20.0).collect()
}

/// `sine` plus a 2 Hz component of amplitude 10.
pub fn sine2(size: usize) -> Vec<f64> {
    sinusoid(size, 1.0, 20.0)
        .zip(sinusoid(size, 2.0, 10.0))
        .map(|(a, b)| a + b)
        .collect()
}

/// `sine2` plus a 4 Hz component of amplitude 5.
pub fn sine3(size: usize) -> Vec<f64> {
    sinusoid(size, 1.0, 20.0)
        .zip(sinusoid(size, 2.0, 10.0))
        .zip(sinusoid(size, 4.0, 5.0))
        .map(|((a, b), c)| a + b + c)
        .collect()
}

pub fn square(size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| {
            if i % (2 * PERIOD) < PERIOD {
                AMPLITUDE
            } else {
                -AMPLITUDE
            }
        })
        .collect()
}

pub fn sawtooth(size: usize) -> Vec<f64> {
    let step = 2.0 * AMPLITUDE / PERIOD as f64;
    (0..size)
        .map(|i| -AMPLITUDE + step * (i % PERIOD) as f64)
        .collect()
}

pub fn triangle(size: usize) -> Vec<f64> {
    let step = 2.0 * AMPLITUDE / PERIOD as f64;
    (0..size)
        .map(|i| {
            let phase = i % (2 * PERIOD);
            if phase < PERIOD {
                -AMPLITUDE + step * phase as f64
            } else {
                AMPLITUDE - step * (phase - PERIOD) as f64
            }
        })
        .collect()
}

/// Multiplies `signal` by a Hamming window in place.
pub fn hamming(signal: &mut [f64]) {
    let n = signal.len();
    if n < 2 {
        return;
    }
    let denom = (n - 1) as f64;
    for (i, s) in signal.iter_mut().enumerate() {
        *s *= 0.54 - 0.46 * (2.0 * PI * i as f64 / denom).cos();
    }
}

/// `i % 50`, the round-trip test pattern.
pub fn ramp(size: usize) -> Vec<f64> {
    (0..size).map(|i| (i % 50) as f64).collect()
}

/// First channel of a WAV file, normalized to [-1, 1].
pub fn load_wav(path: &Path) -> Result<Vec<f64>, hound::Error> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let samples: Vec<f64> = if spec.sample_format == hound::SampleFormat::Float {
        reader
            .samples::<f32>()
            .map(|s| s.map(f64::from))
            .collect::<Result<_, _>>()?
    } else {
        let max_val = 2.0f64.powi(spec.bits_per_sample as i32 - 1);
        reader
            .samples::<i32>()
            .map(|s| s.map(|x| x as f64 / max_val))
            .collect::<Result<_, _>>()?
    };

    Ok(samples.into_iter().step_by(channels).collect())
}
