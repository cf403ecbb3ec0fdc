use fftwrap::bench::{magnitudes, signal};
use fftwrap::{ComplexBuffer, Library, Options, Plan, RealBuffer};
use std::sync::Arc;

fn write_tone(path: &std::path::Path, sample_rate: u32, frequency: f64, len: usize) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..len {
        let t = i as f64 / sample_rate as f64;
        let sample = (2.0 * std::f64::consts::PI * frequency * t).sin() * 0.5;
        writer.write_sample((sample * i16::MAX as f64) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

fn main() {
    let path = match std::env::args().nth(1) {
        Some(path) => std::path::PathBuf::from(path),
        None => {
            let path = std::env::temp_dir().join("fftwrap-tone.wav");
            write_tone(&path, 8000, 1000.0, 4096);
            path
        }
    };
    let mut samples = signal::load_wav(&path).unwrap();
    if samples.is_empty() {
        println!("{}: no samples", path.display());
        return;
    }
    // Largest power of two that fits.
    let n = 1 << (usize::BITS - 1 - samples.len().leading_zeros());
    samples.truncate(n);
    signal::hamming(&mut samples);

    let library = Library::<f64>::load().unwrap();
    let input = Arc::new(RealBuffer::new(&library, n).unwrap());
    let output = Arc::new(ComplexBuffer::new(&library, n / 2 + 1).unwrap());
    let mut plan = Plan::r2c_1d(n, &input, &output, Options::ESTIMATE).unwrap();
    input.set(&samples).unwrap();
    plan.execute();

    let mut bins: Vec<(usize, f64)> = magnitudes(&output.to_complex_vec())
        .into_iter()
        .enumerate()
        .collect();
    bins.sort_by(|a, b| b.1.total_cmp(&a.1));
    println!("{}: {} samples on the {} engine", path.display(), n, library.name());
    for (bin, magnitude) in bins.iter().take(5) {
        println!("  bin {:5}: {:10.3}", bin, magnitude);
    }
}
