use fftwrap::bench::signal;
use fftwrap::{ComplexBuffer, Dispose, Library, Options, Plan, RealBuffer};
use std::sync::Arc;

fn main() {
    let library = Library::<f64>::load().unwrap();
    let n = 8192;
    let data = signal::ramp(n);

    let real = Arc::new(RealBuffer::new(&library, n).unwrap());
    let spectrum = Arc::new(ComplexBuffer::new(&library, n / 2 + 1).unwrap());
    let mut forward = Plan::r2c_1d(n, &real, &spectrum, Options::ESTIMATE).unwrap();
    let mut backward = Plan::c2r_1d(n, &spectrum, &real, Options::ESTIMATE)
        .unwrap()
        .with_buffer_ownership(true);

    real.set(&data).unwrap();
    forward.execute();
    backward.execute();

    let restored = real.to_vec();
    let max_error = restored
        .iter()
        .zip(&data)
        .map(|(x, y)| (x / n as f64 - y).abs())
        .fold(0.0, f64::max);
    println!(
        "{} engine, {} samples: max round-trip error {:.3e}",
        library.name(),
        n,
        max_error
    );
    if let Some(text) = forward.describe() {
        println!("forward plan: {}", text);
    }

    forward.dispose();
    backward.dispose();
    println!("buffers released: {}", real.is_disposed() && spectrum.is_disposed());
}
