//! Benchmark harness: interchangeable FFT implementations behind one trait.

pub mod fftw;
pub mod pure_rust;
pub mod report;
pub mod runner;
pub mod signal;

pub use self::fftw::{FftwComplex, FftwReal, FftwSingle};
pub use self::report::create_text;
pub use self::runner::{BenchmarkResult, BenchmarkRunner};
pub use self::pure_rust::RustFftComplex;

use crate::error::FftError;
use crate::library::Library;
use num_complex::Complex;

/// One FFT implementation under test.
pub trait FftBenchmark {
    fn name(&self) -> &str;

    /// Transform size set by the last `initialize`.
    fn size(&self) -> usize;

    /// Prepares buffers and plans for transforms of `data.len()` real samples.
    fn initialize(&mut self, data: &[f64]) -> Result<(), FftError>;

    /// One timed transform. Forward runs transform the initialized data; backward
    /// runs invert its spectrum, computed once by `initialize`.
    fn run(&mut self, forward: bool);

    /// Forward transform of `input`, returning magnitudes; the inverse transform is
    /// written back into `input`, divided by its length when `scale` is set.
    fn spectrum(&mut self, input: &mut [f64], scale: bool) -> Result<Vec<f64>, FftError>;
}

/// Magnitude of each bin.
pub fn magnitudes<T: crate::precision::Real>(bins: &[Complex<T>]) -> Vec<f64> {
    bins.iter()
        .map(|c| c.re.as_f64().hypot(c.im.as_f64()))
        .collect()
}

/// Divides every sample by `n`.
pub fn scale_by_length(samples: &mut [f64], n: usize) {
    let n = n as f64;
    for s in samples.iter_mut() {
        *s /= n;
    }
}

/// Every implementation available for the given libraries, competitors first.
pub fn load_tests(double: &Library<f64>, single: &Library<f32>) -> Vec<Box<dyn FftBenchmark>> {
    vec![
        Box::new(RustFftComplex::new()),
        Box::new(FftwComplex::new(double.clone())),
        Box::new(FftwReal::new(double.clone())),
        Box::new(FftwSingle::new(single.clone())),
    ]
}
