//! Competing implementation: `rustfft` used directly, no native buffers.

use super::{magnitudes, scale_by_length, FftBenchmark};
use crate::error::FftError;
use num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Forward runs transform the signal; backward runs invert its spectrum.
#[derive(Default)]
pub struct RustFftComplex {
    fft: Option<Arc<dyn Fft<f64>>>,
    inverse: Option<Arc<dyn Fft<f64>>>,
    data: Vec<Complex<f64>>,
    spectrum: Vec<Complex<f64>>,
    work: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
}

impl RustFftComplex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FftBenchmark for RustFftComplex {
    fn name(&self) -> &str {
        "RustFFT"
    }

    fn size(&self) -> usize {
        self.data.len()
    }

    fn initialize(&mut self, data: &[f64]) -> Result<(), FftError> {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(data.len());
        let inverse = planner.plan_fft_inverse(data.len());
        let scratch_len = fft
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());
        self.data = data.iter().map(|&x| Complex::new(x, 0.0)).collect();
        self.scratch = vec![Complex::new(0.0, 0.0); scratch_len];
        self.spectrum = self.data.clone();
        fft.process_with_scratch(&mut self.spectrum, &mut self.scratch);
        self.work = self.data.clone();
        self.fft = Some(fft);
        self.inverse = Some(inverse);
        Ok(())
    }

    fn run(&mut self, forward: bool) {
        let (fft, source) = if forward {
            (&self.fft, &self.data)
        } else {
            (&self.inverse, &self.spectrum)
        };
        if let Some(fft) = fft {
            self.work.copy_from_slice(source);
            fft.process_with_scratch(&mut self.work, &mut self.scratch);
        }
    }

    fn spectrum(&mut self, input: &mut [f64], scale: bool) -> Result<Vec<f64>, FftError> {
        let n = input.len();
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(n);
        let inverse = planner.plan_fft_inverse(n);
        let mut buffer: Vec<Complex<f64>> = input.iter().map(|&x| Complex::new(x, 0.0)).collect();
        forward.process(&mut buffer);
        let spectrum = magnitudes(&buffer);
        inverse.process(&mut buffer);
        for (dst, src) in input.iter_mut().zip(&buffer) {
            *dst = src.re;
        }
        if scale {
            scale_by_length(input, n);
        }
        Ok(spectrum)
    }
}
