//! Benchmarks over this crate's own buffers and plans.

use super::{magnitudes, scale_by_length, FftBenchmark};
use crate::buffer::{ComplexBuffer, RealBuffer};
use crate::dispose::Dispose;
use crate::error::FftError;
use crate::flags::{Direction, Options};
use crate::library::Library;
use crate::plan::Plan;
use crate::precision::Real;
use num_complex::Complex;
use std::sync::Arc;

fn display_name<T: Real>(library: &Library<T>, base: &str) -> String {
    if library.name() == "fftw" {
        base.to_string()
    } else {
        format!("{} ({})", base, library.name())
    }
}

struct ComplexState<T: Real> {
    forward: Plan<T>,
    backward: Plan<T>,
}

/// Complex-to-complex transform of the real signal with zero imaginary parts.
///
/// Backward runs invert the spectrum of the initialized data into a third buffer,
/// so neither direction disturbs the other's input.
pub struct FftwComplex<T: Real = f64> {
    library: Library<T>,
    name: String,
    size: usize,
    state: Option<ComplexState<T>>,
}

/// Single precision variant of [`FftwComplex`].
pub type FftwSingle = FftwComplex<f32>;

impl<T: Real> FftwComplex<T> {
    pub fn new(library: Library<T>) -> Self {
        let base = if T::WIDTH == 4 { "FFTWF" } else { "FFTW" };
        Self {
            name: display_name(&library, base),
            library,
            size: 0,
            state: None,
        }
    }
}

impl<T: Real> FftBenchmark for FftwComplex<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> usize {
        self.size
    }

    fn initialize(&mut self, data: &[f64]) -> Result<(), FftError> {
        let n = data.len();
        let interleaved: Vec<T> = data.iter().flat_map(|&x| [T::of(x), T::zero()]).collect();
        let input = Arc::new(ComplexBuffer::new(&self.library, n)?);
        let output = Arc::new(ComplexBuffer::new(&self.library, n)?);
        let restored = Arc::new(ComplexBuffer::new(&self.library, n)?);
        let options = self.library.default_options();
        let mut forward = Plan::c2c_1d(n, &input, &output, Direction::Forward, options)?;
        let backward = Plan::c2c_1d(n, &output, &restored, Direction::Backward, options)?;
        // Measuring planners scribble over the buffers, so load the data afterwards.
        input.set(&interleaved)?;
        forward.execute();
        self.size = n;
        self.state = Some(ComplexState { forward, backward });
        Ok(())
    }

    fn run(&mut self, forward: bool) {
        if let Some(state) = &mut self.state {
            if forward {
                state.forward.execute();
            } else {
                state.backward.execute();
            }
        }
    }

    fn spectrum(&mut self, input: &mut [f64], scale: bool) -> Result<Vec<f64>, FftError> {
        let n = input.len();
        let zinput: Vec<Complex<T>> = input
            .iter()
            .map(|&x| Complex::new(T::of(x), T::zero()))
            .collect();
        let options = Options::ESTIMATE;
        let data1 = Arc::new(ComplexBuffer::from_complex(&self.library, &zinput)?);
        let data2 = Arc::new(ComplexBuffer::new(&self.library, n)?);
        let mut forward = Plan::c2c_1d(n, &data1, &data2, Direction::Forward, options)?;
        let mut backward = Plan::c2c_1d(n, &data2, &data1, Direction::Backward, options)?
            .with_buffer_ownership(true);

        forward.execute();
        let spectrum = magnitudes(&data2.to_complex_vec());
        backward.execute();

        let mut real = vec![T::zero(); n];
        data1.copy_real_parts_to(&mut real)?;
        forward.dispose();
        backward.dispose();

        for (dst, src) in input.iter_mut().zip(&real) {
            *dst = src.as_f64();
        }
        if scale {
            scale_by_length(input, n);
        }
        Ok(spectrum)
    }
}

struct RealState<T: Real> {
    data: Vec<T>,
    spectrum: Vec<Complex<T>>,
    input: Arc<RealBuffer<T>>,
    half: Arc<ComplexBuffer<T>>,
    forward: Plan<T>,
    backward: Plan<T>,
}

/// Real-to-complex forward and complex-to-real backward transforms.
///
/// Each run reloads its input first: the backward transform overwrites the half
/// spectrum it reads.
pub struct FftwReal<T: Real = f64> {
    library: Library<T>,
    name: String,
    size: usize,
    state: Option<RealState<T>>,
}

impl<T: Real> FftwReal<T> {
    pub fn new(library: Library<T>) -> Self {
        let base = if T::WIDTH == 4 { "FFTWF (real)" } else { "FFTW (real)" };
        Self {
            name: display_name(&library, base),
            library,
            size: 0,
            state: None,
        }
    }
}

impl<T: Real> FftBenchmark for FftwReal<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> usize {
        self.size
    }

    fn initialize(&mut self, data: &[f64]) -> Result<(), FftError> {
        let n = data.len();
        let data: Vec<T> = data.iter().map(|&x| T::of(x)).collect();
        let input = Arc::new(RealBuffer::new(&self.library, n)?);
        let output = Arc::new(ComplexBuffer::new(&self.library, n / 2 + 1)?);
        let half = Arc::new(ComplexBuffer::new(&self.library, n / 2 + 1)?);
        let restored = Arc::new(RealBuffer::new(&self.library, n)?);
        let options = self.library.default_options();
        let mut forward = Plan::r2c_1d(n, &input, &output, options)?;
        let backward = Plan::c2r_1d(n, &half, &restored, options)?;
        input.set(&data)?;
        forward.execute();
        let spectrum = output.to_complex_vec();
        self.size = n;
        self.state = Some(RealState {
            data,
            spectrum,
            input,
            half,
            forward,
            backward,
        });
        Ok(())
    }

    fn run(&mut self, forward: bool) {
        if let Some(state) = &mut self.state {
            if forward {
                if state.input.set(&state.data).is_ok() {
                    state.forward.execute();
                }
            } else if state.half.set_complex(&state.spectrum).is_ok() {
                state.backward.execute();
            }
        }
    }

    fn spectrum(&mut self, input: &mut [f64], scale: bool) -> Result<Vec<f64>, FftError> {
        let n = input.len();
        let options = Options::ESTIMATE;
        let data1 = Arc::new(RealBuffer::new(&self.library, n)?);
        let data2 = Arc::new(ComplexBuffer::new(&self.library, n / 2 + 1)?);
        let mut forward = Plan::r2c_1d(n, &data1, &data2, options)?;
        let mut backward = Plan::c2r_1d(n, &data2, &data1, options)?;

        let samples: Vec<T> = input.iter().map(|&x| T::of(x)).collect();
        data1.set(&samples)?;
        forward.execute();
        let spectrum = magnitudes(&data2.to_complex_vec());
        backward.execute();

        let restored = data1.to_vec();
        for (dst, src) in input.iter_mut().zip(&restored) {
            *dst = src.as_f64();
        }
        if scale {
            scale_by_length(input, n);
        }
        Ok(spectrum)
    }
}
