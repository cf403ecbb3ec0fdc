//! Numeric precision of native buffers and plans.
//!
//! The native engine ships one symbol family per lane width; everything above the
//! façade is written once over [`Real`] and instantiated for `f32` and `f64`.

use std::fmt::Debug;

mod sealed {
    pub trait Sealed {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

/// A real lane type the native engine can transform.
pub trait Real:
    sealed::Sealed + rustfft::FftNum + num_traits::Float + Default + Debug + Send + Sync + 'static
{
    /// Width of one real lane in bytes.
    const WIDTH: usize;
    /// Prefix of the native symbol family (`fftw_`, `fftwf_`).
    const SYMBOL_PREFIX: &'static str;
    /// Stem of the shared library name (`fftw3`, `fftw3f`).
    const LIBRARY_STEM: &'static str;
    /// Human-readable precision name.
    const NAME: &'static str;

    /// Converts from `f64`, rounding for single precision.
    fn of(value: f64) -> Self;
    fn as_f64(self) -> f64;
}

impl Real for f32 {
    const WIDTH: usize = 4;
    const SYMBOL_PREFIX: &'static str = "fftwf_";
    const LIBRARY_STEM: &'static str = "fftw3f";
    const NAME: &'static str = "single";

    #[inline]
    fn of(value: f64) -> Self {
        value as f32
    }

    #[inline]
    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl Real for f64 {
    const WIDTH: usize = 8;
    const SYMBOL_PREFIX: &'static str = "fftw_";
    const LIBRARY_STEM: &'static str = "fftw3";
    const NAME: &'static str = "double";

    #[inline]
    fn of(value: f64) -> Self {
        value
    }

    #[inline]
    fn as_f64(self) -> f64 {
        self
    }
}
