//! Pure-Rust engine with the native engine's contract.
//!
//! Plans follow the native conventions exactly: unnormalized transforms, forward
//! sign -1, r2c output of `n_last / 2 + 1` elements along the last axis, halfcomplex
//! layout for `R2hc`/`Hc2r`. Each execution reads its whole input before writing
//! output, so in-place plans behave.

use super::{element_count, half_spectrum_count, NativeEngine, PlanRequest, PlanSpec};
use crate::flags::{Direction, Options, R2rKind};
use crate::precision::Real;
use num_complex::Complex;
use num_traits::Zero;
use rustfft::{Fft, FftDirection, FftPlanner};
use std::alloc::{alloc, dealloc, Layout};
use std::collections::BTreeSet;
use std::f64::consts::PI;
use std::ffi::{c_void, CStr};
use std::marker::PhantomData;
use std::ptr;
use std::sync::{Arc, Mutex, PoisonError};

const ALIGN: usize = 16;
// Holds the total allocation size in front of the returned address.
const HEADER: usize = 16;
const WISDOM_HEADER: &str = "fftwrap-reference-wisdom";

/// Engine backed by `rustfft` and direct sums.
pub struct ReferenceEngine<T: Real> {
    wisdom: Mutex<BTreeSet<String>>,
    timelimit: Mutex<f64>,
    _lane: PhantomData<fn() -> T>,
}

impl<T: Real> ReferenceEngine<T> {
    pub fn new() -> Self {
        Self {
            wisdom: Mutex::new(BTreeSet::new()),
            timelimit: Mutex::new(-1.0),
            _lane: PhantomData,
        }
    }

    /// Planning time limit last set through the façade.
    pub fn timelimit(&self) -> f64 {
        *self.timelimit.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of problem signatures accumulated as wisdom.
    pub fn wisdom_len(&self) -> usize {
        self.wisdom
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<T: Real> Default for ReferenceEngine<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Real> std::fmt::Debug for ReferenceEngine<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceEngine")
            .field("precision", &T::NAME)
            .field("wisdom", &self.wisdom_len())
            .finish()
    }
}

struct ReferencePlan<T: Real> {
    dims: Vec<usize>,
    input: *mut T,
    output: *mut T,
    kernel: Kernel<T>,
    signature: String,
}

enum Kernel<T: Real> {
    Dft(Vec<Arc<dyn Fft<T>>>),
    R2c(Vec<Arc<dyn Fft<T>>>),
    C2r(Vec<Arc<dyn Fft<T>>>),
    R2r(Vec<R2rAxis<T>>),
}

struct R2rAxis<T: Real> {
    kind: R2rKind,
    n: usize,
    forward: Arc<dyn Fft<T>>,
    inverse: Arc<dyn Fft<T>>,
}

fn signature<T: Real>(dims: &[usize], spec: &PlanSpec) -> String {
    let shape = dims
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("x");
    let detail = match spec {
        PlanSpec::Dft { direction } => format!("dft-{:?}", direction).to_ascii_lowercase(),
        PlanSpec::R2c => "dft-r2c".to_string(),
        PlanSpec::C2r => "dft-c2r".to_string(),
        PlanSpec::R2r { kinds } => {
            let kinds: Vec<String> = kinds.iter().map(|k| format!("{:?}", k)).collect();
            format!("r2r-{}", kinds.join(",")).to_ascii_lowercase()
        }
    };
    format!("{} {} {}", T::NAME, detail, shape)
}

fn fft_direction(direction: Direction) -> FftDirection {
    match direction {
        Direction::Forward => FftDirection::Forward,
        Direction::Backward => FftDirection::Inverse,
    }
}

impl<T: Real> NativeEngine<T> for ReferenceEngine<T> {
    fn name(&self) -> &str {
        "reference"
    }

    fn malloc(&self, bytes: usize) -> *mut c_void {
        if bytes == 0 {
            return ptr::null_mut();
        }
        let Some(total) = bytes.checked_add(HEADER) else {
            return ptr::null_mut();
        };
        let Ok(layout) = Layout::from_size_align(total, ALIGN) else {
            return ptr::null_mut();
        };
        // SAFETY: layout has non-zero size; the header fits in the first HEADER bytes.
        unsafe {
            let base = alloc(layout);
            if base.is_null() {
                return ptr::null_mut();
            }
            (base as *mut usize).write(total);
            let addr = base.add(HEADER) as *mut c_void;
            log::trace!("reference malloc {} bytes at {:p}", bytes, addr);
            addr
        }
    }

    unsafe fn free(&self, ptr: *mut c_void) {
        if ptr.is_null() {
            return;
        }
        log::trace!("reference free {:p}", ptr);
        let base = (ptr as *mut u8).sub(HEADER);
        let total = (base as *const usize).read();
        dealloc(base, Layout::from_size_align_unchecked(total, ALIGN));
    }

    unsafe fn plan(&self, request: &PlanRequest<'_, T>) -> *mut c_void {
        let dims = request.dims;
        if dims.is_empty() || dims.contains(&0) {
            return ptr::null_mut();
        }
        let signature = signature::<T>(dims, request.spec);
        {
            let mut wisdom = self.wisdom.lock().unwrap_or_else(PoisonError::into_inner);
            if request.options.contains(Options::WISDOM_ONLY) && !wisdom.contains(&signature) {
                return ptr::null_mut();
            }
            wisdom.insert(signature.clone());
        }

        let mut planner = FftPlanner::<T>::new();
        let kernel = match request.spec {
            PlanSpec::Dft { direction } => Kernel::Dft(
                dims.iter()
                    .map(|&n| planner.plan_fft(n, fft_direction(*direction)))
                    .collect(),
            ),
            PlanSpec::R2c => Kernel::R2c(
                dims.iter()
                    .map(|&n| planner.plan_fft_forward(n))
                    .collect(),
            ),
            PlanSpec::C2r => Kernel::C2r(
                dims.iter()
                    .map(|&n| planner.plan_fft_inverse(n))
                    .collect(),
            ),
            PlanSpec::R2r { kinds } => {
                if kinds.len() != dims.len() {
                    return ptr::null_mut();
                }
                // DCT-I is undefined for a single sample.
                if kinds
                    .iter()
                    .zip(dims)
                    .any(|(kind, &n)| *kind == R2rKind::Redft00 && n < 2)
                {
                    return ptr::null_mut();
                }
                Kernel::R2r(
                    kinds
                        .iter()
                        .zip(dims)
                        .map(|(&kind, &n)| R2rAxis {
                            kind,
                            n,
                            forward: planner.plan_fft_forward(n),
                            inverse: planner.plan_fft_inverse(n),
                        })
                        .collect(),
                )
            }
        };

        let plan = Box::new(ReferencePlan {
            dims: dims.to_vec(),
            input: request.input,
            output: request.output,
            kernel,
            signature,
        });
        Box::into_raw(plan) as *mut c_void
    }

    unsafe fn execute(&self, plan: *mut c_void) {
        let plan = &*(plan as *const ReferencePlan<T>);
        log::trace!("reference execute {}", plan.signature);
        plan.run();
    }

    unsafe fn destroy_plan(&self, plan: *mut c_void) {
        drop(Box::from_raw(plan as *mut ReferencePlan<T>));
    }

    unsafe fn describe(&self, plan: *mut c_void) -> Option<String> {
        let plan = &*(plan as *const ReferencePlan<T>);
        Some(format!("(reference {})", plan.signature))
    }

    unsafe fn flops(&self, plan: *mut c_void) -> (f64, f64, f64) {
        let plan = &*(plan as *const ReferencePlan<T>);
        let total = element_count(&plan.dims) as f64;
        match &plan.kernel {
            Kernel::R2r(axes) => {
                let direct: f64 = axes.iter().map(|axis| axis.n as f64).sum();
                (total * direct, total * direct, 0.0)
            }
            _ => {
                let log = total.log2().max(1.0);
                (3.0 * total * log, 2.0 * total * log, 0.0)
            }
        }
    }

    fn export_wisdom(&self, path: &CStr) -> bool {
        let Ok(path) = path.to_str() else {
            return false;
        };
        let wisdom = self.wisdom.lock().unwrap_or_else(PoisonError::into_inner);
        let mut text = String::from(WISDOM_HEADER);
        text.push('\n');
        for entry in wisdom.iter() {
            text.push_str(entry);
            text.push('\n');
        }
        std::fs::write(path, text).is_ok()
    }

    fn import_wisdom(&self, path: &CStr) -> bool {
        let Ok(path) = path.to_str() else {
            return false;
        };
        let Ok(text) = std::fs::read_to_string(path) else {
            return false;
        };
        let mut lines = text.lines();
        if lines.next() != Some(WISDOM_HEADER) {
            return false;
        }
        let mut wisdom = self.wisdom.lock().unwrap_or_else(PoisonError::into_inner);
        for line in lines.filter(|l| !l.trim().is_empty()) {
            wisdom.insert(line.to_string());
        }
        true
    }

    fn set_timelimit(&self, seconds: f64) {
        *self.timelimit.lock().unwrap_or_else(PoisonError::into_inner) = seconds;
    }

    fn cleanup(&self) {
        self.wisdom
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl<T: Real> ReferencePlan<T> {
    unsafe fn run(&self) {
        let dims = &self.dims;
        match &self.kernel {
            Kernel::Dft(ffts) => {
                let count = element_count(dims);
                let mut data = read_complex(self.input, count);
                transform_axes(&mut data, dims, ffts);
                write_complex(self.output, &data);
            }
            Kernel::R2c(ffts) => {
                let count = element_count(dims);
                let mut data: Vec<Complex<T>> = read_real(self.input, count)
                    .into_iter()
                    .map(|re| Complex::new(re, T::zero()))
                    .collect();
                transform_axes(&mut data, dims, ffts);
                let (n_last, half) = last_axis(dims);
                let rows = count / n_last;
                let mut packed = Vec::with_capacity(rows * half);
                for row in 0..rows {
                    packed.extend_from_slice(&data[row * n_last..row * n_last + half]);
                }
                write_complex(self.output, &packed);
            }
            Kernel::C2r(ffts) => {
                let (n_last, half) = last_axis(dims);
                let packed = read_complex(self.input, half_spectrum_count(dims));
                let outer = &dims[..dims.len() - 1];
                let rows = element_count(outer);
                let mut data = vec![Complex::zero(); rows * n_last];
                for row in 0..rows {
                    let mirror = mirror_row(row, outer);
                    for k in 0..n_last {
                        data[row * n_last + k] = if k < half {
                            packed[row * half + k]
                        } else {
                            packed[mirror * half + (n_last - k)].conj()
                        };
                    }
                }
                transform_axes(&mut data, dims, ffts);
                let real: Vec<T> = data.iter().map(|c| c.re).collect();
                write_real(self.output, &real);
            }
            Kernel::R2r(axes) => {
                let count = element_count(dims);
                let mut data = read_real(self.input, count);
                for (axis, transform) in axes.iter().enumerate() {
                    let stride = element_count(&dims[axis + 1..]);
                    let outer = element_count(&dims[..axis]);
                    let n = transform.n;
                    let mut line = vec![T::zero(); n];
                    let mut out = vec![T::zero(); n];
                    for o in 0..outer {
                        let base = o * n * stride;
                        for s in 0..stride {
                            for (k, slot) in line.iter_mut().enumerate() {
                                *slot = data[base + s + k * stride];
                            }
                            transform.apply(&line, &mut out);
                            for (k, value) in out.iter().enumerate() {
                                data[base + s + k * stride] = *value;
                            }
                        }
                    }
                }
                write_real(self.output, &data);
            }
        }
    }
}

fn last_axis(dims: &[usize]) -> (usize, usize) {
    let n_last = dims[dims.len() - 1];
    (n_last, n_last / 2 + 1)
}

/// Row index of the point reflection `(-i0, -i1, ...)` of `row` within `outer`.
fn mirror_row(row: usize, outer: &[usize]) -> usize {
    let mut rest = row;
    let mut mirrored = 0;
    let mut scale = 1;
    for &n in outer.iter().rev() {
        let i = rest % n;
        rest /= n;
        mirrored += ((n - i) % n) * scale;
        scale *= n;
    }
    mirrored
}

/// Applies one 1-D transform per axis, in place, over a row-major array.
fn transform_axes<T: Real>(data: &mut [Complex<T>], dims: &[usize], ffts: &[Arc<dyn Fft<T>>]) {
    for (axis, fft) in ffts.iter().enumerate() {
        let n = dims[axis];
        let stride = element_count(&dims[axis + 1..]);
        if stride == 1 {
            fft.process(data);
            continue;
        }
        let outer = element_count(&dims[..axis]);
        let mut line = vec![Complex::zero(); n];
        for o in 0..outer {
            let base = o * n * stride;
            for s in 0..stride {
                for (k, slot) in line.iter_mut().enumerate() {
                    *slot = data[base + s + k * stride];
                }
                fft.process(&mut line);
                for (k, value) in line.iter().enumerate() {
                    data[base + s + k * stride] = *value;
                }
            }
        }
    }
}

impl<T: Real> R2rAxis<T> {
    fn apply(&self, x: &[T], y: &mut [T]) {
        let n = self.n;
        match self.kind {
            R2rKind::R2hc => {
                let spectrum = self.spectrum(x);
                for k in 0..=n / 2 {
                    y[k] = spectrum[k].re;
                }
                for k in 1..(n + 1) / 2 {
                    y[n - k] = spectrum[k].im;
                }
            }
            R2rKind::Hc2r => {
                let mut spectrum = vec![Complex::zero(); n];
                spectrum[0] = Complex::new(x[0], T::zero());
                for k in 1..(n + 1) / 2 {
                    let value = Complex::new(x[k], x[n - k]);
                    spectrum[k] = value;
                    spectrum[n - k] = value.conj();
                }
                if n % 2 == 0 {
                    spectrum[n / 2] = Complex::new(x[n / 2], T::zero());
                }
                self.inverse.process(&mut spectrum);
                for (out, value) in y.iter_mut().zip(&spectrum) {
                    *out = value.re;
                }
            }
            R2rKind::Dht => {
                let spectrum = self.spectrum(x);
                for (out, value) in y.iter_mut().zip(&spectrum) {
                    *out = value.re - value.im;
                }
            }
            kind => direct_trig(kind, x, y),
        }
    }

    fn spectrum(&self, x: &[T]) -> Vec<Complex<T>> {
        let mut spectrum: Vec<Complex<T>> =
            x.iter().map(|&re| Complex::new(re, T::zero())).collect();
        self.forward.process(&mut spectrum);
        spectrum
    }
}

/// DCT/DST variants evaluated from their defining sums.
fn direct_trig<T: Real>(kind: R2rKind, x: &[T], y: &mut [T]) {
    let n = x.len();
    let nf = n as f64;
    let sign = |k: usize| if k % 2 == 0 { 1.0 } else { -1.0 };
    for (k, out) in y.iter_mut().enumerate() {
        let kf = k as f64;
        let sum: f64 = match kind {
            R2rKind::Redft00 => {
                let edges = x[0].as_f64() + sign(k) * x[n - 1].as_f64();
                edges
                    + (1..n - 1)
                        .map(|j| 2.0 * x[j].as_f64() * (PI * j as f64 * kf / (nf - 1.0)).cos())
                        .sum::<f64>()
            }
            R2rKind::Redft10 => (0..n)
                .map(|j| 2.0 * x[j].as_f64() * (PI * (j as f64 + 0.5) * kf / nf).cos())
                .sum(),
            R2rKind::Redft01 => {
                x[0].as_f64()
                    + (1..n)
                        .map(|j| 2.0 * x[j].as_f64() * (PI * j as f64 * (kf + 0.5) / nf).cos())
                        .sum::<f64>()
            }
            R2rKind::Redft11 => (0..n)
                .map(|j| {
                    2.0 * x[j].as_f64() * (PI * (j as f64 + 0.5) * (kf + 0.5) / nf).cos()
                })
                .sum(),
            R2rKind::Rodft00 => (0..n)
                .map(|j| {
                    2.0 * x[j].as_f64() * (PI * (j as f64 + 1.0) * (kf + 1.0) / (nf + 1.0)).sin()
                })
                .sum(),
            R2rKind::Rodft10 => (0..n)
                .map(|j| 2.0 * x[j].as_f64() * (PI * (j as f64 + 0.5) * (kf + 1.0) / nf).sin())
                .sum(),
            R2rKind::Rodft01 => {
                sign(k) * x[n - 1].as_f64()
                    + (0..n - 1)
                        .map(|j| {
                            2.0 * x[j].as_f64() * (PI * (j as f64 + 1.0) * (kf + 0.5) / nf).sin()
                        })
                        .sum::<f64>()
            }
            R2rKind::Rodft11 => (0..n)
                .map(|j| {
                    2.0 * x[j].as_f64() * (PI * (j as f64 + 0.5) * (kf + 0.5) / nf).sin()
                })
                .sum(),
            R2rKind::R2hc | R2rKind::Hc2r | R2rKind::Dht => 0.0,
        };
        *out = T::of(sum);
    }
}

unsafe fn read_complex<T: Real>(src: *const T, count: usize) -> Vec<Complex<T>> {
    std::slice::from_raw_parts(src as *const Complex<T>, count).to_vec()
}

unsafe fn write_complex<T: Real>(dst: *mut T, data: &[Complex<T>]) {
    ptr::copy_nonoverlapping(data.as_ptr(), dst as *mut Complex<T>, data.len());
}

unsafe fn read_real<T: Real>(src: *const T, count: usize) -> Vec<T> {
    std::slice::from_raw_parts(src, count).to_vec()
}

unsafe fn write_real<T: Real>(dst: *mut T, data: &[T]) {
    ptr::copy_nonoverlapping(data.as_ptr(), dst, data.len());
}
