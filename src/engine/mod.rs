//! Native resource façade.
//!
//! One method per native capability, called without validation. Null pointers are
//! the only failure signal; [`crate::buffer`] and [`crate::plan`] do every contract
//! check before and after calling through here.

pub mod fftw;
pub mod reference;

use crate::flags::{Direction, Options, R2rKind, TransformFamily};
use crate::precision::Real;
use std::ffi::{c_void, CStr};

pub use fftw::FftwEngine;
pub use reference::ReferenceEngine;

/// Transform-specific arguments of a planning call.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanSpec {
    Dft { direction: Direction },
    R2c,
    C2r,
    /// One kind per dimension.
    R2r { kinds: Vec<R2rKind> },
}

impl PlanSpec {
    pub fn family(&self) -> TransformFamily {
        match self {
            PlanSpec::Dft { .. } => TransformFamily::C2c,
            PlanSpec::R2c => TransformFamily::R2c,
            PlanSpec::C2r => TransformFamily::C2r,
            PlanSpec::R2r { .. } => TransformFamily::R2r,
        }
    }
}

/// Arguments of one native planning call.
///
/// `input` and `output` point at native memory laid out as the transform's element kinds
/// require (interleaved pairs for complex sides). They may be equal.
#[derive(Debug)]
pub struct PlanRequest<'a, T> {
    /// Logical dimensions, row-major; the last one varies fastest.
    pub dims: &'a [usize],
    pub input: *mut T,
    pub output: *mut T,
    pub spec: &'a PlanSpec,
    pub options: Options,
}

/// Pass-through to a native FFT engine.
///
/// Only `execute`, `malloc` and `free` are thread-safe in the native engine. The
/// crate issues every other call while holding the planner lock
/// ([`crate::planner`]).
pub trait NativeEngine<T: Real>: Send + Sync + 'static {
    /// Short engine name for logs and reports.
    fn name(&self) -> &str;

    fn malloc(&self, bytes: usize) -> *mut c_void;

    /// # Safety
    /// `ptr` must come from `malloc` of this engine and not have been freed.
    unsafe fn free(&self, ptr: *mut c_void);

    /// Returns an opaque plan handle, or null.
    ///
    /// # Safety
    /// `input` and `output` must be live allocations of this engine large enough
    /// for `dims` under `spec`.
    unsafe fn plan(&self, request: &PlanRequest<'_, T>) -> *mut c_void;

    /// # Safety
    /// `plan` must be a live handle of this engine whose buffers are still allocated.
    unsafe fn execute(&self, plan: *mut c_void);

    /// # Safety
    /// `plan` must be a live handle of this engine; it is invalid afterwards.
    unsafe fn destroy_plan(&self, plan: *mut c_void);

    /// # Safety
    /// `plan` must be a live handle of this engine.
    unsafe fn describe(&self, plan: *mut c_void) -> Option<String>;

    /// Operation counts `(add, mul, fma)` of one execution.
    ///
    /// # Safety
    /// `plan` must be a live handle of this engine.
    unsafe fn flops(&self, plan: *mut c_void) -> (f64, f64, f64);

    fn export_wisdom(&self, path: &CStr) -> bool;

    fn import_wisdom(&self, path: &CStr) -> bool;

    /// Native planning time limit; negative means unlimited.
    fn set_timelimit(&self, seconds: f64);

    /// Drops accumulated planner state and wisdom. The native engine leaves every
    /// plan that is still alive undefined, so callers destroy them first.
    fn cleanup(&self);
}

/// Element count of a row-major shape.
pub(crate) fn element_count(dims: &[usize]) -> usize {
    dims.iter().product()
}

/// Complex element count of the half spectrum of a real transform over `dims`.
pub(crate) fn half_spectrum_count(dims: &[usize]) -> usize {
    match dims.split_last() {
        Some((last, rest)) => element_count(rest) * (last / 2 + 1),
        None => 0,
    }
}
