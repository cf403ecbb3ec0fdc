//! Plan module: bind buffers to a native transform plan.
//!
//! A [`Plan`] is created once, under the process-wide planner lock, for fixed
//! dimensions and a fixed pair of buffers. Executing it runs the transform over
//! whatever those buffers hold at that moment.

use crate::buffer::{ComplexBuffer, RealBuffer};
use crate::dispose::{Dispose, HandleSlot};
use crate::engine::{element_count, half_spectrum_count, NativeEngine, PlanRequest, PlanSpec};
use crate::error::FftError;
use crate::flags::{Direction, ElementKind, Options, R2rKind, TransformFamily};
use crate::invariant_ppt::{
    assert_invariant, EXECUTE_ON_LIVE_BUFFERS, OWNERSHIP_CASCADE, PLAN_CREATED_UNDER_LOCK,
    PLAN_HANDLE_NON_NULL, PLAN_RELEASED_ONCE, PLAN_SHAPE_CHECKED,
};
use crate::planner;
use crate::precision::Real;
use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

/// A buffer bound to one side of a plan.
#[derive(Clone)]
pub enum PlanBuffer<T: Real> {
    Real(Arc<RealBuffer<T>>),
    Complex(Arc<ComplexBuffer<T>>),
}

impl<T: Real> PlanBuffer<T> {
    pub fn kind(&self) -> ElementKind {
        match self {
            PlanBuffer::Real(_) => ElementKind::Real,
            PlanBuffer::Complex(_) => ElementKind::Complex,
        }
    }

    /// Logical element count.
    pub fn len(&self) -> usize {
        match self {
            PlanBuffer::Real(b) => b.len(),
            PlanBuffer::Complex(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_real(&self) -> Option<&Arc<RealBuffer<T>>> {
        match self {
            PlanBuffer::Real(b) => Some(b),
            PlanBuffer::Complex(_) => None,
        }
    }

    pub fn as_complex(&self) -> Option<&Arc<ComplexBuffer<T>>> {
        match self {
            PlanBuffer::Complex(b) => Some(b),
            PlanBuffer::Real(_) => None,
        }
    }

    fn as_ptr(&self) -> *mut T {
        match self {
            PlanBuffer::Real(b) => b.as_ptr(),
            PlanBuffer::Complex(b) => b.as_ptr(),
        }
    }

    fn engine(&self) -> &Arc<dyn NativeEngine<T>> {
        match self {
            PlanBuffer::Real(b) => b.engine(),
            PlanBuffer::Complex(b) => b.engine(),
        }
    }

    fn belongs_to(&self, engine: &Arc<dyn NativeEngine<T>>) -> bool {
        match self {
            PlanBuffer::Real(b) => b.belongs_to(engine),
            PlanBuffer::Complex(b) => b.belongs_to(engine),
        }
    }
}

impl<T: Real> Dispose for PlanBuffer<T> {
    fn dispose(&self) {
        match self {
            PlanBuffer::Real(b) => b.dispose(),
            PlanBuffer::Complex(b) => b.dispose(),
        }
    }

    fn is_disposed(&self) -> bool {
        match self {
            PlanBuffer::Real(b) => b.is_disposed(),
            PlanBuffer::Complex(b) => b.is_disposed(),
        }
    }
}

impl<T: Real> From<Arc<RealBuffer<T>>> for PlanBuffer<T> {
    fn from(buffer: Arc<RealBuffer<T>>) -> Self {
        PlanBuffer::Real(buffer)
    }
}

impl<T: Real> From<Arc<ComplexBuffer<T>>> for PlanBuffer<T> {
    fn from(buffer: Arc<ComplexBuffer<T>>) -> Self {
        PlanBuffer::Complex(buffer)
    }
}

impl<T: Real> fmt::Debug for PlanBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanBuffer::Real(b) => fmt::Debug::fmt(&**b, f),
            PlanBuffer::Complex(b) => fmt::Debug::fmt(&**b, f),
        }
    }
}

/// A native transform plan bound to an input and an output buffer.
///
/// Dropping a plan destroys its handle but never its buffers; only an explicit
/// [`Dispose::dispose`] on a plan that owns its buffers releases them too.
///
/// Both `dispose` and `Drop` destroy the handle under the planner lock, so they
/// wait while another thread is inside a long `MEASURE` or `PATIENT` planning call.
/// Never drop a plan from inside [`planner::with_planner`]: the lock is not
/// reentrant.
pub struct Plan<T: Real> {
    engine: Arc<dyn NativeEngine<T>>,
    handle: HandleSlot,
    input: PlanBuffer<T>,
    output: PlanBuffer<T>,
    owns_buffers: bool,
    family: TransformFamily,
    dims: Vec<usize>,
    options: Options,
}

impl<T: Real> Plan<T> {
    /// Complex-to-complex transform over row-major `dims`.
    pub fn c2c(
        dims: &[usize],
        input: &Arc<ComplexBuffer<T>>,
        output: &Arc<ComplexBuffer<T>>,
        direction: Direction,
        options: Options,
    ) -> Result<Self, FftError> {
        Self::create(
            dims,
            input.clone().into(),
            output.clone().into(),
            PlanSpec::Dft { direction },
            options,
        )
    }

    pub fn c2c_1d(
        n: usize,
        input: &Arc<ComplexBuffer<T>>,
        output: &Arc<ComplexBuffer<T>>,
        direction: Direction,
        options: Options,
    ) -> Result<Self, FftError> {
        Self::c2c(&[n], input, output, direction, options)
    }

    pub fn c2c_2d(
        n0: usize,
        n1: usize,
        input: &Arc<ComplexBuffer<T>>,
        output: &Arc<ComplexBuffer<T>>,
        direction: Direction,
        options: Options,
    ) -> Result<Self, FftError> {
        Self::c2c(&[n0, n1], input, output, direction, options)
    }

    pub fn c2c_3d(
        n0: usize,
        n1: usize,
        n2: usize,
        input: &Arc<ComplexBuffer<T>>,
        output: &Arc<ComplexBuffer<T>>,
        direction: Direction,
        options: Options,
    ) -> Result<Self, FftError> {
        Self::c2c(&[n0, n1, n2], input, output, direction, options)
    }

    /// Real-to-complex forward transform. `output` receives `n_last / 2 + 1`
    /// elements per row of the last dimension.
    pub fn r2c(
        dims: &[usize],
        input: &Arc<RealBuffer<T>>,
        output: &Arc<ComplexBuffer<T>>,
        options: Options,
    ) -> Result<Self, FftError> {
        Self::create(
            dims,
            input.clone().into(),
            output.clone().into(),
            PlanSpec::R2c,
            options,
        )
    }

    pub fn r2c_1d(
        n: usize,
        input: &Arc<RealBuffer<T>>,
        output: &Arc<ComplexBuffer<T>>,
        options: Options,
    ) -> Result<Self, FftError> {
        Self::r2c(&[n], input, output, options)
    }

    pub fn r2c_2d(
        n0: usize,
        n1: usize,
        input: &Arc<RealBuffer<T>>,
        output: &Arc<ComplexBuffer<T>>,
        options: Options,
    ) -> Result<Self, FftError> {
        Self::r2c(&[n0, n1], input, output, options)
    }

    pub fn r2c_3d(
        n0: usize,
        n1: usize,
        n2: usize,
        input: &Arc<RealBuffer<T>>,
        output: &Arc<ComplexBuffer<T>>,
        options: Options,
    ) -> Result<Self, FftError> {
        Self::r2c(&[n0, n1, n2], input, output, options)
    }

    /// Complex-to-real backward transform; `dims` are the logical real dimensions.
    ///
    /// The native engine may overwrite `input` unless `PRESERVE_INPUT` is set.
    pub fn c2r(
        dims: &[usize],
        input: &Arc<ComplexBuffer<T>>,
        output: &Arc<RealBuffer<T>>,
        options: Options,
    ) -> Result<Self, FftError> {
        Self::create(
            dims,
            input.clone().into(),
            output.clone().into(),
            PlanSpec::C2r,
            options,
        )
    }

    pub fn c2r_1d(
        n: usize,
        input: &Arc<ComplexBuffer<T>>,
        output: &Arc<RealBuffer<T>>,
        options: Options,
    ) -> Result<Self, FftError> {
        Self::c2r(&[n], input, output, options)
    }

    pub fn c2r_2d(
        n0: usize,
        n1: usize,
        input: &Arc<ComplexBuffer<T>>,
        output: &Arc<RealBuffer<T>>,
        options: Options,
    ) -> Result<Self, FftError> {
        Self::c2r(&[n0, n1], input, output, options)
    }

    pub fn c2r_3d(
        n0: usize,
        n1: usize,
        n2: usize,
        input: &Arc<ComplexBuffer<T>>,
        output: &Arc<RealBuffer<T>>,
        options: Options,
    ) -> Result<Self, FftError> {
        Self::c2r(&[n0, n1, n2], input, output, options)
    }

    /// Real-to-real transform with one kind per dimension.
    pub fn r2r(
        dims: &[usize],
        input: &Arc<RealBuffer<T>>,
        output: &Arc<RealBuffer<T>>,
        kinds: &[R2rKind],
        options: Options,
    ) -> Result<Self, FftError> {
        Self::create(
            dims,
            input.clone().into(),
            output.clone().into(),
            PlanSpec::R2r {
                kinds: kinds.to_vec(),
            },
            options,
        )
    }

    pub fn r2r_1d(
        n: usize,
        input: &Arc<RealBuffer<T>>,
        output: &Arc<RealBuffer<T>>,
        kind: R2rKind,
        options: Options,
    ) -> Result<Self, FftError> {
        Self::r2r(&[n], input, output, &[kind], options)
    }

    pub fn r2r_2d(
        n0: usize,
        n1: usize,
        input: &Arc<RealBuffer<T>>,
        output: &Arc<RealBuffer<T>>,
        kinds: [R2rKind; 2],
        options: Options,
    ) -> Result<Self, FftError> {
        Self::r2r(&[n0, n1], input, output, &kinds, options)
    }

    pub fn r2r_3d(
        n0: usize,
        n1: usize,
        n2: usize,
        input: &Arc<RealBuffer<T>>,
        output: &Arc<RealBuffer<T>>,
        kinds: [R2rKind; 3],
        options: Options,
    ) -> Result<Self, FftError> {
        Self::r2r(&[n0, n1, n2], input, output, &kinds, options)
    }

    fn create(
        dims: &[usize],
        input: PlanBuffer<T>,
        output: PlanBuffer<T>,
        spec: PlanSpec,
        options: Options,
    ) -> Result<Self, FftError> {
        let family = spec.family();
        check_shape(family, dims, &spec, &input, &output)?;
        let engine = Arc::clone(input.engine());
        if !output.belongs_to(&engine) {
            return Err(FftError::EngineMismatch);
        }

        let request = PlanRequest {
            dims,
            input: input.as_ptr(),
            output: output.as_ptr(),
            spec: &spec,
            options,
        };
        let handle = planner::with_planner(|| {
            assert_invariant(
                PLAN_CREATED_UNDER_LOCK,
                planner::held_by_current_thread(),
                "planning outside the planner lock",
                Some(family.label()),
            );
            // SAFETY: both buffers are live and large enough for `dims` (checked above).
            unsafe { engine.plan(&request) }
        });
        let Some(handle) = NonNull::new(handle) else {
            log::warn!(
                "{} planner rejected {} {:?} ({:?})",
                engine.name(),
                family,
                dims,
                options
            );
            return Err(FftError::PlanCreationFailed {
                family,
                dims: dims.to_vec(),
            });
        };
        assert_invariant(PLAN_HANDLE_NON_NULL, true, "plan handle", None);
        log::debug!(
            "created {} plan {:?} on {} ({} precision)",
            family,
            dims,
            engine.name(),
            T::NAME
        );

        Ok(Self {
            engine,
            handle: HandleSlot::new(handle),
            input,
            output,
            owns_buffers: false,
            family,
            dims: dims.to_vec(),
            options,
        })
    }

    /// Sets whether [`Dispose::dispose`] also disposes the bound buffers.
    pub fn with_buffer_ownership(mut self, owns: bool) -> Self {
        self.owns_buffers = owns;
        self
    }

    pub fn set_buffer_ownership(&mut self, owns: bool) {
        self.owns_buffers = owns;
    }

    pub fn owns_buffers(&self) -> bool {
        self.owns_buffers
    }

    /// Runs the transform over the current buffer contents.
    ///
    /// Plans may execute in parallel on different threads as long as they do not
    /// write a buffer another one reads.
    ///
    /// # Panics
    /// If the plan or either buffer has been disposed.
    pub fn execute(&mut self) {
        let handle = self.live_handle();
        assert_invariant(
            EXECUTE_ON_LIVE_BUFFERS,
            !self.input.is_disposed() && !self.output.is_disposed(),
            "plan buffer used after dispose",
            Some(self.family.label()),
        );
        // SAFETY: the handle is live and its buffers are still allocated.
        unsafe { self.engine.execute(handle) }
    }

    /// Native description of the chosen algorithm, when the engine provides one.
    pub fn describe(&self) -> Option<String> {
        let handle = self.live_handle();
        planner::with_planner(|| unsafe { self.engine.describe(handle) })
    }

    /// Operation counts `(add, mul, fma)` of one execution.
    pub fn flops(&self) -> (f64, f64, f64) {
        let handle = self.live_handle();
        planner::with_planner(|| unsafe { self.engine.flops(handle) })
    }

    pub fn input(&self) -> &PlanBuffer<T> {
        &self.input
    }

    pub fn output(&self) -> &PlanBuffer<T> {
        &self.output
    }

    pub fn family(&self) -> TransformFamily {
        self.family
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn options(&self) -> Options {
        self.options
    }

    fn live_handle(&self) -> *mut std::ffi::c_void {
        let handle = self.handle.get();
        if handle.is_null() {
            panic!("{} plan used after dispose", self.family);
        }
        handle
    }

    fn release_handle(&self) -> bool {
        let Some(handle) = self.handle.take() else {
            return false;
        };
        // Destruction touches planner state in the native engine.
        planner::with_planner(|| unsafe { self.engine.destroy_plan(handle.as_ptr()) });
        assert_invariant(
            PLAN_RELEASED_ONCE,
            self.handle.is_taken(),
            "plan handle survived destroy",
            None,
        );
        true
    }
}

impl<T: Real> Dispose for Plan<T> {
    fn dispose(&self) {
        if self.release_handle() {
            log::debug!("disposed {} plan {:?}", self.family, self.dims);
        }
        if self.owns_buffers {
            self.input.dispose();
            self.output.dispose();
            assert_invariant(
                OWNERSHIP_CASCADE,
                self.input.is_disposed() && self.output.is_disposed(),
                "owned buffers survived plan dispose",
                None,
            );
        }
    }

    fn is_disposed(&self) -> bool {
        self.handle.is_taken()
    }
}

impl<T: Real> Drop for Plan<T> {
    fn drop(&mut self) {
        if self.release_handle() {
            log::debug!("{} plan {:?} destroyed on drop", self.family, self.dims);
        }
    }
}

impl<T: Real> fmt::Debug for Plan<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plan")
            .field("family", &self.family)
            .field("dims", &self.dims)
            .field("options", &self.options)
            .field("owns_buffers", &self.owns_buffers)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Validates dimensions and buffer capacities before the planner is entered.
fn check_shape<T: Real>(
    family: TransformFamily,
    dims: &[usize],
    spec: &PlanSpec,
    input: &PlanBuffer<T>,
    output: &PlanBuffer<T>,
) -> Result<(), FftError> {
    let mismatch = |reason: String| FftError::ShapeMismatch {
        family,
        dims: dims.to_vec(),
        reason,
    };
    if dims.is_empty() {
        return Err(mismatch("no dimensions".to_string()));
    }
    if dims.contains(&0) {
        return Err(mismatch("zero-length dimension".to_string()));
    }
    let count = dims
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| mismatch("element count overflows".to_string()))?;
    debug_assert_eq!(count, element_count(dims));

    let (input_kind, output_kind) = family.element_kinds();
    debug_assert_eq!(input.kind(), input_kind);
    debug_assert_eq!(output.kind(), output_kind);
    let (needed_in, needed_out) = match family {
        TransformFamily::C2c | TransformFamily::R2r => (count, count),
        TransformFamily::R2c => (count, half_spectrum_count(dims)),
        TransformFamily::C2r => (half_spectrum_count(dims), count),
    };
    if input.len() < needed_in {
        return Err(mismatch(format!(
            "input holds {} elements, transform reads {}",
            input.len(),
            needed_in
        )));
    }
    if output.len() < needed_out {
        return Err(mismatch(format!(
            "output holds {} elements, transform writes {}",
            output.len(),
            needed_out
        )));
    }
    if let PlanSpec::R2r { kinds } = spec {
        if kinds.len() != dims.len() {
            return Err(mismatch(format!(
                "{} kinds for {} dimensions",
                kinds.len(),
                dims.len()
            )));
        }
    }
    assert_invariant(PLAN_SHAPE_CHECKED, true, "plan shape", None);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::Library;

    fn complex(library: &Library<f64>, len: usize) -> Arc<ComplexBuffer<f64>> {
        Arc::new(ComplexBuffer::new(library, len).unwrap())
    }

    #[test]
    fn c2c_forward_of_impulse_is_flat() {
        let library = Library::reference();
        let input = complex(&library, 4);
        let output = complex(&library, 4);
        input.set(&[1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
        let mut plan =
            Plan::c2c_1d(4, &input, &output, Direction::Forward, Options::ESTIMATE).unwrap();
        plan.execute();
        assert_eq!(output.to_vec(), vec![1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0]);
        assert_eq!(plan.family(), TransformFamily::C2c);
        assert_eq!(plan.dims(), &[4]);
        assert!(!plan.owns_buffers());
    }

    #[test]
    fn shape_errors_are_reported_before_planning() {
        let library = Library::reference();
        let small = complex(&library, 3);
        let err = Plan::c2c_1d(4, &small, &small, Direction::Forward, Options::ESTIMATE)
            .unwrap_err();
        assert!(matches!(err, FftError::ShapeMismatch { .. }));

        let err = Plan::c2c(&[], &small, &small, Direction::Forward, Options::ESTIMATE)
            .unwrap_err();
        assert!(matches!(err, FftError::ShapeMismatch { reason, .. } if reason == "no dimensions"));

        let real = Arc::new(RealBuffer::new(&library, 8).unwrap());
        let err = Plan::r2r(&[8], &real, &real, &[], Options::ESTIMATE).unwrap_err();
        assert!(matches!(err, FftError::ShapeMismatch { .. }));
    }

    #[test]
    fn r2c_needs_half_spectrum_output() {
        let library = Library::reference();
        let real = Arc::new(RealBuffer::new(&library, 8).unwrap());
        let too_small = complex(&library, 4);
        assert!(Plan::r2c_1d(8, &real, &too_small, Options::ESTIMATE).is_err());
        let half = complex(&library, 5);
        assert!(Plan::r2c_1d(8, &real, &half, Options::ESTIMATE).is_ok());
    }

    #[test]
    fn buffers_from_different_engines_are_rejected() {
        let a = Library::<f64>::reference();
        let b = Library::<f64>::reference();
        let input = complex(&a, 4);
        let output = complex(&b, 4);
        assert_eq!(
            Plan::c2c_1d(4, &input, &output, Direction::Forward, Options::ESTIMATE).unwrap_err(),
            FftError::EngineMismatch
        );
    }

    #[test]
    fn describe_and_flops() {
        let library = Library::reference();
        let buffer = complex(&library, 16);
        let plan =
            Plan::c2c_1d(16, &buffer, &buffer, Direction::Backward, Options::ESTIMATE).unwrap();
        assert!(plan.describe().unwrap().contains("dft"));
        let (add, mul, _) = plan.flops();
        assert!(add > 0.0 && mul > 0.0);
    }

    #[test]
    #[should_panic(expected = "after dispose")]
    fn execute_after_dispose_panics() {
        let library = Library::reference();
        let buffer = complex(&library, 4);
        let mut plan =
            Plan::c2c_1d(4, &buffer, &buffer, Direction::Forward, Options::ESTIMATE).unwrap();
        plan.dispose();
        plan.execute();
    }
}
