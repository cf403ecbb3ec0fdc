//! Instrumented engine shared by the integration tests.
#![allow(dead_code)]

use fftwrap::engine::{NativeEngine, PlanRequest, ReferenceEngine};
use fftwrap::{Library, Real};
use std::collections::HashSet;
use std::ffi::{c_void, CStr};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Delegates to [`ReferenceEngine`] and counts every native call.
pub struct CountingEngine<T: Real> {
    inner: ReferenceEngine<T>,
    live_allocations: Mutex<HashSet<usize>>,
    live_plans: Mutex<HashSet<usize>>,
    pub allocations: AtomicUsize,
    pub frees: AtomicUsize,
    pub bad_frees: AtomicUsize,
    pub plans_created: AtomicUsize,
    pub plans_destroyed: AtomicUsize,
    pub bad_destroys: AtomicUsize,
    pub executions: AtomicUsize,
    planning_now: Arc<AtomicUsize>,
    pub max_concurrent_planning: Arc<AtomicUsize>,
    fail_next_malloc: AtomicBool,
    fail_next_plan: AtomicBool,
    plan_delay: Duration,
}

impl<T: Real> CountingEngine<T> {
    pub fn new() -> Self {
        Self::with_plan_delay(Duration::ZERO)
    }

    /// Sleeps inside every planning call to widen race windows.
    pub fn with_plan_delay(plan_delay: Duration) -> Self {
        Self {
            inner: ReferenceEngine::new(),
            live_allocations: Mutex::new(HashSet::new()),
            live_plans: Mutex::new(HashSet::new()),
            allocations: AtomicUsize::new(0),
            frees: AtomicUsize::new(0),
            bad_frees: AtomicUsize::new(0),
            plans_created: AtomicUsize::new(0),
            plans_destroyed: AtomicUsize::new(0),
            bad_destroys: AtomicUsize::new(0),
            executions: AtomicUsize::new(0),
            planning_now: Arc::new(AtomicUsize::new(0)),
            max_concurrent_planning: Arc::new(AtomicUsize::new(0)),
            fail_next_malloc: AtomicBool::new(false),
            fail_next_plan: AtomicBool::new(false),
            plan_delay,
        }
    }

    /// Measures planning overlap together with `other`, whatever its precision.
    pub fn sharing_planning_gauge<U: Real>(mut self, other: &CountingEngine<U>) -> Self {
        self.planning_now = Arc::clone(&other.planning_now);
        self.max_concurrent_planning = Arc::clone(&other.max_concurrent_planning);
        self
    }

    pub fn fail_next_allocation(&self) {
        self.fail_next_malloc.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_plan(&self) {
        self.fail_next_plan.store(true, Ordering::SeqCst);
    }

    pub fn live_allocations(&self) -> usize {
        self.live_allocations.lock().unwrap().len()
    }

    pub fn live_plans(&self) -> usize {
        self.live_plans.lock().unwrap().len()
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    /// Every allocation freed exactly once and every plan destroyed exactly once.
    pub fn assert_balanced(&self) {
        assert_eq!(self.live_allocations(), 0, "leaked allocations");
        assert_eq!(self.live_plans(), 0, "leaked plans");
        assert_eq!(Self::count(&self.bad_frees), 0, "double or foreign free");
        assert_eq!(Self::count(&self.bad_destroys), 0, "double destroy");
        assert_eq!(Self::count(&self.allocations), Self::count(&self.frees));
        assert_eq!(
            Self::count(&self.plans_created),
            Self::count(&self.plans_destroyed)
        );
    }
}

impl<T: Real> NativeEngine<T> for CountingEngine<T> {
    fn name(&self) -> &str {
        "counting"
    }

    fn malloc(&self, bytes: usize) -> *mut c_void {
        if self.fail_next_malloc.swap(false, Ordering::SeqCst) {
            return std::ptr::null_mut();
        }
        let ptr = self.inner.malloc(bytes);
        if !ptr.is_null() {
            self.allocations.fetch_add(1, Ordering::SeqCst);
            self.live_allocations.lock().unwrap().insert(ptr as usize);
        }
        ptr
    }

    unsafe fn free(&self, ptr: *mut c_void) {
        self.frees.fetch_add(1, Ordering::SeqCst);
        if !self.live_allocations.lock().unwrap().remove(&(ptr as usize)) {
            self.bad_frees.fetch_add(1, Ordering::SeqCst);
            return;
        }
        self.inner.free(ptr)
    }

    unsafe fn plan(&self, request: &PlanRequest<'_, T>) -> *mut c_void {
        let now = self.planning_now.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent_planning.fetch_max(now, Ordering::SeqCst);
        if !self.plan_delay.is_zero() {
            thread::sleep(self.plan_delay);
        }
        let handle = if self.fail_next_plan.swap(false, Ordering::SeqCst) {
            std::ptr::null_mut()
        } else {
            self.inner.plan(request)
        };
        if !handle.is_null() {
            self.plans_created.fetch_add(1, Ordering::SeqCst);
            self.live_plans.lock().unwrap().insert(handle as usize);
        }
        self.planning_now.fetch_sub(1, Ordering::SeqCst);
        handle
    }

    unsafe fn execute(&self, plan: *mut c_void) {
        self.executions.fetch_add(1, Ordering::SeqCst);
        self.inner.execute(plan)
    }

    unsafe fn destroy_plan(&self, plan: *mut c_void) {
        self.plans_destroyed.fetch_add(1, Ordering::SeqCst);
        if !self.live_plans.lock().unwrap().remove(&(plan as usize)) {
            self.bad_destroys.fetch_add(1, Ordering::SeqCst);
            return;
        }
        self.inner.destroy_plan(plan)
    }

    unsafe fn describe(&self, plan: *mut c_void) -> Option<String> {
        self.inner.describe(plan)
    }

    unsafe fn flops(&self, plan: *mut c_void) -> (f64, f64, f64) {
        self.inner.flops(plan)
    }

    fn export_wisdom(&self, path: &CStr) -> bool {
        self.inner.export_wisdom(path)
    }

    fn import_wisdom(&self, path: &CStr) -> bool {
        self.inner.import_wisdom(path)
    }

    fn set_timelimit(&self, seconds: f64) {
        self.inner.set_timelimit(seconds)
    }

    fn cleanup(&self) {
        self.inner.cleanup()
    }
}

/// A fresh counting engine and a library allocating from it.
pub fn counting_library<T: Real>() -> (Arc<CountingEngine<T>>, Library<T>) {
    let engine = Arc::new(CountingEngine::<T>::new());
    let library = Library::from_engine(engine.clone());
    (engine, library)
}

pub fn assert_close(actual: &[f64], expected: &[f64], tolerance: f64) {
    assert_eq!(actual.len(), expected.len());
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a - e).abs() <= tolerance,
            "index {}: {} vs {} (tolerance {})",
            i,
            a,
            e,
            tolerance
        );
    }
}
