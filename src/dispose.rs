//! Disposal discipline shared by buffers and plans.
//!
//! Explicit `dispose` and `Drop` both go through a [`HandleSlot`], which hands its
//! native handle out exactly once no matter how many threads or paths ask.

use std::ffi::c_void;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicPtr, Ordering};

/// A resource owning native memory or a native handle.
pub trait Dispose {
    /// Releases the native resource. Idempotent and infallible.
    fn dispose(&self);

    fn is_disposed(&self) -> bool;
}

/// One-shot holder of a native handle.
#[derive(Debug)]
pub struct HandleSlot {
    handle: AtomicPtr<c_void>,
}

impl HandleSlot {
    pub fn new(handle: NonNull<c_void>) -> Self {
        Self {
            handle: AtomicPtr::new(handle.as_ptr()),
        }
    }

    /// Current handle; null once taken.
    pub fn get(&self) -> *mut c_void {
        self.handle.load(Ordering::Acquire)
    }

    pub fn is_taken(&self) -> bool {
        self.get().is_null()
    }

    /// Removes the handle. Only the first caller receives it.
    pub fn take(&self) -> Option<NonNull<c_void>> {
        NonNull::new(self.handle.swap(ptr::null_mut(), Ordering::AcqRel))
    }
}
