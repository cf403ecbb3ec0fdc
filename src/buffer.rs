//! Natively allocated sample buffers.
//!
//! A buffer owns one allocation from its engine and frees it exactly once, through
//! [`Dispose::dispose`] or, failing that, on drop. Data moves in and out by copy.
//!
//! Buffers are shared (`&self` everywhere, `Send + Sync`) because plans reference
//! them. Like the native engine, they leave write ordering to the caller: a buffer
//! must not be written by one thread while another thread reads it or executes a
//! plan over it.

use crate::dispose::{Dispose, HandleSlot};
use crate::engine::NativeEngine;
use crate::error::FftError;
use crate::flags::ElementKind;
use crate::invariant_ppt::{
    assert_invariant, BUFFER_ALLOCATED, BUFFER_RELEASED_ONCE, LENGTH_CHECKED,
};
use crate::library::Library;
use crate::precision::Real;
use num_complex::Complex;
use std::fmt;
use std::ptr::{self, NonNull};
use std::sync::Arc;

/// Allocation shared by the real and complex buffer types.
struct RawBuffer<T: Real> {
    engine: Arc<dyn NativeEngine<T>>,
    slot: HandleSlot,
    len: usize,
    kind: ElementKind,
}

impl<T: Real> RawBuffer<T> {
    fn allocate(library: &Library<T>, len: usize, kind: ElementKind) -> Result<Self, FftError> {
        let bytes = len
            .checked_mul(kind.lanes())
            .and_then(|lanes| lanes.checked_mul(T::WIDTH))
            .ok_or(FftError::Allocation { bytes: usize::MAX })?;
        if bytes == 0 {
            return Err(FftError::Allocation { bytes });
        }
        let engine = Arc::clone(library.engine());
        let Some(addr) = NonNull::new(engine.malloc(bytes)) else {
            log::warn!("{} allocator returned null for {} bytes", engine.name(), bytes);
            return Err(FftError::Allocation { bytes });
        };
        assert_invariant(
            BUFFER_ALLOCATED,
            addr.as_ptr() as usize % std::mem::align_of::<T>() == 0,
            "native allocation is misaligned for the lane type",
            Some(engine.name()),
        );
        Ok(Self {
            engine,
            slot: HandleSlot::new(addr),
            len,
            kind,
        })
    }

    fn lanes(&self) -> usize {
        self.len * self.kind.lanes()
    }

    fn ptr(&self) -> *mut T {
        let addr = self.slot.get();
        if addr.is_null() {
            panic!("{:?} buffer used after dispose", self.kind);
        }
        addr as *mut T
    }

    fn check(&self, actual: usize) -> Result<(), FftError> {
        let expected = self.lanes();
        assert_invariant(LENGTH_CHECKED, true, "length compared", None);
        if actual == expected {
            Ok(())
        } else {
            Err(FftError::LengthMismatch { expected, actual })
        }
    }

    fn set(&self, source: &[T]) -> Result<(), FftError> {
        self.check(source.len())?;
        let dst = self.ptr();
        // SAFETY: dst holds exactly `lanes()` lanes and cannot alias a Rust slice.
        unsafe { ptr::copy_nonoverlapping(source.as_ptr(), dst, source.len()) };
        Ok(())
    }

    fn copy_to(&self, target: &mut [T]) -> Result<(), FftError> {
        self.check(target.len())?;
        let src = self.ptr();
        unsafe { ptr::copy_nonoverlapping(src, target.as_mut_ptr(), target.len()) };
        Ok(())
    }

    fn clear(&self) {
        let dst = self.ptr();
        // All-zero bits are 0.0 for both lane types.
        unsafe { ptr::write_bytes(dst, 0, self.lanes()) };
    }

    fn to_vec(&self) -> Vec<T> {
        let src = self.ptr();
        unsafe { std::slice::from_raw_parts(src, self.lanes()) }.to_vec()
    }

    fn release(&self) -> bool {
        let Some(addr) = self.slot.take() else {
            return false;
        };
        // SAFETY: the slot handed the address out once; nothing reads it afterwards.
        unsafe { self.engine.free(addr.as_ptr()) };
        assert_invariant(
            BUFFER_RELEASED_ONCE,
            self.slot.is_taken(),
            "buffer address survived release",
            None,
        );
        true
    }

    fn same_engine(&self, engine: &Arc<dyn NativeEngine<T>>) -> bool {
        Library::same_engine(&self.engine, engine)
    }
}

impl<T: Real> Drop for RawBuffer<T> {
    fn drop(&mut self) {
        if self.release() {
            log::debug!(
                "{:?} buffer of {} elements released on drop",
                self.kind,
                self.len
            );
        }
    }
}

macro_rules! buffer_common {
    ($name:ident, $kind:expr) => {
        impl<T: Real> $name<T> {
            /// Allocates `len` zero-initialised elements.
            pub fn new(library: &Library<T>, len: usize) -> Result<Self, FftError> {
                let raw = RawBuffer::allocate(library, len, $kind)?;
                raw.clear();
                Ok(Self { raw })
            }

            /// Logical element count.
            pub fn len(&self) -> usize {
                self.raw.len
            }

            pub fn is_empty(&self) -> bool {
                self.raw.len == 0
            }

            pub fn kind(&self) -> ElementKind {
                self.raw.kind
            }

            /// Real lanes per the native layout, `len * kind.lanes()`.
            pub fn lanes(&self) -> usize {
                self.raw.lanes()
            }

            /// Size of the native allocation in bytes.
            pub fn footprint_bytes(&self) -> usize {
                self.raw.lanes() * T::WIDTH
            }

            /// Native address of the first lane.
            ///
            /// # Panics
            /// After dispose.
            pub fn as_ptr(&self) -> *mut T {
                self.raw.ptr()
            }

            /// Overwrites every lane; `source.len()` must equal [`Self::lanes`].
            pub fn set(&self, source: &[T]) -> Result<(), FftError> {
                self.raw.set(source)
            }

            pub fn copy_to(&self, target: &mut [T]) -> Result<(), FftError> {
                self.raw.copy_to(target)
            }

            pub fn clear(&self) {
                self.raw.clear()
            }

            /// Copy of every lane.
            pub fn to_vec(&self) -> Vec<T> {
                self.raw.to_vec()
            }

            pub(crate) fn engine(&self) -> &Arc<dyn NativeEngine<T>> {
                &self.raw.engine
            }

            pub(crate) fn belongs_to(&self, engine: &Arc<dyn NativeEngine<T>>) -> bool {
                self.raw.same_engine(engine)
            }
        }

        impl<T: Real> Dispose for $name<T> {
            fn dispose(&self) {
                self.raw.release();
            }

            fn is_disposed(&self) -> bool {
                self.raw.slot.is_taken()
            }
        }

        impl<T: Real> fmt::Debug for $name<T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("len", &self.raw.len)
                    .field("precision", &T::NAME)
                    .field("engine", &self.raw.engine.name())
                    .field("disposed", &self.is_disposed())
                    .finish()
            }
        }
    };
}

/// Native buffer of real samples.
pub struct RealBuffer<T: Real> {
    raw: RawBuffer<T>,
}

buffer_common!(RealBuffer, ElementKind::Real);

impl<T: Real> RealBuffer<T> {
    pub fn from_slice(library: &Library<T>, data: &[T]) -> Result<Self, FftError> {
        let raw = RawBuffer::allocate(library, data.len(), ElementKind::Real)?;
        raw.set(data)?;
        Ok(Self { raw })
    }
}

/// Native buffer of complex samples, stored as interleaved `(re, im)` lanes.
pub struct ComplexBuffer<T: Real> {
    raw: RawBuffer<T>,
}

buffer_common!(ComplexBuffer, ElementKind::Complex);

impl<T: Real> ComplexBuffer<T> {
    /// Takes interleaved lanes; the element count is `data.len() / 2`.
    pub fn from_interleaved(library: &Library<T>, data: &[T]) -> Result<Self, FftError> {
        if data.len() % 2 != 0 {
            return Err(FftError::LengthMismatch {
                expected: data.len() + 1,
                actual: data.len(),
            });
        }
        let raw = RawBuffer::allocate(library, data.len() / 2, ElementKind::Complex)?;
        raw.set(data)?;
        Ok(Self { raw })
    }

    pub fn from_complex(library: &Library<T>, data: &[Complex<T>]) -> Result<Self, FftError> {
        let buffer = Self {
            raw: RawBuffer::allocate(library, data.len(), ElementKind::Complex)?,
        };
        buffer.set_complex(data)?;
        Ok(buffer)
    }

    pub fn set_complex(&self, source: &[Complex<T>]) -> Result<(), FftError> {
        self.raw.set(as_lanes(source))
    }

    pub fn copy_to_complex(&self, target: &mut [Complex<T>]) -> Result<(), FftError> {
        self.raw.copy_to(as_lanes_mut(target))
    }

    pub fn to_complex_vec(&self) -> Vec<Complex<T>> {
        self.raw
            .to_vec()
            .chunks_exact(2)
            .map(|pair| Complex::new(pair[0], pair[1]))
            .collect()
    }

    /// Writes the real part of each element into `target`, which must hold
    /// [`Self::len`] values.
    pub fn copy_real_parts_to(&self, target: &mut [T]) -> Result<(), FftError> {
        if target.len() != self.len() {
            return Err(FftError::LengthMismatch {
                expected: self.len(),
                actual: target.len(),
            });
        }
        let src = self.raw.ptr();
        for (i, out) in target.iter_mut().enumerate() {
            *out = unsafe { *src.add(2 * i) };
        }
        Ok(())
    }
}

fn as_lanes<T: Real>(data: &[Complex<T>]) -> &[T] {
    // SAFETY: Complex<T> is repr(C) { re, im }.
    unsafe { std::slice::from_raw_parts(data.as_ptr() as *const T, data.len() * 2) }
}

fn as_lanes_mut<T: Real>(data: &mut [Complex<T>]) -> &mut [T] {
    unsafe { std::slice::from_raw_parts_mut(data.as_mut_ptr() as *mut T, data.len() * 2) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> Library<f64> {
        Library::reference()
    }

    #[test]
    fn buffers_are_send_and_sync() {
        fn check<S: Send + Sync>() {}
        check::<RealBuffer<f32>>();
        check::<ComplexBuffer<f64>>();
    }

    #[test]
    fn new_buffers_are_zeroed() {
        let buffer = ComplexBuffer::new(&library(), 4).unwrap();
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.lanes(), 8);
        assert_eq!(buffer.footprint_bytes(), 64);
        assert_eq!(buffer.to_vec(), vec![0.0; 8]);
    }

    #[test]
    fn zero_length_is_an_allocation_error() {
        assert_eq!(
            RealBuffer::<f64>::new(&library(), 0).unwrap_err(),
            FftError::Allocation { bytes: 0 }
        );
    }

    #[test]
    fn oversized_request_fails_cleanly() {
        let err = RealBuffer::<f64>::new(&library(), usize::MAX / 2).unwrap_err();
        assert!(matches!(err, FftError::Allocation { .. }));
    }

    #[test]
    fn set_and_copy_check_lane_count() {
        let buffer = ComplexBuffer::new(&library(), 2).unwrap();
        assert_eq!(
            buffer.set(&[1.0, 2.0, 3.0]),
            Err(FftError::LengthMismatch {
                expected: 4,
                actual: 3
            })
        );
        buffer.set(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        let mut short = [0.0; 2];
        assert!(buffer.copy_to(&mut short).is_err());
        assert_eq!(short, [0.0; 2]);
        assert_eq!(
            buffer.to_complex_vec(),
            vec![Complex::new(1.0, 2.0), Complex::new(3.0, 4.0)]
        );
        let mut reals = [0.0; 2];
        buffer.copy_real_parts_to(&mut reals).unwrap();
        assert_eq!(reals, [1.0, 3.0]);
    }

    #[test]
    fn odd_interleaved_input_is_rejected() {
        let err = ComplexBuffer::from_interleaved(&library(), &[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, FftError::LengthMismatch { actual: 3, .. }));
    }

    #[test]
    fn clear_zeroes_everything() {
        let buffer = RealBuffer::from_slice(&library(), &[1.0, -2.0, 3.5]).unwrap();
        buffer.clear();
        assert_eq!(buffer.to_vec(), vec![0.0; 3]);
    }

    #[test]
    fn dispose_is_idempotent() {
        let buffer = RealBuffer::from_slice(&library(), &[1.0]).unwrap();
        buffer.dispose();
        buffer.dispose();
        assert!(buffer.is_disposed());
    }

    #[test]
    #[should_panic(expected = "after dispose")]
    fn use_after_dispose_panics() {
        let buffer = RealBuffer::<f64>::new(&library(), 8).unwrap();
        buffer.dispose();
        buffer.clear();
    }
}
