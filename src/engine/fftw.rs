//! FFTW3 loaded at runtime.

use super::{NativeEngine, PlanRequest, PlanSpec};
use crate::config::LibraryConfig;
use crate::error::FftError;
use crate::precision::Real;
use libloading::Library;
use std::ffi::{c_char, c_int, c_uint, c_void, CStr};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::Arc;

type MallocFn = unsafe extern "C" fn(usize) -> *mut c_void;
type FreeFn = unsafe extern "C" fn(*mut c_void);
type PlanDftFn =
    unsafe extern "C" fn(c_int, *const c_int, *mut c_void, *mut c_void, c_int, c_uint) -> *mut c_void;
type PlanRealFn =
    unsafe extern "C" fn(c_int, *const c_int, *mut c_void, *mut c_void, c_uint) -> *mut c_void;
type PlanR2rFn = unsafe extern "C" fn(
    c_int,
    *const c_int,
    *mut c_void,
    *mut c_void,
    *const c_int,
    c_uint,
) -> *mut c_void;
type PlanFn = unsafe extern "C" fn(*mut c_void);
type WisdomFn = unsafe extern "C" fn(*const c_char) -> c_int;
type TimelimitFn = unsafe extern "C" fn(f64);
type CleanupFn = unsafe extern "C" fn();
type FlopsFn = unsafe extern "C" fn(*const c_void, *mut f64, *mut f64, *mut f64);
type SprintFn = unsafe extern "C" fn(*const c_void) -> *mut c_char;

struct Symbols {
    malloc: MallocFn,
    free: FreeFn,
    plan_dft: PlanDftFn,
    plan_dft_r2c: PlanRealFn,
    plan_dft_c2r: PlanRealFn,
    plan_r2r: PlanR2rFn,
    execute: PlanFn,
    destroy_plan: PlanFn,
    export_wisdom: WisdomFn,
    import_wisdom: WisdomFn,
    set_timelimit: TimelimitFn,
    cleanup: CleanupFn,
    flops: FlopsFn,
    // Absent before FFTW 3.3.4.
    sprint_plan: Option<SprintFn>,
}

unsafe fn symbol<F: Copy>(library: &Library, prefix: &str, name: &str) -> Result<F, String> {
    let full = format!("{}{}", prefix, name);
    library
        .get::<F>(full.as_bytes())
        .map(|s| *s)
        .map_err(|e| format!("missing symbol {}: {}", full, e))
}

impl Symbols {
    unsafe fn resolve(library: &Library, prefix: &str) -> Result<Self, String> {
        Ok(Self {
            malloc: symbol(library, prefix, "malloc")?,
            free: symbol(library, prefix, "free")?,
            plan_dft: symbol(library, prefix, "plan_dft")?,
            plan_dft_r2c: symbol(library, prefix, "plan_dft_r2c")?,
            plan_dft_c2r: symbol(library, prefix, "plan_dft_c2r")?,
            plan_r2r: symbol(library, prefix, "plan_r2r")?,
            execute: symbol(library, prefix, "execute")?,
            destroy_plan: symbol(library, prefix, "destroy_plan")?,
            export_wisdom: symbol(library, prefix, "export_wisdom_to_filename")?,
            import_wisdom: symbol(library, prefix, "import_wisdom_from_filename")?,
            set_timelimit: symbol(library, prefix, "set_timelimit")?,
            cleanup: symbol(library, prefix, "cleanup")?,
            flops: symbol(library, prefix, "flops")?,
            sprint_plan: symbol(library, prefix, "sprint_plan").ok(),
        })
    }
}

/// One precision of a dynamically loaded FFTW3.
///
/// Buffers and plans hold the engine through an `Arc`, so the shared library stays
/// mapped while any native memory or plan handle is outstanding.
pub struct FftwEngine<T: Real> {
    symbols: Symbols,
    path: PathBuf,
    _library: Arc<Library>,
    _lane: PhantomData<fn() -> T>,
}

impl<T: Real> FftwEngine<T> {
    /// Tries each configured candidate until one loads with every symbol resolved.
    pub fn load(config: &LibraryConfig) -> Result<Self, FftError> {
        let mut attempts = Vec::new();
        for candidate in config.candidates::<T>() {
            match Self::open(&candidate) {
                Ok(engine) => {
                    log::info!(
                        "loaded {} precision FFTW from {}",
                        T::NAME,
                        candidate.display()
                    );
                    return Ok(engine);
                }
                Err(reason) => {
                    log::debug!("{}: {}", candidate.display(), reason);
                    attempts.push(format!("{}: {}", candidate.display(), reason));
                }
            }
        }
        Err(FftError::LibraryLoad(if attempts.is_empty() {
            format!("no {} candidates configured", T::LIBRARY_STEM)
        } else {
            attempts.join("; ")
        }))
    }

    /// Loads one specific shared library file.
    pub fn open(path: &Path) -> Result<Self, String> {
        // SAFETY: loading FFTW runs no initialisers with preconditions on our side.
        let library = unsafe { Library::new(path) }.map_err(|e| e.to_string())?;
        let symbols = unsafe { Symbols::resolve(&library, T::SYMBOL_PREFIX) }?;
        Ok(Self {
            symbols,
            path: path.to_path_buf(),
            _library: Arc::new(library),
            _lane: PhantomData,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T: Real> std::fmt::Debug for FftwEngine<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FftwEngine")
            .field("precision", &T::NAME)
            .field("path", &self.path)
            .finish()
    }
}

impl<T: Real> NativeEngine<T> for FftwEngine<T> {
    fn name(&self) -> &str {
        "fftw"
    }

    fn malloc(&self, bytes: usize) -> *mut c_void {
        let ptr = unsafe { (self.symbols.malloc)(bytes) };
        log::trace!("fftw malloc {} bytes at {:p}", bytes, ptr);
        ptr
    }

    unsafe fn free(&self, ptr: *mut c_void) {
        log::trace!("fftw free {:p}", ptr);
        (self.symbols.free)(ptr)
    }

    unsafe fn plan(&self, request: &PlanRequest<'_, T>) -> *mut c_void {
        let Ok(rank) = c_int::try_from(request.dims.len()) else {
            return ptr::null_mut();
        };
        let mut dims = Vec::with_capacity(request.dims.len());
        for &d in request.dims {
            let Ok(d) = c_int::try_from(d) else {
                return ptr::null_mut();
            };
            dims.push(d);
        }
        let input = request.input as *mut c_void;
        let output = request.output as *mut c_void;
        let flags = request.options.bits() as c_uint;
        match request.spec {
            PlanSpec::Dft { direction } => (self.symbols.plan_dft)(
                rank,
                dims.as_ptr(),
                input,
                output,
                direction.sign(),
                flags,
            ),
            PlanSpec::R2c => (self.symbols.plan_dft_r2c)(rank, dims.as_ptr(), input, output, flags),
            PlanSpec::C2r => (self.symbols.plan_dft_c2r)(rank, dims.as_ptr(), input, output, flags),
            PlanSpec::R2r { kinds } => {
                if kinds.len() != dims.len() {
                    return ptr::null_mut();
                }
                let kinds: Vec<c_int> = kinds.iter().map(|k| k.code()).collect();
                (self.symbols.plan_r2r)(rank, dims.as_ptr(), input, output, kinds.as_ptr(), flags)
            }
        }
    }

    unsafe fn execute(&self, plan: *mut c_void) {
        (self.symbols.execute)(plan)
    }

    unsafe fn destroy_plan(&self, plan: *mut c_void) {
        (self.symbols.destroy_plan)(plan)
    }

    unsafe fn describe(&self, plan: *mut c_void) -> Option<String> {
        let sprint = self.symbols.sprint_plan?;
        let text = sprint(plan);
        if text.is_null() {
            return None;
        }
        let description = CStr::from_ptr(text).to_string_lossy().into_owned();
        // sprint_plan allocates with the C allocator.
        libc::free(text as *mut libc::c_void);
        Some(description)
    }

    unsafe fn flops(&self, plan: *mut c_void) -> (f64, f64, f64) {
        let (mut add, mut mul, mut fma) = (0.0, 0.0, 0.0);
        (self.symbols.flops)(plan, &mut add, &mut mul, &mut fma);
        (add, mul, fma)
    }

    fn export_wisdom(&self, path: &CStr) -> bool {
        unsafe { (self.symbols.export_wisdom)(path.as_ptr()) != 0 }
    }

    fn import_wisdom(&self, path: &CStr) -> bool {
        unsafe { (self.symbols.import_wisdom)(path.as_ptr()) != 0 }
    }

    fn set_timelimit(&self, seconds: f64) {
        unsafe { (self.symbols.set_timelimit)(seconds) }
    }

    fn cleanup(&self) {
        unsafe { (self.symbols.cleanup)() }
    }
}
