//! Handle to one precision of a native FFT engine.

use crate::config::FftConfig;
use crate::engine::{FftwEngine, NativeEngine, ReferenceEngine};
use crate::error::FftError;
use crate::flags::Options;
use crate::planner;
use crate::precision::Real;
use std::ffi::CString;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Clonable handle that buffers are allocated from.
///
/// Every buffer and plan keeps the engine alive, so dropping the last `Library`
/// never unloads native code that still owns memory.
#[derive(Clone)]
pub struct Library<T: Real> {
    engine: Arc<dyn NativeEngine<T>>,
    options: Options,
}

impl<T: Real> Library<T> {
    /// Loads FFTW with default settings, falling back to the pure-Rust engine.
    pub fn load() -> Result<Self, FftError> {
        Self::load_with(&FftConfig::default())
    }

    pub fn load_with(config: &FftConfig) -> Result<Self, FftError> {
        let options = config.planner.options()?;
        let engine: Arc<dyn NativeEngine<T>> = match FftwEngine::<T>::load(&config.library) {
            Ok(engine) => Arc::new(engine),
            Err(err) if config.library.fallback_to_reference => {
                log::warn!(
                    "{}; using the reference engine for {} precision",
                    err,
                    T::NAME
                );
                Arc::new(ReferenceEngine::<T>::new())
            }
            Err(err) => return Err(err),
        };
        let library = Self { engine, options };
        if let Some(seconds) = config.planner.timelimit_secs {
            library.set_timelimit(seconds);
        }
        if let Some(path) = &config.planner.wisdom_file {
            if path.exists() && !library.import_wisdom(path) {
                log::warn!("could not import wisdom from {}", path.display());
            }
        }
        Ok(library)
    }

    /// Pure-Rust engine, no native library involved.
    pub fn reference() -> Self {
        Self::from_engine(Arc::new(ReferenceEngine::<T>::new()))
    }

    pub fn from_engine(engine: Arc<dyn NativeEngine<T>>) -> Self {
        Self {
            engine,
            options: Options::ESTIMATE,
        }
    }

    pub fn with_default_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn name(&self) -> &str {
        self.engine.name()
    }

    pub fn engine(&self) -> &Arc<dyn NativeEngine<T>> {
        &self.engine
    }

    /// Planner options from configuration, `ESTIMATE` unless configured.
    pub fn default_options(&self) -> Options {
        self.options
    }

    /// Writes accumulated wisdom to `path`.
    pub fn export_wisdom(&self, path: &Path) -> bool {
        let Some(path) = c_path(path) else {
            return false;
        };
        planner::with_planner(|| self.engine.export_wisdom(&path))
    }

    pub fn import_wisdom(&self, path: &Path) -> bool {
        let Some(path) = c_path(path) else {
            return false;
        };
        planner::with_planner(|| self.engine.import_wisdom(&path))
    }

    /// Bounds the time the native planner spends per plan; negative for no limit.
    pub fn set_timelimit(&self, seconds: f64) {
        planner::with_planner(|| self.engine.set_timelimit(seconds))
    }

    /// Forgets all accumulated wisdom and planner state.
    ///
    /// # Safety
    /// No plan created from this engine may be alive: the native engine leaves
    /// existing plans undefined, including their later destruction.
    pub unsafe fn cleanup(&self) {
        planner::with_planner(|| self.engine.cleanup())
    }

    pub(crate) fn same_engine(a: &Arc<dyn NativeEngine<T>>, b: &Arc<dyn NativeEngine<T>>) -> bool {
        Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
    }
}

impl<T: Real> fmt::Debug for Library<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Library")
            .field("engine", &self.engine.name())
            .field("precision", &T::NAME)
            .field("options", &self.options)
            .finish()
    }
}

fn c_path(path: &Path) -> Option<CString> {
    path.to_str().and_then(|p| CString::new(p).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_to_reference() {
        let mut config = FftConfig::default();
        config.library.search_dirs.clear();
        config.library.double_names = vec!["libdefinitely-not-fftw.so".into()];
        config.library.use_env_override = false;
        let library = Library::<f64>::load_with(&config).unwrap();
        assert_eq!(library.name(), "reference");
        assert_eq!(library.default_options(), Options::ESTIMATE);

        config.library.fallback_to_reference = false;
        assert!(matches!(
            Library::<f64>::load_with(&config),
            Err(FftError::LibraryLoad(_))
        ));
    }

    #[test]
    fn clones_share_the_engine() {
        let library = Library::<f32>::reference();
        let clone = library.clone();
        assert!(Library::same_engine(library.engine(), clone.engine()));
        assert!(!Library::same_engine(
            library.engine(),
            Library::<f32>::reference().engine()
        ));
    }

    #[test]
    fn timelimit_passes_through() {
        let engine = Arc::new(ReferenceEngine::<f64>::new());
        let library = Library::from_engine(engine.clone());
        library.set_timelimit(2.5);
        assert_eq!(engine.timelimit(), 2.5);
    }
}
