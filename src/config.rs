//! fftwrap configuration
//!
//! Handles parsing of `fftwrap.toml`: where to find the native library, planner
//! defaults and benchmark sizes.

use crate::error::ConfigError;
use crate::flags::Options;
use crate::precision::Real;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// File name searched for by [`FftConfig::find_and_load`].
pub const CONFIG_FILE: &str = "fftwrap.toml";

/// Explicit shared-library path, tried before any configured name.
pub const LIBRARY_ENV: &str = "FFTWRAP_LIBRARY";

/// Root configuration structure matching fftwrap.toml.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FftConfig {
    /// Native library discovery
    #[serde(default)]
    pub library: LibraryConfig,

    /// Planner defaults
    #[serde(default)]
    pub planner: PlannerConfig,

    /// Benchmark harness
    #[serde(default)]
    pub bench: BenchConfig,
}

impl FftConfig {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        log::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: FftConfig = toml::from_str(content)?;
        // Reject unknown option names at load time rather than at first plan.
        config.planner.options()?;
        Ok(config)
    }

    /// Load configuration from the current directory or parents.
    pub fn load_from_cwd() -> ConfigResult<Self> {
        let cwd = std::env::current_dir().map_err(ConfigError::Io)?;
        Self::find_and_load(&cwd)
    }

    /// Find and load configuration by searching up from the given directory.
    pub fn find_and_load(start_dir: &Path) -> ConfigResult<Self> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let config_path = dir.join(CONFIG_FILE);
            if config_path.exists() {
                return Self::load(&config_path);
            }
            if !dir.pop() {
                return Ok(Self::default());
            }
        }
    }
}

/// Where to look for the FFTW shared libraries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LibraryConfig {
    /// Directories tried before the system loader path
    #[serde(default)]
    pub search_dirs: Vec<PathBuf>,

    /// File names of the double precision library
    #[serde(default = "default_double_names")]
    pub double_names: Vec<String>,

    /// File names of the single precision library
    #[serde(default = "default_single_names")]
    pub single_names: Vec<String>,

    /// Use the pure-Rust engine when no native library loads
    #[serde(default = "default_true")]
    pub fallback_to_reference: bool,

    /// Try the `FFTWRAP_LIBRARY` path before the configured names
    #[serde(default = "default_true")]
    pub use_env_override: bool,
}

fn default_true() -> bool {
    true
}

fn default_double_names() -> Vec<String> {
    platform_names("fftw3")
}

fn default_single_names() -> Vec<String> {
    platform_names("fftw3f")
}

fn platform_names(stem: &str) -> Vec<String> {
    if cfg!(target_os = "windows") {
        vec![format!("lib{}-3.dll", stem), format!("{}.dll", stem)]
    } else if cfg!(target_os = "macos") {
        vec![format!("lib{}.3.dylib", stem), format!("lib{}.dylib", stem)]
    } else {
        vec![format!("lib{}.so.3", stem), format!("lib{}.so", stem)]
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            search_dirs: Vec::new(),
            double_names: default_double_names(),
            single_names: default_single_names(),
            fallback_to_reference: true,
            use_env_override: true,
        }
    }
}

impl LibraryConfig {
    /// Library names configured for precision `T`.
    pub fn names<T: Real>(&self) -> &[String] {
        if T::WIDTH == 4 {
            &self.single_names
        } else {
            &self.double_names
        }
    }

    /// Paths to try, in order: `FFTWRAP_LIBRARY` (when `use_env_override` is set),
    /// each search dir joined with each name, then the bare names for the system
    /// loader.
    pub fn candidates<T: Real>(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if self.use_env_override {
            if let Some(path) = std::env::var_os(LIBRARY_ENV) {
                if !path.is_empty() {
                    candidates.push(PathBuf::from(path));
                }
            }
        }
        for dir in &self.search_dirs {
            for name in self.names::<T>() {
                candidates.push(dir.join(name));
            }
        }
        candidates.extend(self.names::<T>().iter().map(PathBuf::from));
        candidates
    }
}

/// Planner defaults applied by [`crate::Library`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlannerConfig {
    /// Native planning time limit in seconds; unset means unlimited
    #[serde(default)]
    pub timelimit_secs: Option<f64>,

    /// Option names combined into the default plan flags
    #[serde(default = "default_option_names")]
    pub options: Vec<String>,

    /// Wisdom file imported when the library is loaded
    #[serde(default)]
    pub wisdom_file: Option<PathBuf>,
}

fn default_option_names() -> Vec<String> {
    vec!["estimate".to_string()]
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            timelimit_secs: None,
            options: default_option_names(),
            wisdom_file: None,
        }
    }
}

impl PlannerConfig {
    pub fn options(&self) -> ConfigResult<Options> {
        Options::from_names(&self.options)
    }
}

/// Benchmark harness sizes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BenchConfig {
    /// Transform size as a power of two
    #[serde(default = "default_size_log2")]
    pub size_log2: u32,

    /// Timed batches per implementation
    #[serde(default = "default_repeat")]
    pub repeat: usize,

    /// Runs per timed batch
    #[serde(default = "default_inner_iterations")]
    pub inner_iterations: usize,
}

fn default_size_log2() -> u32 {
    12
}

fn default_repeat() -> usize {
    80
}

fn default_inner_iterations() -> usize {
    50
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            size_log2: default_size_log2(),
            repeat: default_repeat(),
            inner_iterations: default_inner_iterations(),
        }
    }
}

impl BenchConfig {
    pub const SIZE_LOG2_RANGE: (u32, u32) = (6, 14);
    pub const REPEAT_RANGE: (usize, usize) = (20, 200);

    /// Transform size, clamped to 2^6..=2^14.
    pub fn size(&self) -> usize {
        let (lo, hi) = Self::SIZE_LOG2_RANGE;
        1 << self.size_log2.clamp(lo, hi)
    }

    pub fn repeat(&self) -> usize {
        let (lo, hi) = Self::REPEAT_RANGE;
        self.repeat.clamp(lo, hi)
    }

    pub fn inner_iterations(&self) -> usize {
        self.inner_iterations.max(1)
    }
}
