//! Planner enumerations: direction, option flags, real-to-real kinds.
//!
//! Discriminants are the native engine's numeric values and are passed through
//! unchanged at the façade boundary.

use crate::error::ConfigError;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Sign of the exponent of a complex transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// exp(-2πi jk/n)
    Forward,
    /// exp(+2πi jk/n)
    Backward,
}

impl Direction {
    /// Native sign argument.
    pub const fn sign(self) -> i32 {
        match self {
            Direction::Forward => -1,
            Direction::Backward => 1,
        }
    }

    pub const fn reverse(self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }
}

/// Planner option flags.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Options(u32);

impl Options {
    /// Find an optimal plan by timing several candidates.
    pub const MEASURE: Options = Options(0);
    /// Allow the plan to overwrite its input.
    pub const DESTROY_INPUT: Options = Options(1 << 0);
    /// Do not assume SIMD-aligned buffers.
    pub const UNALIGNED: Options = Options(1 << 1);
    pub const CONSERVE_MEMORY: Options = Options(1 << 2);
    pub const EXHAUSTIVE: Options = Options(1 << 3);
    /// Keep the input intact, even for complex-to-real plans.
    pub const PRESERVE_INPUT: Options = Options(1 << 4);
    pub const PATIENT: Options = Options(1 << 5);
    /// Pick a plan heuristically, without touching the buffers.
    pub const ESTIMATE: Options = Options(1 << 6);
    /// Only succeed if wisdom for the problem is already present.
    pub const WISDOM_ONLY: Options = Options(1 << 21);

    const NAMED: [(&'static str, Options); 9] = [
        ("measure", Options::MEASURE),
        ("destroy_input", Options::DESTROY_INPUT),
        ("unaligned", Options::UNALIGNED),
        ("conserve_memory", Options::CONSERVE_MEMORY),
        ("exhaustive", Options::EXHAUSTIVE),
        ("preserve_input", Options::PRESERVE_INPUT),
        ("patient", Options::PATIENT),
        ("estimate", Options::ESTIMATE),
        ("wisdom_only", Options::WISDOM_ONLY),
    ];

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn from_bits(bits: u32) -> Self {
        Options(bits)
    }

    pub const fn contains(self, other: Options) -> bool {
        self.0 & other.0 == other.0
    }

    /// Parses a list of option names (`"estimate"`, `"preserve_input"`, ...).
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, ConfigError> {
        let mut options = Options::MEASURE;
        for name in names {
            let name = name.as_ref().trim().to_ascii_lowercase();
            let flag = Self::NAMED
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, flag)| *flag)
                .ok_or_else(|| ConfigError::InvalidOption(name.clone()))?;
            options |= flag;
        }
        Ok(options)
    }
}

impl BitOr for Options {
    type Output = Options;

    fn bitor(self, rhs: Options) -> Options {
        Options(self.0 | rhs.0)
    }
}

impl BitOrAssign for Options {
    fn bitor_assign(&mut self, rhs: Options) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return write!(f, "Options(measure)");
        }
        let names: Vec<&str> = Self::NAMED
            .iter()
            .filter(|(_, flag)| flag.0 != 0 && self.contains(*flag))
            .map(|(name, _)| *name)
            .collect();
        write!(f, "Options({})", names.join(" | "))
    }
}

/// Kinds of real-to-real transforms.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum R2rKind {
    /// r2c DFT with output in halfcomplex order.
    R2hc = 0,
    /// Inverse of `R2hc`, halfcomplex input.
    Hc2r = 1,
    /// Discrete Hartley transform.
    Dht = 2,
    /// DCT-I.
    Redft00 = 3,
    /// DCT-III, the inverse of DCT-II.
    Redft01 = 4,
    /// DCT-II.
    Redft10 = 5,
    /// DCT-IV.
    Redft11 = 6,
    /// DST-I.
    Rodft00 = 7,
    /// DST-III.
    Rodft01 = 8,
    /// DST-II.
    Rodft10 = 9,
    /// DST-IV.
    Rodft11 = 10,
}

impl R2rKind {
    pub const ALL: [R2rKind; 11] = [
        R2rKind::R2hc,
        R2rKind::Hc2r,
        R2rKind::Dht,
        R2rKind::Redft00,
        R2rKind::Redft01,
        R2rKind::Redft10,
        R2rKind::Redft11,
        R2rKind::Rodft00,
        R2rKind::Rodft01,
        R2rKind::Rodft10,
        R2rKind::Rodft11,
    ];

    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Logical size `N` of the equivalent DFT for a transform of `n` samples,
    /// i.e. the factor a forward/inverse pair scales by.
    pub const fn logical_size(self, n: usize) -> usize {
        match self {
            R2rKind::R2hc | R2rKind::Hc2r | R2rKind::Dht => n,
            R2rKind::Redft00 => 2 * n.saturating_sub(1),
            R2rKind::Rodft00 => 2 * (n + 1),
            _ => 2 * n,
        }
    }
}

/// How the native engine interprets a buffer's lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Real,
    /// Two interleaved real lanes per logical element.
    Complex,
}

impl ElementKind {
    pub const fn lanes(self) -> usize {
        match self {
            ElementKind::Real => 1,
            ElementKind::Complex => 2,
        }
    }
}

/// Transform family a plan was created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformFamily {
    C2c,
    R2c,
    C2r,
    R2r,
}

impl TransformFamily {
    /// Element kinds expected for (input, output).
    pub const fn element_kinds(self) -> (ElementKind, ElementKind) {
        match self {
            TransformFamily::C2c => (ElementKind::Complex, ElementKind::Complex),
            TransformFamily::R2c => (ElementKind::Real, ElementKind::Complex),
            TransformFamily::C2r => (ElementKind::Complex, ElementKind::Real),
            TransformFamily::R2r => (ElementKind::Real, ElementKind::Real),
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            TransformFamily::C2c => "dft",
            TransformFamily::R2c => "dft-r2c",
            TransformFamily::C2r => "dft-c2r",
            TransformFamily::R2r => "r2r",
        }
    }
}

impl fmt::Display for TransformFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
