//! Ownership-safe bindings over a native FFT engine.
//!
//! Native memory lives in [`RealBuffer`] / [`ComplexBuffer`], transforms in [`Plan`].
//! Plan creation is serialized process-wide; execution is not. Every allocation and
//! every plan handle is released exactly once, by [`Dispose::dispose`] or on drop.

pub mod bench;
pub mod buffer;
pub mod config;
pub mod dispose;
pub mod engine;
pub mod error;
pub mod flags;
#[doc(hidden)]
pub mod invariant_ppt;
pub mod library;
pub mod plan;
pub mod planner;
pub mod precision;

pub use buffer::{ComplexBuffer, RealBuffer};
pub use config::FftConfig;
pub use dispose::Dispose;
pub use engine::NativeEngine;
pub use error::{ConfigError, FftError};
pub use flags::{Direction, ElementKind, Options, R2rKind, TransformFamily};
pub use library::Library;
pub use num_complex::Complex;
pub use plan::{Plan, PlanBuffer};
pub use precision::Real;
