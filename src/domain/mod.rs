//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - configuration enums (`ObjectiveKind`, `OptimizationMethod`, `Interpolation`, `ErrorPolicy`)
//! - the slice range, parameter bounds and run configuration
//! - image planes and the `PlaneSource` abstraction

pub mod plane;
pub mod types;

pub use plane::*;
pub use types::*;
