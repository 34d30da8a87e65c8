//! Geometric shape models.
//!
//! Models are small value types so that the optimizer and the slice fitter can
//! clone snapshots freely.

pub mod shape;

pub use shape::*;
