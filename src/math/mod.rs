//! Numerical utilities: plane sampling and sample aggregates.

pub mod interp;
pub mod stats;

pub use interp::*;
pub use stats::*;
