//! Test and demo data.
//!
//! - synthetic two-circle stacks with drift and noise (`synthetic`)

pub mod synthetic;

pub use synthetic::*;
