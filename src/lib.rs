//! `twocircle-fit` library crate.
//!
//! The binary (`tcfit`) is a thin wrapper around this library so that:
//!
//! - the fitting core is testable without spawning processes or touching files
//! - other front-ends can drive `fit::SliceFitter` with their own plane
//!   sources, monitors and cancellation

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
