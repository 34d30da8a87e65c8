//! Shape fitting.
//!
//! Responsibilities:
//!
//! - score a shape hypothesis against a plane (`objective`)
//! - bounded derivative-free search over the six parameters (`search`)
//! - refine one shape on one plane (`optimizer`)
//! - drive the fit across a slice range with warm start (`slices`)
//! - observer hooks and cancellation (`monitor`)

pub mod monitor;
pub mod objective;
pub mod optimizer;
pub mod search;
pub mod slices;

pub use monitor::*;
pub use objective::*;
pub use optimizer::*;
pub use slices::*;
