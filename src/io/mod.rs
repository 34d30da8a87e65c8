//! Input/output helpers.
//!
//! - image stacks on disk, lazy or preloaded (`stack`)
//! - results CSV exports (`export`)
//! - fit record JSON read/write (`record`)

pub mod export;
pub mod record;
pub mod stack;

pub use export::*;
pub use record::*;
pub use stack::*;
