//! Shared "fit pipeline" logic used by the CLI.
//!
//! Keeping this in one place keeps the workflow readable:
//! open stack -> (optional preload) -> slice fit with warm start -> record
//!
//! The CLI can then focus on presentation and exports.

use std::path::PathBuf;

use log::{debug, info, warn};

use crate::domain::{FitConfig, SliceRange};
use crate::error::AppError;
use crate::fit::{FitResult, LogMonitor, ProgressSink, SliceFitter};
use crate::io::record::FitRecord;
use crate::io::stack::FileStack;
use crate::models::TwoCircleShape;

/// Everything needed for one `tcfit fit` run.
#[derive(Debug, Clone)]
pub struct FitRequest {
    pub inputs: Vec<PathBuf>,
    pub start: TwoCircleShape,
    pub range: SliceRange,
    pub config: FitConfig,
    pub preload: bool,
    pub monitor: bool,
}

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub result: FitResult,
    pub record: FitRecord,
}

/// Logs per-slice progress.
#[derive(Debug, Default)]
struct LogProgress {
    last_percent: Option<u32>,
}

impl ProgressSink for LogProgress {
    fn report(&mut self, fraction: f64) {
        let percent = (fraction * 100.0).round() as u32;
        if self.last_percent != Some(percent) {
            debug!("progress {percent}%");
            self.last_percent = Some(percent);
        }
    }

    fn slice_finished(&mut self, slice: usize, shape: Option<&TwoCircleShape>) {
        match shape {
            Some(shape) => info!("frame {slice}: {shape}"),
            None => warn!("frame {slice}: no result"),
        }
    }
}

/// Execute the fitting pipeline and return the computed outputs.
pub fn run_fit(request: &FitRequest) -> Result<RunOutput, AppError> {
    // 1) Open the stack (dimensions only, planes decode on demand).
    let files = FileStack::open(&request.inputs)?;

    // 2) Fit every slice of the range.
    let mut progress = LogProgress::default();
    let mut monitor = LogMonitor::default();
    let mut fitter = SliceFitter::new(request.config.clone()).with_progress(&mut progress);
    if request.monitor {
        fitter = fitter.with_monitor(&mut monitor);
    }

    let result = if request.preload {
        let stack = files.preload(request.range);
        fitter.run(&request.start, &stack, request.range)?
    } else {
        fitter.run(&request.start, &files, request.range)?
    };
    drop(fitter);
    if request.monitor {
        debug!("optimizer reported {} improvements", monitor.improvements());
    }

    // 3) Build the portable record.
    let record = FitRecord::from_run(&request.inputs, &request.start, &request.config, &result);

    Ok(RunOutput { result, record })
}
