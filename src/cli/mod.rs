//! Command-line parsing for the two-circle fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the fitting code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::{
    ErrorPolicy, Interpolation, ObjectiveKind, OptimizationMethod, ShapeParameters, SliceRange, parse_parameters,
};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "tcfit", version, about = "Two-circle shape fitter for image stacks")]
pub struct Cli {
    /// Log at debug level (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit two circles across the slices of an image stack.
    Fit(FitArgs),
    /// Write a synthetic stack of PNG slices (plus its ground truth).
    Synth(SynthArgs),
    /// Print a fit record written by `tcfit fit --export-json`.
    Show(ShowArgs),
}

/// Options for fitting.
#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// Image files or directories of images; each image is one slice.
    #[arg(short, long = "input", value_name = "PATH", required = true, num_args = 1..)]
    pub inputs: Vec<PathBuf>,

    /// Starting shape as x1,y1,r1,x2,y2,r2 (pixels).
    #[arg(short, long, value_parser = parse_parameters, allow_hyphen_values = true)]
    pub start: ShapeParameters,

    /// Slices to fit as start:stop[:step] (1-based, inclusive).
    #[arg(long, default_value = "1")]
    pub slices: SliceRange,

    /// Statistic optimized along the boundary.
    #[arg(long, value_enum, default_value_t = ObjectiveKind::Mean)]
    pub objective: ObjectiveKind,

    /// Direct-search method.
    #[arg(long, value_enum, default_value_t = OptimizationMethod::ConjugateDirection)]
    pub method: OptimizationMethod,

    /// Sub-pixel sampling.
    #[arg(long, value_enum, default_value_t = Interpolation::Bilinear)]
    pub interp: Interpolation,

    /// Boundary sample count (default: perimeter of the starting shape).
    #[arg(long)]
    pub samples: Option<usize>,

    /// Lower bounds as x1,y1,r1,x2,y2,r2 (default: 0).
    #[arg(long, value_parser = parse_parameters, requires = "upper", allow_hyphen_values = true)]
    pub lower: Option<ShapeParameters>,

    /// Upper bounds as x1,y1,r1,x2,y2,r2 (default: image size).
    #[arg(long, value_parser = parse_parameters, requires = "lower", allow_hyphen_values = true)]
    pub upper: Option<ShapeParameters>,

    /// Iteration cap per slice.
    #[arg(long, default_value_t = 200)]
    pub max_iter: usize,

    /// Objective evaluation cap per slice.
    #[arg(long, default_value_t = 20_000)]
    pub max_evals: usize,

    /// Relative convergence tolerance on the objective.
    #[arg(long, default_value_t = 1e-6)]
    pub tol: f64,

    /// What to do with a slice that cannot be evaluated.
    #[arg(long, value_enum, default_value_t = ErrorPolicy::Skip)]
    pub on_error: ErrorPolicy,

    /// Decode the requested slices up front (in parallel) instead of per slice.
    #[arg(long)]
    pub preload: bool,

    /// Log every improvement found by the optimizer (debug level).
    #[arg(long)]
    pub monitor: bool,

    /// Export per-slice results to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export the fit record (settings + per-slice results) to JSON.
    #[arg(long = "export-json")]
    pub export_json: Option<PathBuf>,
}

/// Options for writing a synthetic stack.
#[derive(Debug, Parser, Clone)]
pub struct SynthArgs {
    /// Output directory.
    #[arg(long, value_name = "DIR")]
    pub out: PathBuf,

    /// Number of slices.
    #[arg(long, default_value_t = 5)]
    pub slices: usize,

    /// Plane width (pixels).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plane height (pixels).
    #[arg(long, default_value_t = 100)]
    pub height: usize,

    /// Shape on slice 1 as x1,y1,r1,x2,y2,r2.
    #[arg(long, value_parser = parse_parameters, default_value = "30,30,10,70,70,8")]
    pub start: ShapeParameters,

    /// Per-slice translation of both centers as dx,dy.
    #[arg(long, value_parser = parse_drift, default_value = "0,0", allow_hyphen_values = true)]
    pub drift: (f64, f64),

    /// Rim width (Gaussian sigma, pixels).
    #[arg(long, default_value_t = 2.5)]
    pub sigma: f64,

    /// Standard deviation of additive Gaussian noise.
    #[arg(long, default_value_t = 0.0)]
    pub noise: f64,

    /// Noise seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Options for printing a saved record.
#[derive(Debug, Parser)]
pub struct ShowArgs {
    /// Record JSON produced by `tcfit fit --export-json`.
    #[arg(long, value_name = "JSON")]
    pub record: PathBuf,
}

/// Parse `dx,dy`.
pub fn parse_drift(s: &str) -> Result<(f64, f64), String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    match parts.as_slice() {
        [dx, dy] => {
            let dx = dx.parse::<f64>().map_err(|_| format!("Invalid drift '{s}'."))?;
            let dy = dy.parse::<f64>().map_err(|_| format!("Invalid drift '{s}'."))?;
            Ok((dx, dy))
        }
        _ => Err(format!("Invalid drift '{s}' (expected dx,dy).")),
    }
}
