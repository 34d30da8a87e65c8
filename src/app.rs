//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - runs the slice fit over the input stack
//! - prints the summary and results table
//! - writes optional exports

use clap::Parser;
use log::info;

use crate::cli::{Command, FitArgs, ShowArgs, SynthArgs};
use crate::data::SyntheticStack;
use crate::domain::{Bounds, FitConfig, OptimizerOptions};
use crate::error::{AppError, EXIT_FIT};
use crate::models::TwoCircleShape;

pub mod pipeline;

/// Entry point for the `tcfit` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Synth(args) => handle_synth(args),
        Command::Show(args) => handle_show(args),
    }
}

/// `info` by default, `debug` with `-v`; `RUST_LOG` overrides both.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .try_init();
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args);
    let request = pipeline::FitRequest {
        inputs: args.inputs.clone(),
        start: TwoCircleShape::from_parameters(args.start),
        range: args.slices,
        config,
        preload: args.preload,
        monitor: args.monitor,
    };
    let run = pipeline::run_fit(&request)?;

    println!("{}", crate::report::format_run_summary(&run.record));
    println!("{}", crate::report::format_results_table(&run.record.rows));

    // Optional exports.
    if let Some(path) = &args.export {
        crate::io::export::write_results_csv(path, &run.result)?;
        info!("wrote {}", path.display());
    }
    if let Some(path) = &args.export_json {
        crate::io::record::write_record_json(path, &run.record)?;
        info!("wrote {}", path.display());
    }

    if run.result.fitted() == 0 && !run.result.cancelled {
        return Err(AppError::new(EXIT_FIT, "No slice could be fitted."));
    }
    Ok(())
}

fn handle_synth(args: SynthArgs) -> Result<(), AppError> {
    let synth = SyntheticStack {
        drift: args.drift,
        sigma: args.sigma,
        noise: args.noise,
        seed: args.seed,
        ..SyntheticStack::new(
            args.width,
            args.height,
            args.slices,
            TwoCircleShape::from_parameters(args.start),
        )
    };
    let stack = synth.render()?;

    let hi = (synth.background + synth.amplitude + 3.0 * synth.noise) as f32;
    let written = crate::io::stack::write_png_stack(&args.out, &stack, 0.0, hi)?;
    let truth_path = args.out.join("truth.csv");
    crate::io::export::write_truth_csv(&truth_path, &synth.truth())?;

    println!(
        "Wrote {} slice(s) of {}x{} to {} (truth: {})",
        written.len(),
        args.width,
        args.height,
        args.out.display(),
        truth_path.display()
    );
    Ok(())
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    let record = crate::io::record::read_record_json(&args.record)?;
    println!("{}", crate::report::format_run_summary(&record));
    println!("{}", crate::report::format_results_table(&record.rows));
    Ok(())
}

pub fn fit_config_from_args(args: &FitArgs) -> FitConfig {
    FitConfig {
        objective: args.objective,
        method: args.method,
        interpolation: args.interp,
        sample_count: args.samples,
        bounds: args.lower.zip(args.upper).map(|(lower, upper)| Bounds::new(lower, upper)),
        options: OptimizerOptions {
            max_iterations: args.max_iter,
            max_evaluations: args.max_evals,
            tolerance: args.tol,
            ..OptimizerOptions::default()
        },
        on_error: args.on_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use crate::domain::{ErrorPolicy, OptimizationMethod};

    fn fit_args(extra: &[&str]) -> FitArgs {
        let mut argv = vec!["tcfit", "fit", "-i", "stack", "--start", "25,25,12,65,65,10"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Fit(args) => args,
            other => panic!("expected fit, got {other:?}"),
        }
    }

    #[test]
    fn config_defaults_follow_the_cli_defaults() {
        let config = fit_config_from_args(&fit_args(&[]));
        assert_eq!(config, FitConfig::default());
    }

    #[test]
    fn config_carries_bounds_and_caps() {
        let config = fit_config_from_args(&fit_args(&[
            "--lower", "0,0,1,0,0,1", "--upper", "100,100,50,100,100,50", "--max-iter", "50", "--samples", "64",
            "--method", "orthogonal-search", "--on-error", "abort",
        ]));
        let bounds = config.bounds.unwrap();
        assert_eq!(bounds.lower[2], 1.0);
        assert_eq!(bounds.upper[5], 50.0);
        assert_eq!(config.options.max_iterations, 50);
        assert_eq!(config.sample_count, Some(64));
        assert_eq!(config.method, OptimizationMethod::OrthogonalSearch);
        assert_eq!(config.on_error, ErrorPolicy::Abort);
    }
}
