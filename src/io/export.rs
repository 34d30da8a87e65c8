//! Export per-slice results to CSV.
//!
//! One row per visited slice. Slices without a result keep their frame
//! number and leave every other column empty, so row count always equals the
//! range length.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::{AppError, EXIT_INPUT};
use crate::fit::FitResult;
use crate::models::TwoCircleShape;

const RESULTS_HEADER: &str = "frame,x1,y1,r1,x2,y2,r2,objective,converged";
const TRUTH_HEADER: &str = "frame,x1,y1,r1,x2,y2,r2";

/// Write the results table of a run.
pub fn write_results_csv(path: &Path, result: &FitResult) -> Result<(), AppError> {
    let mut file = create(path)?;
    writeln!(file, "{RESULTS_HEADER}").map_err(write_error)?;

    for (frame, fit) in result.rows() {
        let written = match fit {
            Some(fit) => writeln!(
                file,
                "{frame},{},{:.6},{}",
                shape_columns(&fit.shape),
                fit.value,
                fit.converged
            ),
            None => writeln!(file, "{frame},,,,,,,,"),
        };
        written.map_err(write_error)?;
    }
    Ok(())
}

/// Write known shapes (e.g. the ground truth of a synthetic stack).
pub fn write_truth_csv(path: &Path, rows: &[(usize, TwoCircleShape)]) -> Result<(), AppError> {
    let mut file = create(path)?;
    writeln!(file, "{TRUTH_HEADER}").map_err(write_error)?;
    for (frame, shape) in rows {
        writeln!(file, "{frame},{}", shape_columns(shape)).map_err(write_error)?;
    }
    Ok(())
}

fn shape_columns(shape: &TwoCircleShape) -> String {
    shape
        .parameters()
        .iter()
        .map(|v| format!("{v:.4}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn create(path: &Path) -> Result<File, AppError> {
    File::create(path)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to create export CSV '{}': {e}", path.display())))
}

fn write_error(e: std::io::Error) -> AppError {
    AppError::new(EXIT_INPUT, format!("Failed to write export CSV: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Bounds, SliceRange};
    use crate::fit::SliceFit;

    fn result_with_gap() -> FitResult {
        let fit = |slice: usize, x: f64| SliceFit {
            slice,
            shape: TwoCircleShape::new(x, 30.0, 10.0, 70.0, 70.0, 8.0),
            value: -1.05,
            converged: slice != 5,
            iterations: 4,
            evaluations: 120,
        };
        FitResult {
            range: SliceRange::new(1, 5, 2),
            sample_count: 113,
            bounds: Bounds::from_image_size(100, 100),
            slots: vec![Some(fit(1, 30.0)), None, Some(fit(5, 31.25))],
            skipped: Vec::new(),
            cancelled: false,
        }
    }

    #[test]
    fn results_csv_keeps_one_row_per_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_results_csv(&path, &result_with_gap()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], RESULTS_HEADER);
        assert_eq!(
            lines[1],
            "1,30.0000,30.0000,10.0000,70.0000,70.0000,8.0000,-1.050000,true"
        );
        assert_eq!(lines[2], "3,,,,,,,,");
        assert!(lines[3].starts_with("5,31.2500,"));
        assert!(lines[3].ends_with(",false"));
        assert!(lines.iter().all(|l| l.split(',').count() == 9));
    }

    #[test]
    fn truth_csv_lists_every_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("truth.csv");
        let rows = vec![
            (1, TwoCircleShape::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0)),
            (2, TwoCircleShape::new(2.0, 2.0, 3.0, 5.0, 5.0, 6.0)),
        ];
        write_truth_csv(&path, &rows).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert_eq!(text.lines().nth(2), Some("2,2.0000,2.0000,3.0000,5.0000,5.0000,6.0000"));
    }

    #[test]
    fn unwritable_path_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.csv");
        let err = write_results_csv(&path, &result_with_gap()).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_INPUT);
    }
}
