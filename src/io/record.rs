//! Read/write fit record JSON files.
//!
//! A fit record is the portable summary of a run:
//! - inputs and the starting shape
//! - every setting that influenced the fit
//! - one row per visited slice (absent slices included)

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    Bounds, ErrorPolicy, FitConfig, Interpolation, ObjectiveKind, OptimizationMethod, OptimizerOptions,
    ShapeParameters, SliceRange,
};
use crate::error::{AppError, EXIT_INPUT};
use crate::fit::{FitResult, SkippedSlice};
use crate::models::TwoCircleShape;

pub const TOOL_NAME: &str = "tcfit";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSettings {
    pub objective: ObjectiveKind,
    pub method: OptimizationMethod,
    pub interpolation: Interpolation,
    pub sample_count: usize,
    pub bounds: Bounds,
    pub options: OptimizerOptions,
    pub on_error: ErrorPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordRow {
    pub frame: usize,
    /// `x1, y1, r1, x2, y2, r2`; absent for skipped or unreached slices.
    pub params: Option<ShapeParameters>,
    pub objective: Option<f64>,
    pub converged: Option<bool>,
    pub iterations: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitRecord {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub inputs: Vec<PathBuf>,
    pub start: TwoCircleShape,
    pub range: SliceRange,
    pub settings: RecordSettings,
    pub rows: Vec<RecordRow>,
    pub skipped: Vec<SkippedSlice>,
    pub cancelled: bool,
}

impl FitRecord {
    pub fn from_run(inputs: &[PathBuf], start: &TwoCircleShape, config: &FitConfig, result: &FitResult) -> Self {
        let rows = result
            .rows()
            .map(|(frame, fit)| RecordRow {
                frame,
                params: fit.map(|f| f.shape.parameters()),
                objective: fit.map(|f| f.value),
                converged: fit.map(|f| f.converged),
                iterations: fit.map(|f| f.iterations),
            })
            .collect();

        Self {
            tool: TOOL_NAME.to_string(),
            generated_at: Utc::now(),
            inputs: inputs.to_vec(),
            start: start.clone(),
            range: result.range,
            settings: RecordSettings {
                objective: config.objective,
                method: config.method,
                interpolation: config.interpolation,
                sample_count: result.sample_count,
                bounds: result.bounds,
                options: config.options,
                on_error: config.on_error,
            },
            rows,
            skipped: result.skipped.clone(),
            cancelled: result.cancelled,
        }
    }

    /// Shapes of the rows that have one, with their frame.
    pub fn shapes(&self) -> Vec<(usize, TwoCircleShape)> {
        self.rows
            .iter()
            .filter_map(|r| r.params.map(|p| (r.frame, TwoCircleShape::from_parameters(p))))
            .collect()
    }
}

/// Write a fit record JSON file.
pub fn write_record_json(path: &Path, record: &FitRecord) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to create record JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, record)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to write record JSON: {e}")))?;
    Ok(())
}

/// Read a fit record JSON file.
pub fn read_record_json(path: &Path) -> Result<FitRecord, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to open record JSON '{}': {e}", path.display())))?;
    let record: FitRecord = serde_json::from_reader(file)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Invalid record JSON: {e}")))?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::SliceFit;

    fn result() -> FitResult {
        FitResult {
            range: SliceRange::new(2, 4, 1),
            sample_count: 113,
            bounds: Bounds::from_image_size(100, 100),
            slots: vec![
                Some(SliceFit {
                    slice: 2,
                    shape: TwoCircleShape::new(30.1, 29.9, 10.0, 70.0, 70.2, 8.1),
                    value: -1.0712,
                    converged: true,
                    iterations: 6,
                    evaluations: 310,
                }),
                None,
                None,
            ],
            skipped: vec![SkippedSlice {
                slice: 3,
                reason: "Plane 3 is unavailable: corrupt".to_string(),
            }],
            cancelled: true,
        }
    }

    #[test]
    fn record_survives_a_file_round_trip() {
        let start = TwoCircleShape::new(25.0, 25.0, 12.0, 65.0, 65.0, 10.0);
        let record = FitRecord::from_run(
            &[PathBuf::from("stack/")],
            &start,
            &FitConfig::default(),
            &result(),
        );
        assert_eq!(record.rows.len(), 3);
        assert_eq!(record.rows[1].frame, 3);
        assert!(record.rows[1].params.is_none());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        write_record_json(&path, &record).unwrap();
        let back = read_record_json(&path).unwrap();
        assert_eq!(back, record);
        assert_eq!(back.shapes().len(), 1);
        assert_eq!(back.shapes()[0].0, 2);
    }

    #[test]
    fn enums_serialize_lowercase() {
        let record = FitRecord::from_run(&[], &TwoCircleShape::new(1.0, 1.0, 1.0, 2.0, 2.0, 1.0), &FitConfig::default(), &result());
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"objective\":\"mean\""), "{json}");
        assert!(json.contains("\"on_error\":\"skip\""), "{json}");
        assert!(json.contains("\"tool\":\"tcfit\""));
    }

    #[test]
    fn invalid_json_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = read_record_json(&path).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_INPUT);
        assert!(err.to_string().starts_with("Invalid record JSON"));
    }
}
