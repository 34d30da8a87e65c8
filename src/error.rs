//! Error types.
//!
//! - `AppError` is what the binary reports: an exit code plus a message.
//! - `FitError` is what the fitting library returns. It separates
//!   configuration problems (raised before any image is touched) from
//!   evaluation problems (raised while sampling a plane).

/// Exit code for invalid input, configuration or I/O.
pub const EXIT_INPUT: u8 = 2;
/// Exit code for a failed fit.
pub const EXIT_FIT: u8 = 4;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Invalid setup detected before any evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// `lower[index] > upper[index]`.
    InvalidBounds { index: usize, lower: f64, upper: f64 },
    NonFiniteBound { index: usize },
    /// Radius lower bounds must be `>= 0`.
    NegativeRadiusBound { index: usize, lower: f64 },
    NonPositiveSampleCount,
    /// Start shape parameter is NaN or infinite.
    NonFiniteStart { index: usize },
    EmptySliceRange { start: usize, stop: usize, step: usize },
    SliceOutOfRange { slice: usize, available: usize },
    InvalidOptimizerSetting(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidBounds { index, lower, upper } => write!(
                f,
                "Invalid bounds for parameter {index}: lower={lower} > upper={upper}."
            ),
            ConfigError::NonFiniteBound { index } => {
                write!(f, "Non-finite bound for parameter {index}.")
            }
            ConfigError::NegativeRadiusBound { index, lower } => write!(
                f,
                "Radius lower bound for parameter {index} must be >= 0 (got {lower})."
            ),
            ConfigError::NonPositiveSampleCount => {
                write!(f, "Boundary sample count must be > 0.")
            }
            ConfigError::NonFiniteStart { index } => {
                write!(f, "Start parameter {index} is not finite.")
            }
            ConfigError::EmptySliceRange { start, stop, step } => write!(
                f,
                "Invalid slice range {start}:{stop}:{step} (need 1 <= start <= stop and step >= 1)."
            ),
            ConfigError::SliceOutOfRange { slice, available } => write!(
                f,
                "Slice {slice} is outside the stack (1..={available})."
            ),
            ConfigError::InvalidOptimizerSetting(msg) => write!(f, "Invalid optimizer setting: {msg}"),
        }
    }
}

/// Failure while evaluating the objective on a plane.
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationError {
    /// The plane for `slice` could not be produced (missing file, decode error).
    PlaneUnavailable { slice: usize, reason: String },
    /// Pixel buffer does not match the declared dimensions.
    MalformedPlane { expected: usize, actual: usize },
    EmptyPlane,
    NonFiniteObjective,
}

impl std::fmt::Display for EvaluationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvaluationError::PlaneUnavailable { slice, reason } => {
                write!(f, "Plane {slice} is unavailable: {reason}")
            }
            EvaluationError::MalformedPlane { expected, actual } => write!(
                f,
                "Malformed plane: expected {expected} pixels, got {actual}."
            ),
            EvaluationError::EmptyPlane => write!(f, "Cannot sample an empty plane."),
            EvaluationError::NonFiniteObjective => {
                write!(f, "Objective evaluated to a non-finite value.")
            }
        }
    }
}

/// Library error returned by the fitting core.
#[derive(Debug, Clone, PartialEq)]
pub enum FitError {
    Config(ConfigError),
    Evaluation(EvaluationError),
}

impl FitError {
    pub fn is_config(&self) -> bool {
        matches!(self, FitError::Config(_))
    }
}

impl std::fmt::Display for FitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FitError::Config(e) => write!(f, "{e}"),
            FitError::Evaluation(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for FitError {}

impl From<ConfigError> for FitError {
    fn from(value: ConfigError) -> Self {
        FitError::Config(value)
    }
}

impl From<EvaluationError> for FitError {
    fn from(value: EvaluationError) -> Self {
        FitError::Evaluation(value)
    }
}

impl From<FitError> for AppError {
    fn from(value: FitError) -> Self {
        let code = if value.is_config() { EXIT_INPUT } else { EXIT_FIT };
        AppError::new(code, value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_errors_map_to_exit_codes() {
        let config: AppError = FitError::from(ConfigError::NonPositiveSampleCount).into();
        assert_eq!(config.exit_code(), EXIT_INPUT);

        let eval: AppError = FitError::from(EvaluationError::EmptyPlane).into();
        assert_eq!(eval.exit_code(), EXIT_FIT);
        assert_eq!(eval.to_string(), "Cannot sample an empty plane.");
    }
}
