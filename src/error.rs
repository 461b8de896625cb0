/// Error types for the storage-infiltration simulator
use thiserror::Error;

/// Main error type for simulation, solver and I/O operations
#[derive(Error, Debug)]
pub enum SoakwellError {
    /// The hydrograph has no samples
    #[error("hydrograph has no samples")]
    EmptyHydrograph,

    /// Time and flow series have different lengths
    #[error("hydrograph time and flow lengths differ ({times} != {flows})")]
    LengthMismatch { times: usize, flows: usize },

    /// A sample contains NaN or infinity
    #[error("hydrograph sample {index} is not finite")]
    NonFiniteSample { index: usize },

    /// Time does not strictly increase
    #[error("hydrograph time is not strictly increasing at sample {index}")]
    NonMonotonicTime { index: usize },

    /// Inflow below zero
    #[error("hydrograph flow {value} at sample {index} is negative")]
    NegativeFlow { index: usize, value: f64 },

    /// Geometry that would divide by zero or produce no storage
    #[error("degenerate geometry: {0}")]
    NumericDegeneracy(String),

    /// Soil parameters, quantities or options out of range
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Reading or writing files failed
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse or write CSV data
    #[error("failed to process CSV: {0}")]
    Csv(#[from] csv::Error),

    /// Failed to parse JSON data
    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The solver worker pool could not be started
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Type alias for Results using SoakwellError
pub type Result<T> = std::result::Result<T, SoakwellError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = SoakwellError::NonMonotonicTime { index: 3 };
        assert_eq!(
            err.to_string(),
            "hydrograph time is not strictly increasing at sample 3"
        );
        let err = SoakwellError::NegativeFlow {
            index: 1,
            value: -0.5,
        };
        assert_eq!(
            err.to_string(),
            "hydrograph flow -0.5 at sample 1 is negative"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: SoakwellError = io.into();
        assert!(matches!(err, SoakwellError::Io(_)));
    }
}
