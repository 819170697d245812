use thiserror::Error;

/// Main error type for the LoadCast system
#[derive(Error, Debug)]
pub enum LcError {
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Training error: {0}")]
    Training(#[from] TrainingError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Data-related errors. Fatal to the series they occur in: the driver logs
/// them and moves on to the next series, never retrying the search.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Split file not found: {path}")]
    SplitNotFound { path: String },

    #[error("Missing column '{column}' in {path}")]
    MissingColumn { column: String, path: String },

    #[error("Series {series} is empty after loading")]
    EmptySeries { series: String },

    #[error("Insufficient data: need at least {needed} points, have {available}")]
    InsufficientData { needed: usize, available: usize },

    #[error("Data parsing error: {message}")]
    ParseError { message: String },
}

/// Training-related failures. Non-fatal to the search: the optimizer scores
/// the candidate as worst-possible and keeps exploring.
#[derive(Error, Debug)]
pub enum TrainingError {
    #[error("Training diverged: {message}")]
    Diverged { message: String },

    #[error("Degenerate validation split: {message}")]
    DegenerateSplit { message: String },

    #[error("Evaluation worker failed: {message}")]
    WorkerFailed { message: String },

    #[error("Evaluation timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Worker protocol error: {message}")]
    Protocol { message: String },
}

/// Progress-ledger errors
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error(
        "Search configuration does not match the existing progress ledger \
         (recorded: {recorded}, requested: {requested}); refusing to resume"
    )]
    FingerprintMismatch { recorded: String, requested: String },

    #[error("Ledger write failed for {path}: {message}")]
    WriteFailed { path: String, message: String },
}

/// Result type alias for LoadCast operations
pub type LcResult<T> = Result<T, LcError>;

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::errors::LcError::Config(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = DataError::InsufficientData {
            needed: 20,
            available: 7,
        };

        assert!(error.to_string().contains("at least 20"));
        assert!(error.to_string().contains("have 7"));
    }

    #[test]
    fn test_error_conversion() {
        let data_error = DataError::EmptySeries {
            series: "FDR01_day".to_string(),
        };
        let lc_error: LcError = data_error.into();

        match lc_error {
            LcError::Data(_) => (),
            _ => panic!("Expected Data error"),
        }
    }

    #[test]
    fn test_training_and_data_errors_stay_distinct() {
        // The search treats these differently: one aborts the series, the
        // other is scored as worst-case and skipped over.
        let training: LcError = TrainingError::Timeout { seconds: 600 }.into();
        let data: LcError = DataError::SplitNotFound {
            path: "data/split/FDR01_day.csv".to_string(),
        }
        .into();

        assert!(matches!(training, LcError::Training(_)));
        assert!(matches!(data, LcError::Data(_)));
    }

    #[test]
    fn test_config_macro() {
        let err = config_error!("Invalid bound at dimension {}", 2);
        assert!(err.to_string().contains("dimension 2"));
    }
}
