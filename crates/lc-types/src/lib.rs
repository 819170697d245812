//! # lc-types
//!
//! Shared domain types for LoadCast: hyperparameters and search bounds,
//! series identity, and the error taxonomy used across the workspace.

pub mod errors;
pub mod params;
pub mod series;

pub use errors::{DataError, LcError, LcResult, LedgerError, TrainingError};
pub use params::{Hyperparameters, SearchBounds, PARAM_DIMENSIONS};
pub use series::{DayCategory, SeriesId};
