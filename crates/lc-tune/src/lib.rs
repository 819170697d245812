//! # lc-tune
//!
//! The tuning driver that ties the workspace together: for each load series
//! it opens the progress ledger, verifies the search fingerprint, runs the
//! particle swarm over the feeder hyperparameter bounds with candidate
//! evaluations isolated in disposable worker processes, and retrains the
//! winning combination into a persisted model artifact.

mod driver;

pub use driver::{discover_series, tune_batch, tune_series, TuneConfig, TuneReport};
