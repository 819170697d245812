//! # lc-data
//!
//! Data access for LoadCast: loads per-series split CSV files and turns the
//! raw load readings into windowed (input, target) pairs with an ordered
//! train/validation split. Window size is a tuned hyperparameter, so
//! windowing happens per evaluation, not at load time.

mod loader;
mod window;

pub use loader::load_series_csv;
pub use window::{make_windows, split_train_val, SplitDataset};
