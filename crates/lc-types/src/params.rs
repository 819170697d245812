//! Hyperparameter vectors and the bounded search space they live in.

use serde::{Deserialize, Serialize};

use crate::errors::{LcError, LcResult};

/// Fixed dimension order of the hyperparameter space:
/// hidden units, learning rate, window size, epochs.
pub const PARAM_DIMENSIONS: usize = 4;

/// One concrete hyperparameter combination for the forecaster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    pub hidden_units: usize,
    pub learning_rate: f64,
    pub window_size: usize,
    pub epochs: usize,
}

impl Hyperparameters {
    /// Decode a particle position into concrete hyperparameters.
    ///
    /// Integer dimensions are truncated, not rounded, so a coordinate of
    /// 79.9 trains with 79 hidden units.
    pub fn from_position(position: &[f64]) -> LcResult<Self> {
        if position.len() != PARAM_DIMENSIONS {
            return Err(LcError::Config(format!(
                "position has {} dimensions, expected {}",
                position.len(),
                PARAM_DIMENSIONS
            )));
        }
        Ok(Self {
            hidden_units: position[0] as usize,
            learning_rate: position[1],
            window_size: position[2] as usize,
            epochs: position[3] as usize,
        })
    }

    /// The position vector this combination corresponds to.
    pub fn to_position(&self) -> Vec<f64> {
        vec![
            self.hidden_units as f64,
            self.learning_rate,
            self.window_size as f64,
            self.epochs as f64,
        ]
    }
}

impl std::fmt::Display for Hyperparameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "hidden_units={} learning_rate={} window_size={} epochs={}",
            self.hidden_units, self.learning_rate, self.window_size, self.epochs
        )
    }
}

/// The search space: an ordered list of `(low, high)` bounds, one per
/// hyperparameter dimension. All particle coordinates stay inside these
/// bounds at all times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchBounds {
    dims: Vec<(f64, f64)>,
}

impl SearchBounds {
    pub fn new(dims: Vec<(f64, f64)>) -> LcResult<Self> {
        if dims.is_empty() {
            return Err(crate::config_error!("search bounds must not be empty"));
        }
        for (d, (low, high)) in dims.iter().enumerate() {
            if !(low.is_finite() && high.is_finite()) || low > high {
                return Err(crate::config_error!(
                    "invalid bound at dimension {d}: ({low}, {high})"
                ));
            }
        }
        Ok(Self { dims })
    }

    /// Default tuning bounds for feeder load forecasting:
    /// hidden units [20, 80], learning rate [0.0005, 0.003],
    /// window size [7, 14], epochs [10, 30].
    pub fn feeder_default() -> Self {
        Self {
            dims: vec![(20.0, 80.0), (0.0005, 0.003), (7.0, 14.0), (10.0, 30.0)],
        }
    }

    pub fn len(&self) -> usize {
        self.dims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dims.is_empty()
    }

    pub fn low(&self, dim: usize) -> f64 {
        self.dims[dim].0
    }

    pub fn high(&self, dim: usize) -> f64 {
        self.dims[dim].1
    }

    pub fn iter(&self) -> impl Iterator<Item = &(f64, f64)> {
        self.dims.iter()
    }

    /// Clip a coordinate back into its dimension's bound.
    pub fn clip(&self, dim: usize, value: f64) -> f64 {
        let (low, high) = self.dims[dim];
        value.clamp(low, high)
    }

    /// The coordinate-wise lower bound, used as the fallback result when a
    /// search completes without evaluating anything.
    pub fn lower_corner(&self) -> Vec<f64> {
        self.dims.iter().map(|(low, _)| *low).collect()
    }

    pub fn contains(&self, position: &[f64]) -> bool {
        position.len() == self.dims.len()
            && position
                .iter()
                .zip(self.dims.iter())
                .all(|(v, (low, high))| *v >= *low && *v <= *high)
    }
}
