//! The baseline forecaster: a one-hidden-layer MLP over a sliding window.

use std::path::Path;

use lc_types::LcResult;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A window-to-next-value forecaster.
///
/// Inputs and targets are min-max scaled with the range fitted on the
/// training split; `predict` takes and returns raw load values. The whole
/// model serializes to JSON, which is the persisted artifact format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowMlp {
    pub window_size: usize,
    pub hidden_units: usize,
    /// Hidden-layer weights, `hidden_units` rows of `window_size` columns.
    w1: Vec<Vec<f64>>,
    b1: Vec<f64>,
    /// Output weights, one per hidden unit.
    w2: Vec<f64>,
    b2: f64,
    scale_min: f64,
    scale_max: f64,
}

impl WindowMlp {
    pub fn new<R: Rng>(window_size: usize, hidden_units: usize, rng: &mut R) -> Self {
        let limit = 1.0 / (window_size as f64).sqrt();
        let w1 = (0..hidden_units)
            .map(|_| (0..window_size).map(|_| rng.gen_range(-limit..limit)).collect())
            .collect();
        let out_limit = 1.0 / (hidden_units as f64).sqrt();
        let w2 = (0..hidden_units).map(|_| rng.gen_range(-out_limit..out_limit)).collect();
        Self {
            window_size,
            hidden_units,
            w1,
            b1: vec![0.0; hidden_units],
            w2,
            b2: 0.0,
            scale_min: 0.0,
            scale_max: 1.0,
        }
    }

    /// Fit the min-max scaling range on the training series values.
    pub fn fit_scaling(&mut self, values: impl Iterator<Item = f64>) {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in values {
            min = min.min(v);
            max = max.max(v);
        }
        if min.is_finite() && max.is_finite() && max > min {
            self.scale_min = min;
            self.scale_max = max;
        }
    }

    fn scale(&self, v: f64) -> f64 {
        (v - self.scale_min) / (self.scale_max - self.scale_min)
    }

    fn unscale(&self, v: f64) -> f64 {
        v * (self.scale_max - self.scale_min) + self.scale_min
    }

    /// Forward pass in scaled space: hidden activations and the output.
    fn forward_scaled(&self, window_scaled: &[f64]) -> (Vec<f64>, f64) {
        let hidden: Vec<f64> = self
            .w1
            .iter()
            .zip(self.b1.iter())
            .map(|(row, b)| {
                let z: f64 = row.iter().zip(window_scaled).map(|(w, x)| w * x).sum::<f64>() + b;
                z.tanh()
            })
            .collect();
        let output =
            self.w2.iter().zip(hidden.iter()).map(|(w, h)| w * h).sum::<f64>() + self.b2;
        (hidden, output)
    }

    /// Predict the next load value from the last `window_size` readings.
    pub fn predict(&self, window: &[f64]) -> f64 {
        let scaled: Vec<f64> = window.iter().map(|v| self.scale(*v)).collect();
        let (_, output) = self.forward_scaled(&scaled);
        self.unscale(output)
    }

    /// One SGD step on a single (window, target) pair, both in raw units.
    /// Returns the squared error in scaled space.
    pub(crate) fn sgd_step(&mut self, window: &[f64], target: f64, learning_rate: f64) -> f64 {
        let x: Vec<f64> = window.iter().map(|v| self.scale(*v)).collect();
        let y = self.scale(target);
        let (hidden, output) = self.forward_scaled(&x);

        let err = output - y;
        for (j, h) in hidden.iter().enumerate() {
            let grad_out = err * h;
            let grad_hidden = err * self.w2[j] * (1.0 - h * h);
            self.w2[j] -= learning_rate * grad_out;
            self.b1[j] -= learning_rate * grad_hidden;
            for (w, xv) in self.w1[j].iter_mut().zip(x.iter()) {
                *w -= learning_rate * grad_hidden * xv;
            }
        }
        self.b2 -= learning_rate * err;

        err * err
    }

    /// Persist the model artifact as pretty-printed JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> LcResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> LcResult<Self> {
        Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
    }
}
