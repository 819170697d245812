//! Training and scoring of one hyperparameter candidate.

use lc_data::SplitDataset;
use lc_types::{Hyperparameters, TrainingError};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::model::WindowMlp;

/// Result of training one candidate: the validation metrics and the trained
/// artifact.
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    /// Mean absolute percentage error on the validation split, in percent.
    pub mape: f64,
    /// Mean absolute error on the validation split, in raw load units.
    pub mae: f64,
    pub model: WindowMlp,
}

/// The training collaborator the tuning core depends on. Implementations
/// train a model on the training split and score it on the validation split;
/// the tuner never looks inside the model.
pub trait Trainer {
    fn evaluate(
        &self,
        split: &SplitDataset,
        params: &Hyperparameters,
    ) -> Result<TrainOutcome, TrainingError>;
}

/// Per-sample SGD trainer for [`WindowMlp`], seeded for reproducible weight
/// initialization.
#[derive(Debug, Clone)]
pub struct SgdTrainer {
    pub seed: u64,
}

impl SgdTrainer {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl Trainer for SgdTrainer {
    fn evaluate(
        &self,
        split: &SplitDataset,
        params: &Hyperparameters,
    ) -> Result<TrainOutcome, TrainingError> {
        if params.hidden_units == 0 || params.epochs == 0 || params.window_size == 0 {
            return Err(TrainingError::Diverged {
                message: format!("degenerate hyperparameters: {params}"),
            });
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut model = WindowMlp::new(params.window_size, params.hidden_units, &mut rng);
        model.fit_scaling(
            split
                .x_train
                .iter()
                .flatten()
                .copied()
                .chain(split.y_train.iter().copied()),
        );

        // Keep the weights of the best validation epoch, so a run that
        // overfits late still reports its best achievable score.
        let mut best_model = model.clone();
        let mut best_val_mae = f64::INFINITY;

        for epoch in 1..=params.epochs {
            let mut loss = 0.0;
            for (window, target) in split.x_train.iter().zip(split.y_train.iter()) {
                loss += model.sgd_step(window, *target, params.learning_rate);
            }
            if !loss.is_finite() {
                return Err(TrainingError::Diverged {
                    message: format!("non-finite training loss at epoch {epoch}"),
                });
            }

            let (_, val_mae) = score(&model, split);
            if val_mae < best_val_mae {
                best_val_mae = val_mae;
                best_model = model.clone();
            }
            debug!(
                "epoch {epoch}/{}: train_loss={:.6} val_mae={:.4}",
                params.epochs,
                loss / split.train_len().max(1) as f64,
                val_mae
            );
        }

        let (mape, mae) = score(&best_model, split);
        if !mape.is_finite() {
            return Err(TrainingError::DegenerateSplit {
                message: "validation targets are all zero; MAPE undefined".to_string(),
            });
        }

        Ok(TrainOutcome {
            mape,
            mae,
            model: best_model,
        })
    }
}

/// Validation MAPE (zero targets masked out) and MAE.
fn score(model: &WindowMlp, split: &SplitDataset) -> (f64, f64) {
    let mut abs_err_sum = 0.0;
    let mut pct_err_sum = 0.0;
    let mut pct_count = 0usize;

    for (window, target) in split.x_val.iter().zip(split.y_val.iter()) {
        let pred = model.predict(window);
        abs_err_sum += (target - pred).abs();
        if *target != 0.0 {
            pct_err_sum += ((target - pred) / target).abs();
            pct_count += 1;
        }
    }

    let mae = abs_err_sum / split.val_len().max(1) as f64;
    let mape = if pct_count > 0 {
        pct_err_sum / pct_count as f64 * 100.0
    } else {
        f64::INFINITY
    };
    (mape, mae)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_series(len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| 100.0 + 15.0 * (i as f64 * std::f64::consts::TAU / 7.0).sin())
            .collect()
    }

    fn sample_params() -> Hyperparameters {
        Hyperparameters {
            hidden_units: 16,
            learning_rate: 0.02,
            window_size: 7,
            epochs: 15,
        }
    }

    #[test]
    fn training_produces_finite_metrics() {
        let series = sine_series(90);
        let split = SplitDataset::prepare(&series, 7, 0.2).unwrap();
        let outcome = SgdTrainer::new(42).evaluate(&split, &sample_params()).unwrap();

        assert!(outcome.mape.is_finite() && outcome.mape >= 0.0);
        assert!(outcome.mae.is_finite() && outcome.mae >= 0.0);
        assert_eq!(outcome.model.window_size, 7);
        assert_eq!(outcome.model.hidden_units, 16);
    }

    #[test]
    fn training_is_reproducible_for_a_seed() {
        let series = sine_series(60);
        let split = SplitDataset::prepare(&series, 7, 0.2).unwrap();
        let params = sample_params();

        let a = SgdTrainer::new(7).evaluate(&split, &params).unwrap();
        let b = SgdTrainer::new(7).evaluate(&split, &params).unwrap();
        assert_eq!(a.mape, b.mape);
        assert_eq!(a.model, b.model);
    }

    #[test]
    fn all_zero_validation_targets_are_a_training_failure() {
        // MAPE is undefined when every validation target is zero; the
        // candidate fails rather than reporting a meaningless score.
        let mut series = sine_series(40);
        for v in series.iter_mut().skip(33) {
            *v = 0.0;
        }
        let split = SplitDataset::prepare(&series, 7, 0.2).unwrap();
        let err = SgdTrainer::new(1).evaluate(&split, &sample_params()).unwrap_err();
        assert!(matches!(err, TrainingError::DegenerateSplit { .. }));
    }

    #[test]
    fn degenerate_hyperparameters_fail_fast() {
        let series = sine_series(40);
        let split = SplitDataset::prepare(&series, 7, 0.2).unwrap();
        let params = Hyperparameters {
            hidden_units: 0,
            ..sample_params()
        };
        assert!(SgdTrainer::new(1).evaluate(&split, &params).is_err());
    }
}
