//! The isolated-evaluation boundary.

use lc_data::SplitDataset;
use lc_swarm::{EvalContext, Evaluation};
use lc_types::{Hyperparameters, LcError, LcResult};
use tracing::debug;

use crate::trainer::{SgdTrainer, Trainer};

/// Runs exactly one candidate evaluation: train on the training split, score
/// on the validation split.
///
/// Implementations differ in where the work happens. The contract is the
/// same everywhere: training failures come back as `Evaluation::Failed`
/// (worst-possible score, search continues); data faults come back as `Err`
/// (fatal to the series).
pub trait Evaluator {
    fn evaluate(&mut self, params: &Hyperparameters, ctx: &EvalContext) -> LcResult<Evaluation>;
}

/// Evaluates candidates in the calling process.
///
/// No memory isolation: suitable for tests and short runs, and for the
/// driver's final keeper retrain. Holds the raw series and windows it per
/// candidate, since window size is itself a tuned dimension.
pub struct InProcessEvaluator {
    series: Vec<f64>,
    val_fraction: f64,
    trainer: SgdTrainer,
}

impl InProcessEvaluator {
    pub fn new(series: Vec<f64>, val_fraction: f64, trainer: SgdTrainer) -> Self {
        Self {
            series,
            val_fraction,
            trainer,
        }
    }
}

impl Evaluator for InProcessEvaluator {
    fn evaluate(&mut self, params: &Hyperparameters, ctx: &EvalContext) -> LcResult<Evaluation> {
        let split = match SplitDataset::prepare(&self.series, params.window_size, self.val_fraction)
        {
            Ok(split) => split,
            // A split that fails for one candidate's window size is that
            // candidate's failure, not a series-level data fault.
            Err(LcError::Data(e)) => {
                return Ok(Evaluation::Failed {
                    reason: format!("windowing failed: {e}"),
                })
            }
            Err(e) => return Err(e),
        };

        debug!(
            "Evaluating slot ({}, {}) in-process: {params}",
            ctx.iteration, ctx.particle
        );

        match self.trainer.evaluate(&split, params) {
            Ok(outcome) => Ok(Evaluation::Score(outcome.mape)),
            Err(e) => Ok(Evaluation::Failed {
                reason: e.to_string(),
            }),
        }
    }
}
