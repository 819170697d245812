use lc_types::LcResult;

/// Where in the search an evaluation sits: which particle, which iteration,
/// out of how many. Passed explicitly to every evaluation and progress
/// report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalContext {
    /// 1-based iteration index.
    pub iteration: usize,
    /// 1-based particle index.
    pub particle: usize,
    pub total_iterations: usize,
    pub total_particles: usize,
}

impl EvalContext {
    /// The `(iteration, particle)` identity key this slot is recorded under.
    pub fn key(&self) -> (usize, usize) {
        (self.iteration, self.particle)
    }
}

/// Outcome of evaluating one candidate.
///
/// A failure here is a training failure: non-fatal, scored as worst-possible
/// so the swarm keeps exploring. Fatal conditions (missing data, broken
/// configuration) are `Err` from [`Objective::evaluate`] instead and abort
/// the series.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    Score(f64),
    Failed { reason: String },
}

impl Evaluation {
    /// The scalar the optimizer minimizes.
    pub fn score(&self) -> f64 {
        match self {
            Self::Score(s) => *s,
            Self::Failed { .. } => f64::INFINITY,
        }
    }

    /// The metric to persist, if the evaluation produced one.
    pub fn metric(&self) -> Option<f64> {
        match self {
            Self::Score(s) => Some(*s),
            Self::Failed { .. } => None,
        }
    }
}

/// The function being minimized: train-and-score one candidate position.
pub trait Objective {
    fn evaluate(&mut self, position: &[f64], ctx: &EvalContext) -> LcResult<Evaluation>;
}

/// Receives one report per completed evaluation, success or failure, in
/// strict evaluation order. Implemented by the ledger writer; errors are
/// logged by the optimizer and do not stop the search.
pub trait ProgressSink {
    fn record(
        &mut self,
        ctx: &EvalContext,
        position: &[f64],
        metric: Option<f64>,
    ) -> LcResult<()>;
}

/// A sink that discards all reports.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn record(&mut self, _: &EvalContext, _: &[f64], _: Option<f64>) -> LcResult<()> {
        Ok(())
    }
}
