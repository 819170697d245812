//! # lc-eval
//!
//! The evaluation side of the tuning loop: the [`Trainer`] contract, a
//! baseline window-MLP forecaster, and the isolated-evaluation boundary.
//!
//! Training numeric stacks are known to retain memory across repeated
//! invocations in one long-lived process, so the production path runs each
//! candidate in a disposable worker process ([`SubprocessEvaluator`]) whose
//! memory the OS reclaims on exit. [`InProcessEvaluator`] provides the same
//! contract without the process boundary for tests and quick runs.

mod evaluator;
mod model;
mod subprocess;
mod trainer;
pub mod worker;

pub use evaluator::{Evaluator, InProcessEvaluator};
pub use model::WindowMlp;
pub use subprocess::SubprocessEvaluator;
pub use trainer::{SgdTrainer, TrainOutcome, Trainer};
