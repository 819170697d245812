//! # lc-swarm
//!
//! Particle Swarm Optimization over a bounded hyperparameter space, built
//! for long, interruptible searches: the optimizer consults a set of
//! already-completed `(iteration, particle)` slots to skip finished work and
//! reports every new evaluation to a progress sink as it happens.
//!
//! The optimizer knows nothing about models or ledgers: evaluation and
//! persistence sit behind the [`Objective`] and [`ProgressSink`] seams.

mod context;
mod pso;

pub use context::{EvalContext, Evaluation, NullSink, Objective, ProgressSink};
pub use pso::{SwarmConfig, SwarmOptimizer, SwarmRun};
