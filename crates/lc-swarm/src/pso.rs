//! The Particle Swarm Optimization loop.

use std::collections::HashSet;

use lc_types::{config_error, LcResult, SearchBounds};
use rand::Rng;
use tracing::{debug, warn};

use crate::context::{EvalContext, Objective, ProgressSink};

/// Swarm shape and movement coefficients.
#[derive(Debug, Clone, PartialEq)]
pub struct SwarmConfig {
    pub particles: usize,
    pub iterations: usize,
    /// Weight of a particle's previous velocity.
    pub inertia: f64,
    /// Pull toward the particle's own best-known position.
    pub cognitive: f64,
    /// Pull toward the swarm's best-known position.
    pub social: f64,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            particles: 10,
            iterations: 20,
            inertia: 0.5,
            cognitive: 1.5,
            social: 2.0,
        }
    }
}

impl SwarmConfig {
    pub fn with_particles(mut self, n: usize) -> Self {
        self.particles = n;
        self
    }

    pub fn with_iterations(mut self, n: usize) -> Self {
        self.iterations = n;
        self
    }

    pub fn with_coefficients(mut self, inertia: f64, cognitive: f64, social: f64) -> Self {
        self.inertia = inertia;
        self.cognitive = cognitive;
        self.social = social;
        self
    }
}

/// One candidate solution: where it is, where it is headed, and the best it
/// has ever scored.
#[derive(Debug, Clone)]
struct Particle {
    position: Vec<f64>,
    velocity: Vec<f64>,
    best_position: Vec<f64>,
    best_score: f64,
}

/// Result of a completed search.
#[derive(Debug, Clone, PartialEq)]
pub struct SwarmRun {
    pub best_position: Vec<f64>,
    /// `+inf` when nothing scored finitely (full resume or all failures).
    pub best_score: f64,
    /// True when every slot was already in the completed set and no new
    /// evaluation ran.
    pub fully_resumed: bool,
    pub evaluated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Sequential PSO minimizer with ledger-driven resume.
///
/// Slots are visited in fixed nested order (iterations outer, particles
/// inner, both 1-based); a slot whose key is in the completed set is skipped
/// without moving the particle, changing its velocity, or consuming random
/// draws.
#[derive(Debug, Clone)]
pub struct SwarmOptimizer {
    config: SwarmConfig,
}

impl SwarmOptimizer {
    pub fn new(config: SwarmConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SwarmConfig {
        &self.config
    }

    /// Run the search to completion and return the best position found.
    ///
    /// `Err` from the objective (a data fault) aborts the search; a
    /// `Failed` evaluation scores worst-possible and the search continues.
    /// Sink errors are logged and otherwise ignored; a missed checkpoint
    /// only degrades resume precision.
    pub fn run<R: Rng>(
        &self,
        bounds: &SearchBounds,
        completed: &HashSet<(usize, usize)>,
        objective: &mut dyn Objective,
        sink: &mut dyn ProgressSink,
        rng: &mut R,
    ) -> LcResult<SwarmRun> {
        if self.config.particles == 0 || self.config.iterations == 0 {
            return Err(config_error!(
                "swarm needs at least one particle and one iteration"
            ));
        }

        let dims = bounds.len();

        // Initialize: uniform positions inside the bounds, zero velocities,
        // personal bests at the starting positions with worst-case scores.
        let mut particles: Vec<Particle> = (0..self.config.particles)
            .map(|_| {
                let position: Vec<f64> = (0..dims)
                    .map(|d| bounds.low(d) + rng.gen::<f64>() * (bounds.high(d) - bounds.low(d)))
                    .collect();
                Particle {
                    velocity: vec![0.0; dims],
                    best_position: position.clone(),
                    best_score: f64::INFINITY,
                    position,
                }
            })
            .collect();

        let mut global_best: Option<Vec<f64>> = None;
        let mut global_best_score = f64::INFINITY;
        let mut evaluated = 0usize;
        let mut skipped = 0usize;
        let mut failed = 0usize;

        for t in 1..=self.config.iterations {
            for i in 1..=self.config.particles {
                let ctx = EvalContext {
                    iteration: t,
                    particle: i,
                    total_iterations: self.config.iterations,
                    total_particles: self.config.particles,
                };

                if completed.contains(&ctx.key()) {
                    debug!("Skipping slot ({t}, {i}): already completed");
                    skipped += 1;
                    continue;
                }

                let evaluation = objective.evaluate(&particles[i - 1].position, &ctx)?;
                evaluated += 1;
                let score = evaluation.score();
                if !score.is_finite() {
                    failed += 1;
                    warn!("Evaluation failed for slot ({t}, {i}); scoring as worst-case");
                }

                // Move only on a finite score; a failed candidate stays put
                // so a later iteration can try again from the same spot.
                if score.is_finite() {
                    let particle = &mut particles[i - 1];
                    for d in 0..dims {
                        let r1: f64 = rng.gen();
                        let r2: f64 = rng.gen();
                        let cognitive = self.config.cognitive
                            * r1
                            * (particle.best_position[d] - particle.position[d]);
                        let social = match &global_best {
                            Some(best) => {
                                self.config.social * r2 * (best[d] - particle.position[d])
                            }
                            None => 0.0,
                        };
                        particle.velocity[d] =
                            self.config.inertia * particle.velocity[d] + cognitive + social;
                        particle.position[d] =
                            bounds.clip(d, particle.position[d] + particle.velocity[d]);
                    }
                }

                if let Err(e) = sink.record(&ctx, &particles[i - 1].position, evaluation.metric())
                {
                    warn!("Progress checkpoint failed for slot ({t}, {i}): {e}");
                }

                // Strictly-less comparisons: equal scores never displace an
                // incumbent best.
                let particle = &mut particles[i - 1];
                if score < particle.best_score {
                    particle.best_position = particle.position.clone();
                    particle.best_score = score;
                    if score < global_best_score {
                        debug!("New global best {score:.4} at slot ({t}, {i})");
                        global_best = Some(particle.position.clone());
                        global_best_score = score;
                    }
                }
            }
        }

        let total = self.config.iterations * self.config.particles;
        let fully_resumed = skipped == total;
        let (best_position, best_score) = match global_best {
            Some(position) => (position, global_best_score),
            None => {
                if fully_resumed {
                    warn!(
                        "All {total} slots were already completed; nothing evaluated \
                         (full resume), returning lower search bounds"
                    );
                } else {
                    warn!("No evaluation produced a finite score; returning lower search bounds");
                }
                (bounds.lower_corner(), f64::INFINITY)
            }
        };

        Ok(SwarmRun {
            best_position,
            best_score,
            fully_resumed,
            evaluated,
            skipped,
            failed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Evaluation, NullSink};
    use lc_types::{DataError, LcError};
    use rand::rngs::mock::StepRng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// Minimizes the coordinate sum and counts invocations.
    struct SumObjective {
        calls: usize,
    }

    impl SumObjective {
        fn new() -> Self {
            Self { calls: 0 }
        }
    }

    impl Objective for SumObjective {
        fn evaluate(&mut self, position: &[f64], _ctx: &EvalContext) -> LcResult<Evaluation> {
            self.calls += 1;
            Ok(Evaluation::Score(position.iter().sum()))
        }
    }

    struct RecordingSink {
        records: Vec<((usize, usize), Vec<f64>, Option<f64>)>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self { records: Vec::new() }
        }
    }

    impl ProgressSink for RecordingSink {
        fn record(
            &mut self,
            ctx: &EvalContext,
            position: &[f64],
            metric: Option<f64>,
        ) -> LcResult<()> {
            self.records.push((ctx.key(), position.to_vec(), metric));
            Ok(())
        }
    }

    fn optimizer(particles: usize, iterations: usize) -> SwarmOptimizer {
        SwarmOptimizer::new(
            SwarmConfig::default()
                .with_particles(particles)
                .with_iterations(iterations),
        )
    }

    #[test]
    fn deterministic_scenario_with_zero_rng() {
        // A zero-step mock RNG pins every draw at 0.0: both particles start
        // at the lower corner, velocities stay zero, and the first particle
        // claims the global best.
        let bounds = SearchBounds::new(vec![(0.0, 10.0), (0.0, 10.0)]).unwrap();
        let mut objective = SumObjective::new();
        let mut sink = RecordingSink::new();
        let mut rng = StepRng::new(0, 0);

        let run = optimizer(2, 1)
            .run(&bounds, &HashSet::new(), &mut objective, &mut sink, &mut rng)
            .unwrap();

        assert_eq!(run.best_position, vec![0.0, 0.0]);
        assert_eq!(run.best_score, 0.0);
        assert_eq!(run.evaluated, 2);
        assert_eq!(run.failed, 0);
        assert!(!run.fully_resumed);

        let keys: Vec<_> = sink.records.iter().map(|(k, _, _)| *k).collect();
        assert_eq!(keys, vec![(1, 1), (1, 2)]);
        assert_eq!(sink.records[0].2, Some(0.0));
    }

    #[test]
    fn positions_stay_inside_bounds() {
        let bounds = SearchBounds::feeder_default();
        let mut objective = SumObjective::new();
        let mut sink = RecordingSink::new();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let run = optimizer(5, 30)
            .run(&bounds, &HashSet::new(), &mut objective, &mut sink, &mut rng)
            .unwrap();

        assert_eq!(sink.records.len(), 150);
        for (key, position, _) in &sink.records {
            assert!(
                bounds.contains(position),
                "position {position:?} escaped bounds at slot {key:?}"
            );
        }
        assert!(bounds.contains(&run.best_position));
    }

    #[test]
    fn full_resume_returns_lower_bounds_without_evaluating() {
        let bounds = SearchBounds::feeder_default();
        let completed: HashSet<_> = [(1, 1), (1, 2)].into_iter().collect();
        let mut objective = SumObjective::new();
        let mut sink = RecordingSink::new();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let run = optimizer(2, 1)
            .run(&bounds, &completed, &mut objective, &mut sink, &mut rng)
            .unwrap();

        assert!(run.fully_resumed);
        assert_eq!(run.best_position, vec![20.0, 0.0005, 7.0, 10.0]);
        assert!(run.best_score.is_infinite());
        assert_eq!(run.evaluated, 0);
        assert_eq!(run.skipped, 2);
        assert_eq!(objective.calls, 0);
        assert!(sink.records.is_empty());
    }

    #[test]
    fn resume_evaluates_only_missing_slots() {
        let bounds = SearchBounds::new(vec![(0.0, 1.0)]).unwrap();
        let completed: HashSet<_> = [(1, 1), (2, 2)].into_iter().collect();
        let mut objective = SumObjective::new();
        let mut sink = RecordingSink::new();
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        let run = optimizer(2, 2)
            .run(&bounds, &completed, &mut objective, &mut sink, &mut rng)
            .unwrap();

        assert_eq!(run.evaluated, 2);
        assert_eq!(run.skipped, 2);
        assert!(!run.fully_resumed);

        let keys: Vec<_> = sink.records.iter().map(|(k, _, _)| *k).collect();
        assert_eq!(keys, vec![(1, 2), (2, 1)]);
    }

    #[test]
    fn rerun_over_a_recorded_ledger_adds_no_duplicate_slots() {
        let bounds = SearchBounds::new(vec![(0.0, 5.0), (0.0, 5.0)]).unwrap();
        let mut first_sink = RecordingSink::new();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        optimizer(3, 4)
            .run(
                &bounds,
                &HashSet::new(),
                &mut SumObjective::new(),
                &mut first_sink,
                &mut rng,
            )
            .unwrap();

        let completed: HashSet<_> = first_sink.records.iter().map(|(k, _, _)| *k).collect();
        assert_eq!(completed.len(), 12);

        let mut second_sink = RecordingSink::new();
        let mut objective = SumObjective::new();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let run = optimizer(3, 4)
            .run(&bounds, &completed, &mut objective, &mut second_sink, &mut rng)
            .unwrap();

        assert!(run.fully_resumed);
        assert_eq!(objective.calls, 0);
        assert!(second_sink.records.is_empty());
    }

    #[test]
    fn skipped_particle_does_not_move() {
        let bounds = SearchBounds::new(vec![(5.0, 9.0)]).unwrap();
        let completed: HashSet<_> = [(1, 1)].into_iter().collect();
        let mut sink = RecordingSink::new();
        // Zero RNG: the particle initializes at the lower bound and, having
        // been skipped in iteration 1, must still be there in iteration 2.
        let mut rng = StepRng::new(0, 0);

        let run = optimizer(1, 2)
            .run(
                &bounds,
                &completed,
                &mut SumObjective::new(),
                &mut sink,
                &mut rng,
            )
            .unwrap();

        assert_eq!(sink.records.len(), 1);
        assert_eq!(sink.records[0].0, (2, 1));
        assert_eq!(sink.records[0].1, vec![5.0]);
        assert_eq!(run.best_score, 5.0);
    }

    #[test]
    fn best_score_is_the_minimum_finite_score_seen() {
        let bounds = SearchBounds::new(vec![(0.0, 100.0), (0.0, 100.0)]).unwrap();
        let mut sink = RecordingSink::new();
        let mut rng = ChaCha8Rng::seed_from_u64(99);

        let run = optimizer(4, 10)
            .run(
                &bounds,
                &HashSet::new(),
                &mut SumObjective::new(),
                &mut sink,
                &mut rng,
            )
            .unwrap();

        let min_recorded = sink
            .records
            .iter()
            .filter_map(|(_, _, metric)| *metric)
            .fold(f64::INFINITY, f64::min);
        assert_eq!(run.best_score, min_recorded);
    }

    #[test]
    fn equal_scores_never_displace_the_first_best() {
        struct ConstantObjective;
        impl Objective for ConstantObjective {
            fn evaluate(&mut self, _: &[f64], _: &EvalContext) -> LcResult<Evaluation> {
                Ok(Evaluation::Score(5.0))
            }
        }

        let bounds = SearchBounds::new(vec![(0.0, 10.0)]).unwrap();
        let mut sink = RecordingSink::new();
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        let run = optimizer(3, 2)
            .run(
                &bounds,
                &HashSet::new(),
                &mut ConstantObjective,
                &mut sink,
                &mut rng,
            )
            .unwrap();

        // The first evaluated slot set the global best; every later equal
        // score left it alone. The sink records post-update positions, which
        // is also what the best tracks.
        assert_eq!(run.best_score, 5.0);
        assert_eq!(run.best_position, sink.records[0].1);
    }

    #[test]
    fn failures_are_recorded_and_scored_worst() {
        struct AlwaysFails;
        impl Objective for AlwaysFails {
            fn evaluate(&mut self, _: &[f64], _: &EvalContext) -> LcResult<Evaluation> {
                Ok(Evaluation::Failed {
                    reason: "trainer crashed".to_string(),
                })
            }
        }

        let bounds = SearchBounds::feeder_default();
        let mut sink = RecordingSink::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let run = optimizer(2, 2)
            .run(&bounds, &HashSet::new(), &mut AlwaysFails, &mut sink, &mut rng)
            .unwrap();

        assert_eq!(run.evaluated, 4);
        assert_eq!(run.failed, 4);
        assert!(!run.fully_resumed);
        // Every failure still produced a ledger report, with no metric.
        assert_eq!(sink.records.len(), 4);
        assert!(sink.records.iter().all(|(_, _, metric)| metric.is_none()));
        // With no finite score the search falls back to the lower corner.
        assert_eq!(run.best_position, bounds.lower_corner());
        assert!(run.best_score.is_infinite());
    }

    #[test]
    fn data_faults_abort_the_search() {
        struct MissingData;
        impl Objective for MissingData {
            fn evaluate(&mut self, _: &[f64], _: &EvalContext) -> LcResult<Evaluation> {
                Err(DataError::SplitNotFound {
                    path: "data/split/FDR01_day.csv".to_string(),
                }
                .into())
            }
        }

        let bounds = SearchBounds::feeder_default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let err = optimizer(2, 2)
            .run(
                &bounds,
                &HashSet::new(),
                &mut MissingData,
                &mut NullSink,
                &mut rng,
            )
            .unwrap_err();
        assert!(matches!(err, LcError::Data(_)));
    }

    #[test]
    fn sink_errors_do_not_stop_the_search() {
        struct BrokenSink;
        impl ProgressSink for BrokenSink {
            fn record(&mut self, _: &EvalContext, _: &[f64], _: Option<f64>) -> LcResult<()> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full").into())
            }
        }

        let bounds = SearchBounds::new(vec![(0.0, 1.0)]).unwrap();
        let mut objective = SumObjective::new();
        let mut rng = ChaCha8Rng::seed_from_u64(13);

        let run = optimizer(2, 3)
            .run(
                &bounds,
                &HashSet::new(),
                &mut objective,
                &mut BrokenSink,
                &mut rng,
            )
            .unwrap();
        assert_eq!(run.evaluated, 6);
        assert!(run.best_score.is_finite());
    }

    #[test]
    fn zero_sized_swarm_is_a_configuration_error() {
        let bounds = SearchBounds::feeder_default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let err = optimizer(0, 5)
            .run(
                &bounds,
                &HashSet::new(),
                &mut SumObjective::new(),
                &mut NullSink,
                &mut rng,
            )
            .unwrap_err();
        assert!(matches!(err, LcError::Config(_)));
    }
}
