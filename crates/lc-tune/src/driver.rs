//! Per-series tuning: ledger-checked resume, swarm search, keeper retrain.

use std::path::{Path, PathBuf};
use std::time::Duration;

use lc_data::SplitDataset;
use lc_eval::{Evaluator, InProcessEvaluator, SgdTrainer, SubprocessEvaluator, Trainer};
use lc_ledger::{EvalMetrics, ProgressEntry, ProgressLedger, SearchFingerprint};
use lc_swarm::{EvalContext, Evaluation, Objective, ProgressSink, SwarmConfig, SwarmOptimizer};
use lc_types::{DataError, Hyperparameters, LcResult, SearchBounds, SeriesId};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};

/// Everything a tuning run needs to know: where the data, models, and
/// ledgers live, the swarm shape, and how candidates are evaluated.
#[derive(Debug, Clone)]
pub struct TuneConfig {
    pub data_dir: PathBuf,
    pub model_dir: PathBuf,
    pub ledger_dir: PathBuf,
    pub swarm: SwarmConfig,
    /// Tail fraction of the windowed samples held out for validation.
    pub val_fraction: f64,
    /// Base seed; each series derives its own draw sequence from it.
    pub seed: u64,
    /// Wall-clock budget for one candidate evaluation in a worker.
    pub eval_timeout: Duration,
    /// Evaluate candidates in disposable worker processes. Off means
    /// in-process evaluation, which is faster but accumulates whatever
    /// memory each training run fails to release.
    pub isolated: bool,
}

impl TuneConfig {
    pub fn new<P: Into<PathBuf>>(data_dir: P, model_dir: P, ledger_dir: P) -> Self {
        Self {
            data_dir: data_dir.into(),
            model_dir: model_dir.into(),
            ledger_dir: ledger_dir.into(),
            swarm: SwarmConfig::default(),
            val_fraction: 0.2,
            seed: 42,
            eval_timeout: Duration::from_secs(600),
            isolated: true,
        }
    }
}

/// What one finished series tuning produced.
#[derive(Debug, Clone)]
pub struct TuneReport {
    pub series: SeriesId,
    pub best: Hyperparameters,
    /// Validation metrics of the keeper retrain.
    pub mape: f64,
    pub mae: f64,
    pub fully_resumed: bool,
    pub evaluated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub model_path: PathBuf,
    pub summary_path: PathBuf,
}

/// Derive a per-series seed from the base seed and the series name, so two
/// series tuned under one base seed do not share a draw sequence. FNV-1a,
/// hand-rolled so the mapping never shifts under a std hasher change; the
/// derived seed lands in the fingerprint, and resume depends on it.
fn series_seed(base: u64, series: &SeriesId) -> u64 {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in series.to_string().bytes() {
        h ^= u64::from(byte);
        h = h.wrapping_mul(0x0000_0100_0000_01b3);
    }
    h ^ base
}

/// Adapts an [`Evaluator`] to the swarm's [`Objective`] seam, decoding
/// positions into hyperparameters on the way through.
struct TuneObjective {
    series: SeriesId,
    evaluator: Box<dyn Evaluator>,
}

impl Objective for TuneObjective {
    fn evaluate(&mut self, position: &[f64], ctx: &EvalContext) -> LcResult<Evaluation> {
        let params = Hyperparameters::from_position(position)?;
        info!(
            "{}: training particle {}/{} in iteration {}/{}: {params}",
            self.series, ctx.particle, ctx.total_particles, ctx.iteration, ctx.total_iterations
        );
        self.evaluator.evaluate(&params, ctx)
    }
}

/// Writes each completed evaluation to the series' progress ledger.
struct LedgerSink<'a> {
    ledger: &'a ProgressLedger,
}

impl ProgressSink for LedgerSink<'_> {
    fn record(&mut self, ctx: &EvalContext, position: &[f64], metric: Option<f64>) -> LcResult<()> {
        let params = Hyperparameters::from_position(position)?;
        let entry = ProgressEntry::new(
            ctx.iteration,
            ctx.particle,
            params,
            EvalMetrics {
                mape: metric,
                mae: None,
            },
        );
        self.ledger.record(&entry)
    }
}

fn series_data_path(config: &TuneConfig, series: &SeriesId) -> PathBuf {
    config.data_dir.join(format!("{series}.csv"))
}

/// Tune one series end to end: resume-checked swarm search, then a keeper
/// retrain of the best combination whose model is persisted alongside a
/// plain-text summary.
pub fn tune_series(config: &TuneConfig, series: &SeriesId) -> LcResult<TuneReport> {
    let data_path = series_data_path(config, series);
    let values = lc_data::load_series_csv(&data_path)?;
    let bounds = SearchBounds::feeder_default();

    // The widest tunable window must leave at least a few samples so both
    // splits are non-empty; anything shorter cannot be tuned at all.
    let needed = bounds.high(2) as usize + 3;
    if values.len() < needed {
        return Err(DataError::InsufficientData {
            needed,
            available: values.len(),
        }
        .into());
    }

    let seed = series_seed(config.seed, series);
    let ledger = ProgressLedger::for_series(&config.ledger_dir, series);
    ledger.check_fingerprint(&SearchFingerprint::new(
        bounds.clone(),
        config.swarm.particles,
        config.swarm.iterations,
        seed,
    ))?;

    let completed = ledger.resume_plan()?;
    if !completed.is_empty() {
        info!(
            "{series}: resuming from {}, {} slots already evaluated",
            ledger.path().display(),
            completed.len()
        );
    }

    let evaluator: Box<dyn Evaluator> = if config.isolated {
        Box::new(SubprocessEvaluator::new(
            std::env::current_exe()?,
            data_path,
            config.val_fraction,
            seed,
            config.eval_timeout,
        ))
    } else {
        Box::new(InProcessEvaluator::new(
            values.clone(),
            config.val_fraction,
            SgdTrainer::new(seed),
        ))
    };

    let mut objective = TuneObjective {
        series: series.clone(),
        evaluator,
    };
    let mut sink = LedgerSink { ledger: &ledger };
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let run = SwarmOptimizer::new(config.swarm.clone()).run(
        &bounds,
        &completed,
        &mut objective,
        &mut sink,
        &mut rng,
    )?;

    let best = Hyperparameters::from_position(&run.best_position)?;
    if run.fully_resumed {
        warn!(
            "{series}: every slot was already evaluated; \
             retraining the lower-bound fallback {best}"
        );
    } else {
        info!(
            "{series}: search finished, best score {:.4} with {best} \
             ({} evaluated, {} skipped, {} failed)",
            run.best_score, run.evaluated, run.skipped, run.failed
        );
    }

    // Keeper retrain: one in-process training of the winner, on the same
    // split the search scored against, persisted as the series' model.
    let split = SplitDataset::prepare(&values, best.window_size, config.val_fraction)?;
    let outcome = SgdTrainer::new(seed).evaluate(&split, &best)?;

    let model_path = config.model_dir.join(format!("{series}.model.json"));
    outcome.model.save(&model_path)?;

    let summary_path = config.model_dir.join(format!("{series}.summary.txt"));
    write_summary(&summary_path, series, &best, outcome.mape, outcome.mae, &run)?;

    info!(
        "{series}: model saved to {} (MAPE {:.2}%, MAE {:.4})",
        model_path.display(),
        outcome.mape,
        outcome.mae
    );

    Ok(TuneReport {
        series: series.clone(),
        best,
        mape: outcome.mape,
        mae: outcome.mae,
        fully_resumed: run.fully_resumed,
        evaluated: run.evaluated,
        skipped: run.skipped,
        failed: run.failed,
        model_path,
        summary_path,
    })
}

fn write_summary(
    path: &Path,
    series: &SeriesId,
    best: &Hyperparameters,
    mape: f64,
    mae: f64,
    run: &lc_swarm::SwarmRun,
) -> LcResult<()> {
    let tuned = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S");
    let text = format!(
        "series: {series}\n\
         tuned: {tuned} UTC\n\
         best: {best}\n\
         validation MAPE: {mape:.2}%\n\
         validation MAE: {mae:.4}\n\
         evaluations: {} new, {} resumed, {} failed\n",
        run.evaluated, run.skipped, run.failed
    );
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, text)?;
    Ok(())
}

/// Tune several series in sequence. A failed series is logged and reported
/// in its result slot; it never stops the remaining series from running.
pub fn tune_batch(
    config: &TuneConfig,
    series_list: &[SeriesId],
) -> Vec<(SeriesId, LcResult<TuneReport>)> {
    series_list
        .iter()
        .map(|series| {
            let result = tune_series(config, series);
            if let Err(e) = &result {
                warn!("{series}: tuning failed: {e}; moving on to the next series");
            }
            (series.clone(), result)
        })
        .collect()
}

/// Every series with a split CSV under the data directory, sorted by name.
/// Files whose stem does not parse as `<feeder>_<category>` are ignored.
pub fn discover_series(data_dir: &Path) -> LcResult<Vec<SeriesId>> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(data_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if let Ok(series) = stem.parse::<SeriesId>() {
            found.push(series);
        }
    }
    found.sort_by_key(|s| s.to_string());
    Ok(found)
}
