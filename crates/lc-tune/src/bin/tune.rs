//! Command-line entry point for per-series hyperparameter tuning.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use lc_ledger::ProgressLedger;
use lc_swarm::SwarmConfig;
use lc_tune::{discover_series, tune_batch, TuneConfig};
use lc_types::SeriesId;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "tune", version)]
#[command(about = "Resumable PSO hyperparameter tuning for per-feeder load forecasting")]
struct Args {
    /// Series to tune, e.g. FDR_KOTA_01_day.
    #[arg(required_unless_present_any = ["all", "worker"])]
    series: Vec<String>,

    /// Tune every series with a split CSV under the data directory.
    #[arg(long, conflicts_with = "series")]
    all: bool,

    /// Swarm particles per iteration.
    #[arg(short, long, default_value_t = 10)]
    particles: usize,

    /// Swarm iterations.
    #[arg(short = 'n', long, default_value_t = 20)]
    iterations: usize,

    /// Directory of per-series split CSV files.
    #[arg(long, default_value = "data/split")]
    data_dir: PathBuf,

    /// Directory receiving model artifacts and summaries.
    #[arg(long, default_value = "models/single")]
    model_dir: PathBuf,

    /// Directory holding progress ledgers.
    #[arg(long, default_value = "logs")]
    ledger_dir: PathBuf,

    /// Base seed; each series derives its own draw sequence from it.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Wall-clock budget per candidate evaluation, in seconds.
    #[arg(long, default_value_t = 600)]
    eval_timeout_secs: u64,

    /// Evaluate candidates in this process instead of disposable workers.
    #[arg(long)]
    no_isolation: bool,

    /// Discard recorded progress and fingerprints before tuning.
    #[arg(long)]
    reset: bool,

    /// Drop the last ledger entry before tuning, purging a tail entry
    /// suspected of being torn by a crash.
    #[arg(long, conflicts_with = "reset")]
    discard_last: bool,

    /// Internal: serve one evaluation request over stdin/stdout.
    #[arg(long, hide = true)]
    worker: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Worker mode owns stdout for its single response line; no logging
    // setup beyond what lands on stderr.
    if args.worker {
        lc_eval::worker::run_worker_stdio()?;
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = TuneConfig::new(args.data_dir, args.model_dir, args.ledger_dir);
    config.swarm = SwarmConfig::default()
        .with_particles(args.particles)
        .with_iterations(args.iterations);
    config.seed = args.seed;
    config.eval_timeout = Duration::from_secs(args.eval_timeout_secs);
    config.isolated = !args.no_isolation;

    let series: Vec<SeriesId> = if args.all {
        discover_series(&config.data_dir)
            .with_context(|| format!("scanning {}", config.data_dir.display()))?
    } else {
        args.series
            .iter()
            .map(|s| s.parse())
            .collect::<Result<_, _>>()?
    };
    if series.is_empty() {
        bail!("no series to tune under {}", config.data_dir.display());
    }

    if args.reset {
        for s in &series {
            let ledger = ProgressLedger::for_series(&config.ledger_dir, s);
            ledger.reset()?;
            ledger.reset_fingerprint()?;
            info!("{s}: progress reset");
        }
    } else if args.discard_last {
        for s in &series {
            let ledger = ProgressLedger::for_series(&config.ledger_dir, s);
            ledger.discard_last()?;
            info!("{s}: dropped the last ledger entry");
        }
    }

    let results = tune_batch(&config, &series);
    let mut succeeded = 0usize;
    for (series, result) in &results {
        match result {
            Ok(report) => {
                succeeded += 1;
                println!(
                    "{series}: MAPE {:.2}% MAE {:.4} | {} | model {}",
                    report.mape,
                    report.mae,
                    report.best,
                    report.model_path.display()
                );
            }
            Err(e) => println!("{series}: failed: {e}"),
        }
    }

    if succeeded == 0 {
        bail!("all {} series failed to tune", results.len());
    }
    Ok(())
}
