//! Subprocess-backed evaluation: one disposable worker per candidate.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use lc_swarm::{EvalContext, Evaluation};
use lc_types::{DataError, Hyperparameters, LcError, LcResult};
use tracing::{debug, warn};

use crate::evaluator::Evaluator;
use crate::worker::{WorkerFault, WorkerRequest, WorkerResponse};

/// How often a running worker is polled for completion.
const WORKER_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Evaluates each candidate in a freshly spawned worker process.
///
/// The worker is this same binary invoked with `--worker`; whatever memory
/// the training run leaks dies with the process, turning unbounded growth in
/// a long search into a fixed per-evaluation cost. A worker that crashes,
/// times out, or reports a training fault becomes a `Failed` evaluation; a
/// reported data fault propagates as a series-fatal error.
pub struct SubprocessEvaluator {
    worker_exe: PathBuf,
    data_path: PathBuf,
    val_fraction: f64,
    seed: u64,
    timeout: Duration,
}

impl SubprocessEvaluator {
    pub fn new(
        worker_exe: PathBuf,
        data_path: PathBuf,
        val_fraction: f64,
        seed: u64,
        timeout: Duration,
    ) -> Self {
        Self {
            worker_exe,
            data_path,
            val_fraction,
            seed,
            timeout,
        }
    }

    fn spawn_worker(&self, request: &WorkerRequest) -> LcResult<Child> {
        let mut child = Command::new(&self.worker_exe)
            .arg("--worker")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;

        // Write the request and close stdin so the worker sees EOF.
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| LcError::Internal("worker stdin unavailable".to_string()))?;
        let line = serde_json::to_string(request)?;
        if let Err(e) = stdin.write_all(line.as_bytes()) {
            // The worker may have exited before reading the request; its
            // exit status and output decide the outcome, not this pipe.
            debug!("Worker stdin write failed: {e}");
        }
        drop(stdin);

        Ok(child)
    }

    /// Wait for the worker, polling so a hung training run can be killed at
    /// the timeout instead of blocking the whole search.
    fn wait_with_timeout(&self, child: &mut Child) -> LcResult<Option<std::process::ExitStatus>> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(Some(status));
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Ok(None);
            }
            std::thread::sleep(WORKER_POLL_INTERVAL);
        }
    }
}

impl Evaluator for SubprocessEvaluator {
    fn evaluate(&mut self, params: &Hyperparameters, ctx: &EvalContext) -> LcResult<Evaluation> {
        let request = WorkerRequest {
            data_path: self.data_path.clone(),
            val_fraction: self.val_fraction,
            seed: self.seed,
            params: params.clone(),
        };

        debug!(
            "Spawning evaluation worker for slot ({}, {}): {params}",
            ctx.iteration, ctx.particle
        );

        // A spawn failure is systemic (missing binary, exhausted PIDs), not
        // a property of this candidate; let it propagate.
        let mut child = self.spawn_worker(&request)?;

        let status = match self.wait_with_timeout(&mut child)? {
            Some(status) => status,
            None => {
                warn!(
                    "Worker for slot ({}, {}) exceeded {}s; killed",
                    ctx.iteration,
                    ctx.particle,
                    self.timeout.as_secs()
                );
                return Ok(Evaluation::Failed {
                    reason: format!("evaluation timed out after {}s", self.timeout.as_secs()),
                });
            }
        };

        let mut output = String::new();
        if let Some(mut stdout) = child.stdout.take() {
            stdout.read_to_string(&mut output)?;
        }

        if !status.success() {
            return Ok(Evaluation::Failed {
                reason: format!("worker exited with {status}"),
            });
        }

        let response: WorkerResponse = match serde_json::from_str(output.trim()) {
            Ok(response) => response,
            Err(e) => {
                return Ok(Evaluation::Failed {
                    reason: format!("unreadable worker response: {e}"),
                })
            }
        };

        match (response.fault, response.mape) {
            (None, Some(mape)) => Ok(Evaluation::Score(mape)),
            (Some(WorkerFault::Data), _) => Err(DataError::ParseError {
                message: response
                    .error
                    .unwrap_or_else(|| "worker reported a data fault".to_string()),
            }
            .into()),
            (Some(WorkerFault::Training), _) => Ok(Evaluation::Failed {
                reason: response
                    .error
                    .unwrap_or_else(|| "worker reported a training fault".to_string()),
            }),
            (None, None) => Ok(Evaluation::Failed {
                reason: "worker response carried neither metric nor fault".to_string(),
            }),
        }
    }
}
