//! The disposable-worker protocol.
//!
//! One request in on stdin, one response out on stdout, then the process
//! exits and the OS reclaims everything the training run touched. All
//! logging goes to stderr so stdout carries exactly one JSON line.

use std::io::{Read, Write};
use std::path::PathBuf;

use lc_types::{Hyperparameters, LcError, LcResult};
use serde::{Deserialize, Serialize};

use crate::trainer::{SgdTrainer, TrainOutcome, Trainer};

/// Which side of the error taxonomy a worker failure belongs to. The parent
/// maps `Training` to a worst-case score and keeps searching; `Data` is
/// fatal to the whole series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerFault {
    Data,
    Training,
}

/// One evaluation request: where the split CSV lives and what to train.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerRequest {
    pub data_path: PathBuf,
    pub val_fraction: f64,
    pub seed: u64,
    pub params: Hyperparameters,
}

/// The worker's single reply line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerResponse {
    pub mape: Option<f64>,
    pub mae: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault: Option<WorkerFault>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkerResponse {
    pub fn success(outcome: &TrainOutcome) -> Self {
        Self {
            mape: Some(outcome.mape),
            mae: Some(outcome.mae),
            fault: None,
            error: None,
        }
    }

    pub fn failure(fault: WorkerFault, error: impl Into<String>) -> Self {
        Self {
            mape: None,
            mae: None,
            fault: Some(fault),
            error: Some(error.into()),
        }
    }
}

/// Handle one request: load the series fresh, window it, train once.
pub fn handle_request(request: &WorkerRequest) -> WorkerResponse {
    let series = match lc_data::load_series_csv(&request.data_path) {
        Ok(series) => series,
        Err(e) => return WorkerResponse::failure(WorkerFault::Data, e.to_string()),
    };

    let split = match lc_data::SplitDataset::prepare(
        &series,
        request.params.window_size,
        request.val_fraction,
    ) {
        Ok(split) => split,
        // Candidate-specific window problems are training failures; the
        // series itself loaded fine.
        Err(e) => return WorkerResponse::failure(WorkerFault::Training, e.to_string()),
    };

    match SgdTrainer::new(request.seed).evaluate(&split, &request.params) {
        Ok(outcome) => WorkerResponse::success(&outcome),
        Err(e) => WorkerResponse::failure(WorkerFault::Training, e.to_string()),
    }
}

/// Worker entry point: read one request from stdin, write one response line
/// to stdout. Protocol-level problems (unreadable stdin, malformed request)
/// are the only error path; evaluation problems travel inside the response.
pub fn run_worker_stdio() -> LcResult<()> {
    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    let request: WorkerRequest = serde_json::from_str(&input)
        .map_err(|e| LcError::Internal(format!("malformed worker request: {e}")))?;

    let response = handle_request(&request);
    let mut stdout = std::io::stdout();
    let mut line = serde_json::to_string(&response)?;
    line.push('\n');
    stdout.write_all(line.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
