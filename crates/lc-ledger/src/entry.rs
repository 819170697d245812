use chrono::Utc;
use lc_types::Hyperparameters;
use serde::{Deserialize, Serialize};

/// Identity key of one evaluation slot: `(iteration, particle)`, both
/// 1-based. Resume decisions depend only on this key.
pub type SlotKey = (usize, usize);

/// Metrics recorded for one evaluation.
///
/// A failed evaluation has no finite metric; JSON cannot carry infinity, so
/// failures are stored as `null` and scored back as `+inf` on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalMetrics {
    pub mape: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mae: Option<f64>,
}

impl EvalMetrics {
    pub fn failed() -> Self {
        Self { mape: None, mae: None }
    }

    /// The scalar the optimizer minimizes; worst-possible when the
    /// evaluation failed.
    pub fn score(&self) -> f64 {
        self.mape.unwrap_or(f64::INFINITY)
    }
}

/// One immutable ledger line: the outcome of evaluating one particle in one
/// iteration. Written the moment the evaluation completes, success or not,
/// and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub timestamp: String,
    pub iteration: usize,
    pub particle: usize,
    pub params: Hyperparameters,
    pub metrics: EvalMetrics,
}

impl ProgressEntry {
    pub fn new(
        iteration: usize,
        particle: usize,
        params: Hyperparameters,
        metrics: EvalMetrics,
    ) -> Self {
        Self {
            timestamp: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            iteration,
            particle,
            params,
            metrics,
        }
    }

    pub fn key(&self) -> SlotKey {
        (self.iteration, self.particle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_params() -> Hyperparameters {
        Hyperparameters {
            hidden_units: 40,
            learning_rate: 0.001,
            window_size: 10,
            epochs: 20,
        }
    }

    #[test]
    fn entry_serializes_to_ledger_line_format() {
        let entry = ProgressEntry::new(
            3,
            7,
            sample_params(),
            EvalMetrics {
                mape: Some(4.25),
                mae: Some(12.0),
            },
        );
        let line = serde_json::to_string(&entry).unwrap();
        assert!(line.contains("\"iteration\":3"));
        assert!(line.contains("\"particle\":7"));
        assert!(line.contains("\"hidden_units\":40"));
        assert!(line.contains("\"mape\":4.25"));

        let back: ProgressEntry = serde_json::from_str(&line).unwrap();
        assert_eq!(back, entry);
        assert_eq!(back.key(), (3, 7));
    }

    #[test]
    fn failed_metrics_score_as_infinity() {
        let metrics = EvalMetrics::failed();
        assert!(metrics.score().is_infinite());

        let line = serde_json::to_string(&metrics).unwrap();
        assert_eq!(line, "{\"mape\":null}");
        let back: EvalMetrics = serde_json::from_str(&line).unwrap();
        assert!(back.score().is_infinite());
    }

    #[test]
    fn finite_metrics_score_as_themselves() {
        let metrics = EvalMetrics {
            mape: Some(6.5),
            mae: None,
        };
        assert_eq!(metrics.score(), 6.5);
    }
}
