//! # lc-ledger
//!
//! Append-only, crash-tolerant record of every hyperparameter evaluation a
//! search has performed. One ledger file per series, one JSON object per
//! line, flushed on every write: after a crash at most the in-flight entry
//! is lost, and the set of `(iteration, particle)` keys already present is
//! exactly the work a resumed search may skip.

mod entry;
mod fingerprint;
mod ledger;

pub use entry::{EvalMetrics, ProgressEntry, SlotKey};
pub use fingerprint::SearchFingerprint;
pub use ledger::ProgressLedger;
