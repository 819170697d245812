use std::fs;
use std::path::PathBuf;

use lc_types::{LcResult, LedgerError, SearchBounds};
use serde::{Deserialize, Serialize};

use crate::ledger::ProgressLedger;

/// The search configuration a ledger's entries were produced under.
///
/// Resume-skip decisions are only sound when bounds, swarm shape, and the
/// random draw sequence match the interrupted run, so the fingerprint is
/// persisted alongside the ledger and checked before resuming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchFingerprint {
    pub bounds: SearchBounds,
    pub particles: usize,
    pub iterations: usize,
    pub seed: u64,
}

impl SearchFingerprint {
    pub fn new(bounds: SearchBounds, particles: usize, iterations: usize, seed: u64) -> Self {
        Self {
            bounds,
            particles,
            iterations,
            seed,
        }
    }
}

impl std::fmt::Display for SearchFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "particles={} iterations={} seed={} dims={}",
            self.particles,
            self.iterations,
            self.seed,
            self.bounds.len()
        )
    }
}

impl ProgressLedger {
    /// Sidecar location: `<ledger stem>.meta.json` next to the ledger file.
    pub fn fingerprint_path(&self) -> PathBuf {
        let mut path = self.path().to_path_buf();
        path.set_extension("meta.json");
        path
    }

    /// Verify this search's configuration against the ledger's recorded one,
    /// writing it if none exists yet.
    ///
    /// A ledger with entries but no sidecar predates fingerprinting; it is
    /// adopted with a warning rather than refused.
    pub fn check_fingerprint(&self, fingerprint: &SearchFingerprint) -> LcResult<()> {
        let meta_path = self.fingerprint_path();

        if meta_path.exists() {
            let recorded: SearchFingerprint =
                serde_json::from_str(&fs::read_to_string(&meta_path)?)?;
            if &recorded != fingerprint {
                return Err(LedgerError::FingerprintMismatch {
                    recorded: recorded.to_string(),
                    requested: fingerprint.to_string(),
                }
                .into());
            }
            return Ok(());
        }

        if !self.resume_plan()?.is_empty() {
            tracing::warn!(
                "Ledger {} has entries but no configuration fingerprint; \
                 adopting the current configuration",
                self.path().display()
            );
        }

        if let Some(parent) = meta_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&meta_path, serde_json::to_string_pretty(fingerprint)?)?;
        Ok(())
    }

    /// Forget the recorded fingerprint along with a `reset`.
    pub fn reset_fingerprint(&self) -> LcResult<()> {
        let meta_path = self.fingerprint_path();
        if meta_path.exists() {
            fs::remove_file(meta_path)?;
        }
        Ok(())
    }
}
