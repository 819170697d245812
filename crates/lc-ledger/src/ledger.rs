use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use lc_types::{LcResult, SeriesId};

use crate::entry::{ProgressEntry, SlotKey};

/// The progress ledger for one series' search.
///
/// Append-only with a single writer (the search loop); every append is
/// flushed so a crash loses at most the in-flight entry. Loading tolerates a
/// torn tail by skipping any line that does not parse.
#[derive(Debug, Clone)]
pub struct ProgressLedger {
    path: PathBuf,
}

impl ProgressLedger {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The conventional ledger location for a series:
    /// `<dir>/<series>_progress.log`.
    pub fn for_series<P: AsRef<Path>>(dir: P, series: &SeriesId) -> Self {
        Self::new(dir.as_ref().join(format!("{series}_progress.log")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry and flush. Never touches existing content.
    pub fn record(&self, entry: &ProgressEntry) -> LcResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    /// All well-formed entries in file order. A missing ledger is an empty
    /// one; malformed lines (torn writes from a crash) are dropped with a
    /// debug log and nothing else.
    pub fn load(&self) -> LcResult<Vec<ProgressEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&self.path)?);
        let mut entries = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ProgressEntry>(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::debug!(
                        "Dropping corrupt ledger line {} in {}: {}",
                        idx + 1,
                        self.path.display(),
                        e
                    );
                }
            }
        }
        Ok(entries)
    }

    /// The set of `(iteration, particle)` keys already evaluated, which is
    /// the work a resumed search skips.
    pub fn resume_plan(&self) -> LcResult<HashSet<SlotKey>> {
        Ok(self.load()?.iter().map(ProgressEntry::key).collect())
    }

    /// Drop the final entry and rewrite the file. Used to purge an entry
    /// suspected of being only partially written before a crash.
    pub fn discard_last(&self) -> LcResult<()> {
        let mut entries = self.load()?;
        if entries.pop().is_none() {
            return Ok(());
        }
        let mut file = File::create(&self.path)?;
        for entry in &entries {
            let mut line = serde_json::to_string(entry)?;
            line.push('\n');
            file.write_all(line.as_bytes())?;
        }
        file.flush()?;
        Ok(())
    }

    /// Truncate the ledger, forgetting all recorded progress.
    pub fn reset(&self) -> LcResult<()> {
        if self.path.exists() {
            File::create(&self.path)?;
        }
        Ok(())
    }
}
