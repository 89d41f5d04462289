//! Durable run state
//!
//! A run directory holds three files:
//!
//! - `state.json`: the [`Checkpoint`], how many leading records are settled
//! - `output.json`: the outcome [`Ledger`], one published location per record
//! - `failed.json`: the failure [`Ledger`], one entry per record that could
//!   not be mirrored
//!
//! Ledger entries for a record are always written before the checkpoint moves
//! past it, so a crash between the two only causes the record to be revisited
//! and deduplicated on the next run.

mod atomic;
mod checkpoint;
mod entries;
mod error;
mod ledger;

pub use atomic::{read_json, temp_path, write_atomic, write_atomic_async, write_json_atomic};
pub use checkpoint::{Checkpoint, CheckpointState};
pub use entries::{FailureEntry, FailureReason, LedgerEntry, OutcomeEntry};
pub use error::{PersistError, PersistResult};
pub use ledger::Ledger;

use std::path::{Path, PathBuf};

pub const CHECKPOINT_FILE: &str = "state.json";
pub const OUTCOMES_FILE: &str = "output.json";
pub const FAILURES_FILE: &str = "failed.json";

/// What a [`RunJournal::commit`] actually changed on disk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitReport {
    pub outcome_written: bool,
    pub failure_written: bool,
    pub advanced: bool,
}

/// Checkpoint plus both ledgers for one output directory
#[derive(Debug)]
pub struct RunJournal {
    dir: PathBuf,
    checkpoint: Checkpoint,
    outcomes: Ledger<OutcomeEntry>,
    failures: Ledger<FailureEntry>,
}

impl RunJournal {
    /// Opens (or starts) the journal in `dir`
    pub fn open(dir: &Path) -> PersistResult<Self> {
        std::fs::create_dir_all(dir).map_err(PersistError::io(dir))?;

        Ok(Self {
            dir: dir.to_path_buf(),
            checkpoint: Checkpoint::load(&dir.join(CHECKPOINT_FILE))?,
            outcomes: Ledger::open(&dir.join(OUTCOMES_FILE), "outcome ledger")?,
            failures: Ledger::open(&dir.join(FAILURES_FILE), "failure ledger")?,
        })
    }

    /// Removes the checkpoint and both ledgers from `dir`
    ///
    /// Fetched artifacts are left in place.
    pub fn reset(dir: &Path) -> PersistResult<()> {
        for name in [CHECKPOINT_FILE, OUTCOMES_FILE, FAILURES_FILE] {
            let path = dir.join(name);
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::info!("Removed {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(PersistError::io(&path)(e)),
            }
        }
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn last_index(&self) -> usize {
        self.checkpoint.last_index()
    }

    pub fn outcomes(&self) -> &Ledger<OutcomeEntry> {
        &self.outcomes
    }

    pub fn failures(&self) -> &Ledger<FailureEntry> {
        &self.failures
    }

    pub fn record_outcome(&mut self, entry: OutcomeEntry) -> PersistResult<bool> {
        self.outcomes.append(entry)
    }

    pub fn record_failure(&mut self, entry: FailureEntry) -> PersistResult<bool> {
        self.failures.append(entry)
    }

    pub fn advance(&mut self, next: usize) -> PersistResult<bool> {
        self.checkpoint.advance(next)
    }

    /// Settles one record: ledger entries first, then the checkpoint
    pub fn commit(
        &mut self,
        next: usize,
        outcome: Option<OutcomeEntry>,
        failure: Option<FailureEntry>,
    ) -> PersistResult<CommitReport> {
        let mut report = CommitReport::default();

        if let Some(entry) = outcome {
            report.outcome_written = self.record_outcome(entry)?;
        }
        if let Some(entry) = failure {
            report.failure_written = self.record_failure(entry)?;
        }
        report.advanced = self.advance(next)?;

        Ok(report)
    }
}
