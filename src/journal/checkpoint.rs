//! Resume position for a run

use crate::journal::atomic::{read_json, write_json_atomic};
use crate::journal::error::PersistResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// On-disk shape of the checkpoint file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointState {
    /// Number of leading records already settled
    pub last_index: usize,
}

/// Durable, monotonic resume position
///
/// Records at positions below `last_index` are skipped on the next run.
#[derive(Debug)]
pub struct Checkpoint {
    path: PathBuf,
    state: CheckpointState,
}

impl Checkpoint {
    /// Loads the checkpoint at `path`, starting from zero when absent
    pub fn load(path: &Path) -> PersistResult<Self> {
        let state = read_json::<CheckpointState>(path)?.unwrap_or_default();
        Ok(Self {
            path: path.to_path_buf(),
            state,
        })
    }

    pub fn last_index(&self) -> usize {
        self.state.last_index
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Moves the resume position forward to `next`
    ///
    /// Returns `false` without touching disk when `next` would not move the
    /// position forward.
    pub fn advance(&mut self, next: usize) -> PersistResult<bool> {
        if next <= self.state.last_index {
            return Ok(false);
        }

        let updated = CheckpointState { last_index: next };
        write_json_atomic(&self.path, &updated, "checkpoint")?;
        self.state = updated;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::PersistError;
    use tempfile::TempDir;

    #[test]
    fn test_absent_checkpoint_starts_at_zero() {
        let dir = TempDir::new().unwrap();
        let checkpoint = Checkpoint::load(&dir.path().join("state.json")).unwrap();
        assert_eq!(checkpoint.last_index(), 0);
        assert!(!checkpoint.path().exists());
    }

    #[test]
    fn test_advance_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");

        let mut checkpoint = Checkpoint::load(&path).unwrap();
        assert!(checkpoint.advance(3).unwrap());

        let raw = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["lastIndex"], 3);

        let reloaded = Checkpoint::load(&path).unwrap();
        assert_eq!(reloaded.last_index(), 3);
    }

    #[test]
    fn test_advance_never_moves_backwards() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");

        let mut checkpoint = Checkpoint::load(&path).unwrap();
        checkpoint.advance(5).unwrap();

        assert!(!checkpoint.advance(5).unwrap());
        assert!(!checkpoint.advance(2).unwrap());
        assert_eq!(checkpoint.last_index(), 5);
        assert_eq!(Checkpoint::load(&path).unwrap().last_index(), 5);
    }

    #[test]
    fn test_corrupt_checkpoint_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "lastIndex=4").unwrap();

        assert!(matches!(
            Checkpoint::load(&path),
            Err(PersistError::Corrupt { .. })
        ));
    }
}
