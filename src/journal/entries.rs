//! Ledger entry types

use serde::{Deserialize, Serialize};
use std::fmt;

/// An entry that can live in a [`Ledger`](crate::journal::Ledger)
pub trait LedgerEntry: Serialize + serde::de::DeserializeOwned + Clone {
    /// 1-based record position this entry belongs to
    fn index(&self) -> usize;
}

/// Published location for one record
///
/// `datasheet_url` is `None` (serialized as `null`) when the record had no
/// usable URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeEntry {
    pub index: usize,
    pub part_number: String,
    pub datasheet_url: Option<String>,
}

impl LedgerEntry for OutcomeEntry {
    fn index(&self) -> usize {
        self.index
    }
}

/// Why a record ended up in the failure ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    MissingOrInvalidUrl,
    AllStrategiesExhausted,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::MissingOrInvalidUrl => "missing or invalid URL",
            FailureReason::AllStrategiesExhausted => "all strategies exhausted",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record that could not be mirrored
///
/// `reason` is kept as free text so ledgers written by older runs still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureEntry {
    pub index: usize,
    pub part_number: String,
    pub datasheet_url: Option<String>,
    pub reason: String,
}

impl FailureEntry {
    pub fn new(
        index: usize,
        part_number: impl Into<String>,
        datasheet_url: Option<String>,
        reason: FailureReason,
    ) -> Self {
        Self {
            index,
            part_number: part_number.into(),
            datasheet_url,
            reason: reason.to_string(),
        }
    }
}

impl LedgerEntry for FailureEntry {
    fn index(&self) -> usize {
        self.index
    }
}
