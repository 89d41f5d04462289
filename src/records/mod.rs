//! Input record ingestion
//!
//! The input is a JSON array of objects. Every element becomes exactly one
//! [`Record`] at its array position, so indices stay stable between runs even
//! when some elements are malformed.

use crate::config::InputConfig;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// One part entry from the input collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// 0-based position in the input array
    pub index: usize,
    pub identifier: Option<String>,
    pub raw_url: Option<String>,
}

impl Record {
    pub fn new(index: usize, identifier: Option<&str>, raw_url: Option<&str>) -> Self {
        Self {
            index,
            identifier: identifier.map(str::to_string),
            raw_url: raw_url.map(str::to_string),
        }
    }

    /// 1-based position used in ledgers and the checkpoint
    pub fn position(&self) -> usize {
        self.index + 1
    }
}

/// Errors that prevent the collection from being read at all
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Failed to read records from {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Records are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Records must be a JSON array, found {0}")]
    NotAnArray(&'static str),
}

/// A malformed element or field, flagged but not fatal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordIssue {
    pub index: usize,
    pub problem: String,
}

/// Reads and parses the record collection at `path`
pub fn load_records(
    path: &Path,
    input: &InputConfig,
) -> Result<(Vec<Record>, Vec<RecordIssue>), RecordError> {
    let content = std::fs::read_to_string(path).map_err(|source| RecordError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&content)?;
    parse_records(&value, input)
}

/// Builds records from an already-parsed JSON document
pub fn parse_records(
    value: &Value,
    input: &InputConfig,
) -> Result<(Vec<Record>, Vec<RecordIssue>), RecordError> {
    let items = value
        .as_array()
        .ok_or_else(|| RecordError::NotAnArray(json_kind(value)))?;

    let mut records = Vec::with_capacity(items.len());
    let mut issues = Vec::new();

    for (index, item) in items.iter().enumerate() {
        let Some(object) = item.as_object() else {
            issues.push(RecordIssue {
                index,
                problem: format!("element is {}, not an object", json_kind(item)),
            });
            records.push(Record::new(index, None, None));
            continue;
        };

        let mut field = |name: &str| -> Option<String> {
            match object.get(name) {
                None | Some(Value::Null) => None,
                Some(Value::String(s)) => {
                    let trimmed = s.trim();
                    (!trimmed.is_empty()).then(|| trimmed.to_string())
                }
                Some(other) => {
                    issues.push(RecordIssue {
                        index,
                        problem: format!("field '{}' is {}, not a string", name, json_kind(other)),
                    });
                    None
                }
            }
        };

        let identifier = field(&input.identifier_field);
        let raw_url = field(&input.url_field);

        records.push(Record {
            index,
            identifier,
            raw_url,
        });
    }

    Ok((records, issues))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
