//! Datasheet-Mirror: a resumable datasheet fetcher
//!
//! This crate walks an ordered list of part records, resolves each record's
//! datasheet URL, retrieves the file through an ordered chain of fetch
//! strategies, and keeps restart-safe success/failure ledgers plus a
//! checkpoint so an interrupted run resumes where it stopped.

pub mod auth;
pub mod config;
pub mod fetch;
pub mod journal;
pub mod pipeline;
pub mod records;
pub mod render;
pub mod report;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Datasheet-Mirror operations
///
/// Only failures that stop the whole run end up here. Per-attempt fetch
/// failures stay inside the strategy chain and become ledger entries.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Record ingestion error: {0}")]
    Records(#[from] records::RecordError),

    #[error("Persist error: {0}")]
    Persist(#[from] journal::PersistError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid host pattern: {0}")]
    InvalidPattern(String),
}

/// Reasons a raw datasheet URL cannot be turned into a fetchable target
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("URL is missing or empty")]
    Missing,

    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("Redirect parameter '{0}' is empty")]
    BadRedirect(String),
}

/// Result type alias for Datasheet-Mirror operations
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use pipeline::{run_pipeline, Orchestrator, RunReport};
pub use records::Record;
pub use state::FetchState;
pub use url::{ResolvedTarget, UrlResolver};
