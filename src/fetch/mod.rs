//! Fetch strategies and the chain that runs them
//!
//! A record's resolved URL goes through:
//! - a trusted-host check that skips fetching entirely
//! - [`DirectStrategy`]: streamed GET under each identity in turn
//! - [`RenderedStrategy`]: headless browser fallback that either finds the
//!   embedded document or captures the page as a PDF
//!
//! The first strategy that succeeds wins.

mod chain;
mod client;
mod direct;
mod rendered;

pub use chain::{ChainOutcome, FetchChain, StrategyFailure};
pub use client::{build_http_client, MAX_REDIRECTS};
pub use direct::{part_path, DirectStrategy};
pub use rendered::{find_embedded_document, RenderSettings, RenderedStrategy};

use crate::journal::PersistError;
use crate::render::RenderError;
use crate::state::FetchState;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Why a single strategy attempt failed
///
/// Everything except `Persist` is transient: the chain records it and moves
/// on to the next strategy. `Persist` means the local disk refused a write
/// and stops the run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Request to {url} failed: {source}")]
    Network {
        url: String,
        source: reqwest::Error,
    },

    #[error("Attempt timed out after {0:?}")]
    Timeout(Duration),

    #[error("All {attempts} identities failed, last error: {last}")]
    IdentitiesExhausted { attempts: usize, last: String },

    #[error("Render failed: {0}")]
    Render(#[from] RenderError),

    #[error("Persist failed: {0}")]
    Persist(#[from] PersistError),
}

impl FetchError {
    pub fn is_persist(&self) -> bool {
        matches!(self, FetchError::Persist(_))
    }
}

/// A successful strategy attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fetched {
    /// Bytes written to the destination
    pub bytes: u64,
    pub state: FetchState,
}

/// One way of getting a document onto disk
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    /// Short name used in logs and failure summaries
    fn name(&self) -> &'static str;

    /// Whether this strategy should be tried for `url` at all
    fn applies_to(&self, _url: &Url) -> bool {
        true
    }

    /// Tries to write the document at `url` to `destination`
    ///
    /// On success `destination` holds the complete document; on failure it
    /// is left untouched.
    async fn attempt(&self, url: &Url, destination: &Path) -> Result<Fetched, FetchError>;
}
