//! Browser rendering abstraction
//!
//! Defines the `Renderer` and `RenderContext` traits the rendered fetch
//! strategy drives. The production backend is headless Chromium via
//! chromiumoxide; [`NoopRenderer`] stands in when no browser is available.

mod chromium;

pub use chromium::{find_chromium, ChromiumRenderer, CHROMIUM_ENV};

use crate::config::RenderConfig;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a rendering backend
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Rendering unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Navigation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Page operation failed: {0}")]
    Page(String),
}

/// A browser engine that hands out page contexts
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Opens a fresh page
    async fn new_context(&self) -> Result<Box<dyn RenderContext>, RenderError>;

    /// Releases the engine; later calls to `new_context` may relaunch it
    async fn shutdown(&self) -> Result<(), RenderError> {
        Ok(())
    }
}

/// A single browser page
///
/// Callers must `close` every context they open, on every path.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Loads `url`, giving up after `timeout`
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), RenderError>;

    /// Waits for the load to finish, then for `settle` of quiet time
    async fn wait_settled(&mut self, settle: Duration) -> Result<(), RenderError>;

    /// URL of the loaded document, after redirects
    async fn current_url(&self) -> Result<Option<String>, RenderError>;

    /// Serialized DOM of the loaded document
    async fn html(&self) -> Result<String, RenderError>;

    /// Scrolls down by `px`; returns true once the bottom of the page is reached
    async fn scroll_by(&mut self, px: u32) -> Result<bool, RenderError>;

    /// Prints the current page to PDF
    async fn print_pdf(&mut self) -> Result<Vec<u8>, RenderError>;

    async fn close(self: Box<Self>) -> Result<(), RenderError>;
}

/// A renderer that never renders
///
/// Used when rendering is disabled or Chromium is missing. The rendered
/// strategy then fails every attempt and records exhaust normally.
#[derive(Debug, Clone, Default)]
pub struct NoopRenderer {
    reason: String,
}

impl NoopRenderer {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Renderer for NoopRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>, RenderError> {
        Err(RenderError::Unavailable(self.reason.clone()))
    }
}

/// Picks the rendering backend for a run
pub fn build_renderer(config: &RenderConfig) -> Arc<dyn Renderer> {
    if !config.enabled {
        tracing::info!("Rendering disabled; rendered fallback will fail fast");
        return Arc::new(NoopRenderer::new("rendering disabled in configuration"));
    }

    match find_chromium(config.chrome_path.as_deref()) {
        Some(path) => {
            tracing::info!("Using Chromium at {}", path.display());
            Arc::new(ChromiumRenderer::new(path))
        }
        None => {
            tracing::warn!(
                "Chromium not found (set render.chrome-path or {}); rendered fallback disabled",
                CHROMIUM_ENV
            );
            Arc::new(NoopRenderer::new("Chromium executable not found"))
        }
    }
}
