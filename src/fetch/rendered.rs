//! Headless-browser fallback

use super::{DirectStrategy, FetchError, FetchStrategy, Fetched};
use crate::config::RenderConfig;
use crate::journal::write_atomic_async;
use crate::render::{RenderContext, RenderError, Renderer};
use crate::state::FetchState;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Element/attribute pairs searched for an embedded document, in priority order
const EMBED_SOURCES: &[(&str, &str)] = &[
    ("iframe[src]", "src"),
    ("embed[src]", "src"),
    ("object[data]", "data"),
    ("a[href]", "href"),
];

/// Timing and scrolling knobs for the rendered strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSettings {
    pub navigation_timeout: Duration,
    pub settle: Duration,
    pub scroll_step_px: u32,
    pub max_scrolls: u32,
    pub scroll_pause: Duration,
}

impl From<&RenderConfig> for RenderSettings {
    fn from(config: &RenderConfig) -> Self {
        Self {
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
            settle: Duration::from_millis(config.settle_ms),
            scroll_step_px: config.scroll_step_px,
            max_scrolls: config.max_scrolls,
            scroll_pause: Duration::from_millis(config.scroll_pause_ms),
        }
    }
}

/// Finds the first embedded document whose URL carries `extension_marker`
///
/// Searches `iframe[src]`, `embed[src]`, `object[data]` and finally
/// `a[href]`, resolving each reference against `base`. Only absolute http(s)
/// results count; the marker match is ASCII case-insensitive.
///
/// # Example
///
/// ```
/// use datasheet_mirror::fetch::find_embedded_document;
/// use url::Url;
///
/// let base = Url::parse("https://viewer.example.com/doc/7").unwrap();
/// let html = r#"<iframe src="/files/7.PDF"></iframe>"#;
/// let found = find_embedded_document(html, &base, ".pdf").unwrap();
/// assert_eq!(found.as_str(), "https://viewer.example.com/files/7.PDF");
/// ```
pub fn find_embedded_document(html: &str, base: &Url, extension_marker: &str) -> Option<Url> {
    let document = Html::parse_document(html);
    let marker = extension_marker.to_ascii_lowercase();

    for (selector, attribute) in EMBED_SOURCES {
        let Ok(selector) = Selector::parse(selector) else {
            continue;
        };

        let found = document
            .select(&selector)
            .filter_map(|element| element.value().attr(attribute))
            .filter_map(|reference| base.join(reference.trim()).ok())
            .filter(|candidate| matches!(candidate.scheme(), "http" | "https"))
            .find(|candidate| candidate.as_str().to_ascii_lowercase().contains(&marker));

        if found.is_some() {
            return found;
        }
    }

    None
}

/// Renders the page in a headless browser
///
/// If the rendered page embeds the document, the embedded URL is handed to
/// the direct strategy. Otherwise the page is scrolled to trigger lazy
/// content and printed to PDF.
pub struct RenderedStrategy {
    renderer: Arc<dyn Renderer>,
    direct: Arc<DirectStrategy>,
    settings: RenderSettings,
    extension_marker: String,
}

impl RenderedStrategy {
    pub fn new(
        renderer: Arc<dyn Renderer>,
        direct: Arc<DirectStrategy>,
        settings: RenderSettings,
        extension: &str,
    ) -> Self {
        Self {
            renderer,
            direct,
            settings,
            extension_marker: format!(".{}", extension.to_ascii_lowercase()),
        }
    }

    /// Loads the page and looks for an embedded document
    async fn locate(
        &self,
        ctx: &mut dyn RenderContext,
        url: &Url,
    ) -> Result<Option<Url>, RenderError> {
        ctx.navigate(url.as_str(), self.settings.navigation_timeout)
            .await?;
        ctx.wait_settled(self.settings.settle).await?;

        let base = ctx
            .current_url()
            .await?
            .and_then(|current| Url::parse(&current).ok())
            .unwrap_or_else(|| url.clone());
        let html = ctx.html().await?;

        // The page itself is not a useful delegation target
        Ok(find_embedded_document(&html, &base, &self.extension_marker)
            .filter(|inner| inner != url))
    }

    async fn capture(&self, ctx: &mut dyn RenderContext) -> Result<Vec<u8>, RenderError> {
        for _ in 0..self.settings.max_scrolls {
            if ctx.scroll_by(self.settings.scroll_step_px).await? {
                break;
            }
            tokio::time::sleep(self.settings.scroll_pause).await;
        }

        ctx.print_pdf().await
    }
}

async fn release(ctx: Box<dyn RenderContext>) {
    if let Err(e) = ctx.close().await {
        tracing::warn!("Failed to close render context: {}", e);
    }
}

#[async_trait]
impl FetchStrategy for RenderedStrategy {
    fn name(&self) -> &'static str {
        "rendered"
    }

    async fn attempt(&self, url: &Url, destination: &Path) -> Result<Fetched, FetchError> {
        let mut ctx = self.renderer.new_context().await?;

        let located = self.locate(ctx.as_mut(), url).await;
        let inner = match located {
            Ok(inner) => inner,
            Err(e) => {
                release(ctx).await;
                return Err(e.into());
            }
        };

        if let Some(inner) = inner {
            release(ctx).await;
            tracing::info!(url = %url, inner = %inner, "Found embedded document");
            let bytes = self.direct.download(&inner, destination).await?;
            return Ok(Fetched {
                bytes,
                state: FetchState::RenderedSuccess,
            });
        }

        tracing::debug!(url = %url, "No embedded document, capturing page");
        let captured = self.capture(ctx.as_mut()).await;
        release(ctx).await;

        let pdf = captured?;
        if pdf.is_empty() {
            return Err(RenderError::Page("page capture produced no output".to_string()).into());
        }

        write_atomic_async(destination, &pdf).await?;
        Ok(Fetched {
            bytes: pdf.len() as u64,
            state: FetchState::RenderedSuccess,
        })
    }
}
