//! Chromium-based renderer using chromiumoxide

use super::{RenderContext, RenderError, Renderer};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Environment variable naming the Chromium executable
pub const CHROMIUM_ENV: &str = "DATASHEET_MIRROR_CHROMIUM";

const PATH_CANDIDATES: &[&str] = &["chromium", "chromium-browser", "google-chrome"];

const SCROLL_SCRIPT: &str = r#"(() => {
    window.scrollBy(0, STEP);
    const bottom = Math.ceil(window.innerHeight + window.scrollY);
    return bottom >= document.documentElement.scrollHeight;
})()"#;

/// Finds the Chromium executable
///
/// Lookup order: the configured path, the `DATASHEET_MIRROR_CHROMIUM`
/// environment variable, then `chromium`, `chromium-browser` and
/// `google-chrome` on `PATH`.
pub fn find_chromium(configured: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = configured.map(PathBuf::from) {
        if path.exists() {
            return Some(path);
        }
        tracing::warn!("Configured chrome-path {} does not exist", path.display());
    }

    if let Ok(p) = std::env::var(CHROMIUM_ENV) {
        let path = PathBuf::from(p);
        if path.exists() {
            return Some(path);
        }
    }

    PATH_CANDIDATES
        .iter()
        .find_map(|name| which::which(name).ok())
}

struct LaunchedBrowser {
    browser: Browser,
    handler: JoinHandle<()>,
}

type SharedBrowser = Arc<Mutex<Option<LaunchedBrowser>>>;

/// Headless Chromium, launched on the first `new_context`
///
/// Runs that never reach the rendered fallback never start a browser. Each
/// context gets its own incognito browser context, so cookies and storage
/// never leak from one record to the next.
pub struct ChromiumRenderer {
    executable: PathBuf,
    browser: SharedBrowser,
}

impl ChromiumRenderer {
    pub fn new(executable: PathBuf) -> Self {
        Self {
            executable,
            browser: Arc::new(Mutex::new(None)),
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    async fn launch(&self) -> anyhow::Result<LaunchedBrowser> {
        let config = BrowserConfig::builder()
            .chrome_executable(&self.executable)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config).await?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    tracing::debug!("Chromium handler event error: {:?}", event);
                }
            }
        });

        tracing::info!("Launched Chromium from {}", self.executable.display());
        Ok(LaunchedBrowser { browser, handler })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>, RenderError> {
        let mut guard = self.browser.lock().await;

        if guard.is_none() {
            let launched = self
                .launch()
                .await
                .map_err(|e| RenderError::Launch(format!("{e:#}")))?;
            *guard = Some(launched);
        }

        let Some(launched) = guard.as_ref() else {
            return Err(RenderError::Unavailable("browser not running".to_string()));
        };

        let context_id = launched
            .browser
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(|e| RenderError::Page(format!("failed to create browser context: {e}")))?
            .result
            .browser_context_id;

        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id.clone())
            .build()
            .map_err(RenderError::Page)?;

        let page = match launched.browser.new_page(target).await {
            Ok(page) => page,
            Err(e) => {
                dispose_context(&launched.browser, context_id).await;
                return Err(RenderError::Page(format!("failed to open page: {e}")));
            }
        };

        Ok(Box::new(ChromiumContext {
            page,
            context_id,
            browser: Arc::clone(&self.browser),
        }))
    }

    async fn shutdown(&self) -> Result<(), RenderError> {
        let Some(mut launched) = self.browser.lock().await.take() else {
            return Ok(());
        };

        let closed = launched.browser.close().await;
        launched.handler.abort();
        closed
            .map(|_| ())
            .map_err(|e| RenderError::Page(format!("failed to close browser: {e}")))
    }
}

async fn dispose_context(browser: &Browser, context_id: BrowserContextId) {
    if let Err(e) = browser
        .execute(DisposeBrowserContextParams::new(context_id))
        .await
    {
        tracing::debug!("Failed to dispose browser context: {}", e);
    }
}

/// A single Chromium page in its own browser context
pub struct ChromiumContext {
    page: Page,
    context_id: BrowserContextId,
    browser: SharedBrowser,
}

fn page_error(what: &'static str) -> impl FnOnce(chromiumoxide::error::CdpError) -> RenderError {
    move |e| RenderError::Page(format!("{what}: {e}"))
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), RenderError> {
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(RenderError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(RenderError::Timeout(timeout)),
        }
    }

    async fn wait_settled(&mut self, settle: Duration) -> Result<(), RenderError> {
        // No network-idle event here; load completion plus a quiet period
        self.page
            .wait_for_navigation()
            .await
            .map_err(page_error("waiting for load"))?;
        tokio::time::sleep(settle).await;
        Ok(())
    }

    async fn current_url(&self) -> Result<Option<String>, RenderError> {
        self.page.url().await.map_err(page_error("reading URL"))
    }

    async fn html(&self) -> Result<String, RenderError> {
        self.page.content().await.map_err(page_error("reading HTML"))
    }

    async fn scroll_by(&mut self, px: u32) -> Result<bool, RenderError> {
        let script = SCROLL_SCRIPT.replace("STEP", &px.to_string());
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(page_error("scrolling"))?;

        result
            .into_value::<bool>()
            .map_err(|e| RenderError::Page(format!("unexpected scroll result: {e:?}")))
    }

    async fn print_pdf(&mut self) -> Result<Vec<u8>, RenderError> {
        let params = PrintToPdfParams {
            print_background: Some(true),
            ..PrintToPdfParams::default()
        };
        self.page.pdf(params).await.map_err(page_error("printing PDF"))
    }

    async fn close(self: Box<Self>) -> Result<(), RenderError> {
        let ChromiumContext {
            page,
            context_id,
            browser,
        } = *self;

        let closed = page.close().await.map_err(page_error("closing page"));
        if let Some(launched) = browser.lock().await.as_ref() {
            dispose_context(&launched.browser, context_id).await;
        }
        closed
    }
}
