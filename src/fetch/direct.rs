//! Direct download under rotating client identities

use super::{FetchError, FetchStrategy, Fetched};
use crate::config::FetchConfig;
use crate::journal::PersistError;
use crate::state::FetchState;
use crate::url::HostList;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::Client;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use url::Url;

/// Sibling path a download streams into before it is complete
pub fn part_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("download"));
    name.push(".part");
    destination.with_file_name(name)
}

/// Plain HTTP GET, retried once per identity in the pool
///
/// Each attempt streams the body into `<destination>.part` and renames it
/// onto the destination only once the body is complete. Headers and body
/// together are bounded by the configured timeout; on expiry the request is
/// dropped and the partial file removed.
///
/// Viewer hosts are skipped: a direct GET there only returns the viewer's
/// HTML shell.
pub struct DirectStrategy {
    client: Client,
    identities: Vec<String>,
    timeout: Duration,
    viewer_hosts: HostList,
}

impl DirectStrategy {
    pub fn new(
        client: Client,
        identities: Vec<String>,
        timeout: Duration,
        viewer_hosts: HostList,
    ) -> Self {
        Self {
            client,
            identities,
            timeout,
            viewer_hosts,
        }
    }

    pub fn from_config(client: Client, config: &FetchConfig) -> Self {
        Self::new(
            client,
            config.user_agents.clone(),
            Duration::from_secs(config.timeout_secs),
            HostList::new(config.viewer_hosts.iter().cloned()),
        )
    }

    /// Downloads `url` to `destination`, trying each identity in order
    ///
    /// Ignores the viewer-host filter; the rendered strategy uses this for
    /// documents it found embedded in a page.
    pub async fn download(&self, url: &Url, destination: &Path) -> Result<u64, FetchError> {
        let mut last = String::from("no identities configured");

        for (position, identity) in self.identities.iter().enumerate() {
            tracing::debug!(url = %url, identity = position + 1, "Direct attempt");

            match self.attempt_once(url, destination, identity).await {
                Ok(bytes) => {
                    tracing::debug!(url = %url, bytes, "Direct download complete");
                    return Ok(bytes);
                }
                Err(e @ FetchError::Persist(_)) => return Err(e),
                Err(e) => {
                    tracing::warn!(url = %url, identity = position + 1, "Direct attempt failed: {}", e);
                    last = e.to_string();
                }
            }
        }

        Err(FetchError::IdentitiesExhausted {
            attempts: self.identities.len(),
            last,
        })
    }

    async fn attempt_once(
        &self,
        url: &Url,
        destination: &Path,
        identity: &str,
    ) -> Result<u64, FetchError> {
        let part = part_path(destination);

        let outcome =
            tokio::time::timeout(self.timeout, self.stream_to(url, &part, identity)).await;

        match outcome {
            Ok(Ok(bytes)) => {
                tokio::fs::rename(&part, destination)
                    .await
                    .map_err(PersistError::io(destination))?;
                Ok(bytes)
            }
            Ok(Err(e)) => {
                remove_partial(&part).await;
                Err(e)
            }
            Err(_) => {
                remove_partial(&part).await;
                Err(FetchError::Timeout(self.timeout))
            }
        }
    }

    async fn stream_to(&self, url: &Url, part: &Path, identity: &str) -> Result<u64, FetchError> {
        let network = |source| FetchError::Network {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url.clone())
            .header(USER_AGENT, identity)
            .header(ACCEPT, "*/*")
            .send()
            .await
            .map_err(network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut file = tokio::fs::File::create(part)
            .await
            .map_err(PersistError::io(part))?;

        let mut body = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(network)?;
            file.write_all(&chunk).await.map_err(PersistError::io(part))?;
            written += chunk.len() as u64;
        }

        file.flush().await.map_err(PersistError::io(part))?;
        file.sync_all().await.map_err(PersistError::io(part))?;

        Ok(written)
    }
}

async fn remove_partial(part: &Path) {
    match tokio::fs::remove_file(part).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove partial file {}: {}", part.display(), e),
    }
}

#[async_trait]
impl FetchStrategy for DirectStrategy {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn applies_to(&self, url: &Url) -> bool {
        !self.viewer_hosts.matches(url)
    }

    async fn attempt(&self, url: &Url, destination: &Path) -> Result<Fetched, FetchError> {
        let bytes = self.download(url, destination).await?;
        Ok(Fetched {
            bytes,
            state: FetchState::DirectSuccess,
        })
    }
}
