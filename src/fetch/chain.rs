use super::{DirectStrategy, FetchError, FetchStrategy, RenderSettings, RenderedStrategy};
use crate::config::Config;
use crate::journal::PersistError;
use crate::render::Renderer;
use crate::state::FetchState;
use crate::url::HostList;
use reqwest::Client;
use std::path::Path;
use std::sync::Arc;
use url::Url;

/// A strategy that was tried and failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyFailure {
    pub strategy: &'static str,
    pub reason: String,
}

/// How the chain settled a URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainOutcome {
    /// Host is trusted; nothing was fetched or written
    Trusted,
    /// A strategy wrote the document to the destination
    Fetched { state: FetchState, bytes: u64 },
    /// Every applicable strategy failed
    Exhausted { failures: Vec<StrategyFailure> },
}

impl ChainOutcome {
    /// Terminal fetch state this outcome corresponds to
    pub fn state(&self) -> FetchState {
        match self {
            ChainOutcome::Trusted => FetchState::TrustedSuccess,
            ChainOutcome::Fetched { state, .. } => *state,
            ChainOutcome::Exhausted { .. } => FetchState::Exhausted,
        }
    }
}

/// Ordered list of fetch strategies with a trusted-host short circuit
///
/// # Order
///
/// 1. Trusted host → [`ChainOutcome::Trusted`], no strategy runs
/// 2. Each strategy whose `applies_to` accepts the URL, in order
/// 3. First success wins; otherwise [`ChainOutcome::Exhausted`]
///
/// A persistence failure inside any strategy stops the chain and is returned
/// as `Err`; it is never treated as "try the next strategy".
pub struct FetchChain {
    trusted: HostList,
    strategies: Vec<Arc<dyn FetchStrategy>>,
}

impl FetchChain {
    pub fn new(trusted: HostList) -> Self {
        Self {
            trusted,
            strategies: Vec::new(),
        }
    }

    /// Appends a strategy at the end of the chain
    pub fn with_strategy(mut self, strategy: Arc<dyn FetchStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Builds the default `[direct, rendered]` chain
    pub fn from_config(config: &Config, client: Client, renderer: Arc<dyn Renderer>) -> Self {
        let direct = Arc::new(DirectStrategy::from_config(client, &config.fetch));
        let rendered = Arc::new(RenderedStrategy::new(
            renderer,
            Arc::clone(&direct),
            RenderSettings::from(&config.render),
            &config.output.extension,
        ));

        Self::new(HostList::new(config.fetch.trusted_hosts.iter().cloned()))
            .with_strategy(direct)
            .with_strategy(rendered)
    }

    /// Strategy names in run order
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn is_trusted(&self, url: &Url) -> bool {
        self.trusted.matches(url)
    }

    /// Settles `url`, writing the document to `destination` when fetched
    pub async fn run(&self, url: &Url, destination: &Path) -> Result<ChainOutcome, PersistError> {
        if self.is_trusted(url) {
            tracing::debug!(url = %url, "Trusted host, skipping fetch");
            return Ok(ChainOutcome::Trusted);
        }

        let mut failures = Vec::new();

        for strategy in &self.strategies {
            if !strategy.applies_to(url) {
                tracing::debug!(url = %url, strategy = strategy.name(), "Strategy does not apply");
                continue;
            }

            match strategy.attempt(url, destination).await {
                Ok(fetched) => {
                    return Ok(ChainOutcome::Fetched {
                        state: fetched.state,
                        bytes: fetched.bytes,
                    });
                }
                Err(FetchError::Persist(e)) => {
                    tracing::error!(url = %url, strategy = strategy.name(), "Persist failure: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(url = %url, strategy = strategy.name(), "Strategy failed: {}", e);
                    failures.push(StrategyFailure {
                        strategy: strategy.name(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(ChainOutcome::Exhausted { failures })
    }
}
