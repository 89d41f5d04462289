//! Access tokens for authenticated catalog APIs
//!
//! The fetch pipeline never needs a token. This is for collaborators that
//! talk to the parts-catalog API producing the input records.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;

/// Lifetime assumed when the issuer does not state one
pub const FALLBACK_EXPIRES_IN_SECS: u64 = 600;

/// Upper bound on a cached token's lifetime
const MAX_LIFETIME_SECS: i64 = 365 * 24 * 3600;

pub const TOKEN_URL_ENV: &str = "API_TOKEN_URL";
pub const CLIENT_ID_ENV: &str = "CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "CLIENT_SECRET";

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Token endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Token response is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Token response has no access_token")]
    MissingToken,

    #[error("Missing environment variable {0}")]
    MissingEnv(&'static str),
}

/// A token as handed out by the issuer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub access_token: String,
    /// Lifetime in seconds, if the issuer stated one
    pub expires_in: Option<u64>,
}

/// Something that can issue a fresh token
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn issue(&self) -> Result<IssuedToken, TokenError>;
}

/// Source of the current instant
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Caches a token until its expiry instant
///
/// `get_valid_token` only returns a token whose expiry lies strictly in the
/// future; otherwise it asks the source for a new one. Concurrent callers
/// share a single refresh.
pub struct TokenProvider<S, C = SystemClock> {
    source: S,
    clock: C,
    cached: Mutex<Option<CachedToken>>,
}

impl<S: TokenSource> TokenProvider<S, SystemClock> {
    pub fn new(source: S) -> Self {
        Self::with_clock(source, SystemClock)
    }
}

impl<S: TokenSource, C: Clock> TokenProvider<S, C> {
    pub fn with_clock(source: S, clock: C) -> Self {
        Self {
            source,
            clock,
            cached: Mutex::new(None),
        }
    }

    pub async fn get_valid_token(&self) -> Result<String, TokenError> {
        let mut cached = self.cached.lock().await;

        if let Some(current) = cached.as_ref() {
            if self.clock.now() < current.expires_at {
                return Ok(current.token.clone());
            }
            tracing::debug!("Access token expired, requesting a new one");
        }

        let issued = self.source.issue().await?;
        let lifetime = issued.expires_in.unwrap_or(FALLBACK_EXPIRES_IN_SECS);
        let lifetime = Duration::seconds(
            i64::try_from(lifetime)
                .unwrap_or(MAX_LIFETIME_SECS)
                .min(MAX_LIFETIME_SECS),
        );
        let expires_at = self.clock.now() + lifetime;

        tracing::info!("Fetched access token valid until {}", expires_at.to_rfc3339());

        *cached = Some(CachedToken {
            token: issued.access_token.clone(),
            expires_at,
        });
        Ok(issued.access_token)
    }

    /// Drops the cached token so the next call refreshes
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
}

/// OAuth2 client-credentials exchange
pub struct ClientCredentialsSource {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl ClientCredentialsSource {
    pub fn new(
        client: Client,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client,
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Reads `API_TOKEN_URL`, `CLIENT_ID` and `CLIENT_SECRET`
    pub fn from_env(client: Client) -> Result<Self, TokenError> {
        let var = |name: &'static str| std::env::var(name).map_err(|_| TokenError::MissingEnv(name));
        Ok(Self::new(
            client,
            var(TOKEN_URL_ENV)?,
            var(CLIENT_ID_ENV)?,
            var(CLIENT_SECRET_ENV)?,
        ))
    }
}

#[async_trait]
impl TokenSource for ClientCredentialsSource {
    async fn issue(&self) -> Result<IssuedToken, TokenError> {
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(TokenError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TokenResponse = serde_json::from_str(&body)?;
        let access_token = parsed
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(TokenError::MissingToken)?;

        Ok(IssuedToken {
            access_token,
            // 0 means "not stated" for some issuers
            expires_in: parsed.expires_in.filter(|&secs| secs > 0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex as StdMutex};
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Clone)]
    struct ManualClock(Arc<StdMutex<DateTime<Utc>>>);

    impl ManualClock {
        fn new() -> Self {
            Self(Arc::new(StdMutex::new(
                DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
                    .unwrap()
                    .with_timezone(&Utc),
            )))
        }

        fn advance(&self, secs: i64) {
            let mut now = self.0.lock().unwrap();
            *now = *now + Duration::seconds(secs);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    struct CountingSource {
        calls: AtomicUsize,
        expires_in: Option<u64>,
    }

    #[async_trait]
    impl TokenSource for CountingSource {
        async fn issue(&self) -> Result<IssuedToken, TokenError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(IssuedToken {
                access_token: format!("token-{}", n),
                expires_in: self.expires_in,
            })
        }
    }

    fn provider(expires_in: Option<u64>) -> (TokenProvider<CountingSource, ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let source = CountingSource {
            calls: AtomicUsize::new(0),
            expires_in,
        };
        (TokenProvider::with_clock(source, clock.clone()), clock)
    }

    #[tokio::test]
    async fn test_token_cached_until_expiry() {
        let (provider, clock) = provider(Some(60));

        assert_eq!(provider.get_valid_token().await.unwrap(), "token-1");
        clock.advance(59);
        assert_eq!(provider.get_valid_token().await.unwrap(), "token-1");

        // Expiry instant itself is no longer valid
        clock.advance(1);
        assert_eq!(provider.get_valid_token().await.unwrap(), "token-2");
    }

    #[tokio::test]
    async fn test_fallback_lifetime() {
        let (provider, clock) = provider(None);

        assert_eq!(provider.get_valid_token().await.unwrap(), "token-1");
        clock.advance(599);
        assert_eq!(provider.get_valid_token().await.unwrap(), "token-1");
        clock.advance(1);
        assert_eq!(provider.get_valid_token().await.unwrap(), "token-2");
    }

    #[tokio::test]
    async fn test_invalidate_forces_refresh() {
        let (provider, _clock) = provider(Some(3600));

        provider.get_valid_token().await.unwrap();
        provider.invalidate().await;
        assert_eq!(provider.get_valid_token().await.unwrap(), "token-2");
    }

    #[tokio::test]
    async fn test_client_credentials_exchange() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("client_id=abc"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"access_token": "xyz", "expires_in": 1800}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let source = ClientCredentialsSource::new(
            Client::new(),
            format!("{}/oauth2/token", server.uri()),
            "abc",
            "s3cret",
        );

        let issued = source.issue().await.unwrap();
        assert_eq!(issued.access_token, "xyz");
        assert_eq!(issued.expires_in, Some(1800));
    }

    #[tokio::test]
    async fn test_client_credentials_missing_expiry_and_errors() {
        let server = MockServer::start().await;
        Mock::given(path("/no-expiry"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"access_token": "t"}"#))
            .mount(&server)
            .await;
        Mock::given(path("/no-token"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"expires_in": 5}"#))
            .mount(&server)
            .await;
        Mock::given(path("/denied"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
            .mount(&server)
            .await;

        let source = |p: &str| {
            ClientCredentialsSource::new(Client::new(), format!("{}{}", server.uri(), p), "a", "b")
        };

        let issued = source("/no-expiry").issue().await.unwrap();
        assert_eq!(issued.expires_in, None);

        assert!(matches!(
            source("/no-token").issue().await,
            Err(TokenError::MissingToken)
        ));

        match source("/denied").issue().await {
            Err(TokenError::Status { status, body }) => {
                assert_eq!(status, 401);
                assert_eq!(body, "invalid_client");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
