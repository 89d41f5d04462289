use crate::config::FetchConfig;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;

/// Maximum redirect hops followed before a request fails
pub const MAX_REDIRECTS: usize = 10;

/// Builds the HTTP client shared by every direct attempt
///
/// No overall request timeout is set here: each attempt (headers and body)
/// is bounded as a whole by the direct strategy. The `User-Agent` header is
/// set per request from the identity pool.
///
/// # Example
///
/// ```no_run
/// use datasheet_mirror::config::FetchConfig;
/// use datasheet_mirror::fetch::build_http_client;
///
/// let client = build_http_client(&FetchConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&FetchConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_build_http_client_custom_connect_timeout() {
        let config = FetchConfig {
            connect_timeout_secs: 2,
            ..FetchConfig::default()
        };
        assert!(build_http_client(&config).is_ok());
    }
}
