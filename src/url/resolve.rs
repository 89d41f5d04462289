use crate::config::{QueryPolicy, ResolverConfig};
use crate::UrlError;
use std::borrow::Cow;
use url::Url;

/// Outcome of resolving a raw datasheet URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedTarget {
    /// An absolute http(s) URL worth fetching
    Fetchable(Url),
    /// The input cannot be fetched; the reason is kept for logging
    Unresolvable(UrlError),
}

impl ResolvedTarget {
    /// Returns the fetchable URL, if any
    pub fn url(&self) -> Option<&Url> {
        match self {
            Self::Fetchable(url) => Some(url),
            Self::Unresolvable(_) => None,
        }
    }

    pub fn is_fetchable(&self) -> bool {
        matches!(self, Self::Fetchable(_))
    }
}

/// Turns raw datasheet URLs into fetchable targets
///
/// # Resolution Rules
///
/// Applied in order:
///
/// 1. Absent or blank input is unresolvable
/// 2. Protocol-relative input (`//host/...`) gets the default scheme
/// 3. A redirect parameter (`gotoUrl` by default) carrying the real
///    destination replaces the working URL with its decoded value, which
///    goes through rule 2 again
/// 4. Anything glued onto the path after the first `.<extension>` is cut
///    off; a following query string is kept or dropped per [`QueryPolicy`]
/// 5. The result must parse as an absolute http(s) URL with a host
///
/// Resolution never touches the network.
///
/// # Examples
///
/// ```
/// use datasheet_mirror::config::ResolverConfig;
/// use datasheet_mirror::url::UrlResolver;
///
/// let resolver = UrlResolver::new(&ResolverConfig::default(), "pdf");
/// let target = resolver.resolve(Some("//x.com/view?gotoUrl=https%3A%2F%2Fcdn.x.com%2Fa.pdf"));
/// assert_eq!(target.url().unwrap().as_str(), "https://cdn.x.com/a.pdf");
/// ```
#[derive(Debug, Clone)]
pub struct UrlResolver {
    default_scheme: String,
    redirect_params: Vec<String>,
    /// `.pdf`, lowercase
    extension_marker: String,
    query_policy: QueryPolicy,
}

impl UrlResolver {
    /// Creates a resolver for artifacts with the given extension (no leading dot)
    pub fn new(config: &ResolverConfig, extension: &str) -> Self {
        Self {
            default_scheme: config.default_scheme.clone(),
            redirect_params: config.redirect_params.clone(),
            extension_marker: format!(".{}", extension.to_ascii_lowercase()),
            query_policy: config.query_policy,
        }
    }

    /// Resolves a raw URL into a [`ResolvedTarget`]
    pub fn resolve(&self, raw: Option<&str>) -> ResolvedTarget {
        match self.try_resolve(raw) {
            Ok(url) => ResolvedTarget::Fetchable(url),
            Err(reason) => ResolvedTarget::Unresolvable(reason),
        }
    }

    fn try_resolve(&self, raw: Option<&str>) -> Result<Url, UrlError> {
        let raw = raw
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(UrlError::Missing)?;

        let mut working = self.complete_scheme(raw).into_owned();

        if let Some(destination) = self.extract_redirect(&working)? {
            working = self.complete_scheme(&destination).into_owned();
        }

        let working = self.truncate_after_extension(&working);
        parse_fetchable(&working)
    }

    /// Rule 2: `//host/path` -> `https://host/path`
    fn complete_scheme<'a>(&self, url: &'a str) -> Cow<'a, str> {
        if url.starts_with("//") {
            Cow::Owned(format!("{}:{}", self.default_scheme, url))
        } else {
            Cow::Borrowed(url)
        }
    }

    /// Rule 3: pulls the destination out of a redirect parameter
    fn extract_redirect(&self, url: &str) -> Result<Option<String>, UrlError> {
        let carries_redirect = self
            .redirect_params
            .iter()
            .any(|param| url.contains(&format!("{}=", param)));
        if !carries_redirect {
            return Ok(None);
        }

        let parsed = Url::parse(url).map_err(|e| UrlError::Parse(e.to_string()))?;

        for param in &self.redirect_params {
            let value = parsed
                .query_pairs()
                .find(|(key, _)| key == param.as_str())
                .map(|(_, value)| value.into_owned());

            if let Some(value) = value {
                let value = value.trim().to_string();
                if value.is_empty() {
                    return Err(UrlError::BadRedirect(param.clone()));
                }
                return Ok(Some(decode_nested(value)));
            }
        }

        Ok(None)
    }

    /// Rule 4: cuts the URL right after the first extension marker in the path
    fn truncate_after_extension<'a>(&self, url: &'a str) -> Cow<'a, str> {
        let lower = url.to_ascii_lowercase();
        let search_from = path_start(&lower);

        let Some(offset) = lower[search_from..].find(&self.extension_marker) else {
            return Cow::Borrowed(url);
        };
        let end = search_from + offset + self.extension_marker.len();

        match url[end..].chars().next() {
            None => Cow::Borrowed(url),
            Some('?') if self.query_policy == QueryPolicy::Keep => Cow::Borrowed(url),
            Some(_) => Cow::Owned(url[..end].to_string()),
        }
    }
}

/// Byte offset where the path begins, so a host like `www.pdfserv.com` is
/// never mistaken for an extension
fn path_start(url: &str) -> usize {
    match url.find("://") {
        Some(scheme_end) => {
            let authority = scheme_end + 3;
            url[authority..]
                .find(|c: char| matches!(c, '/' | '?' | '#'))
                .map(|i| authority + i)
                .unwrap_or(url.len())
        }
        None => 0,
    }
}

/// Decodes a redirect value a second time when it was encoded twice
/// (`https%3A%2F%2F...` surviving the first query decoding)
fn decode_nested(value: String) -> String {
    let lower = value.to_ascii_lowercase();
    let still_encoded = lower.starts_with("http%3a")
        || lower.starts_with("https%3a")
        || lower.starts_with("%2f%2f");
    if !still_encoded {
        return value;
    }

    // Keep a literal '+' from turning into a space
    let escaped = value.replace('+', "%2B");
    url::form_urlencoded::parse(format!("v={}", escaped).as_bytes())
        .next()
        .map(|(_, decoded)| decoded.into_owned())
        .unwrap_or(value)
}

/// Rule 5: the working string must be an absolute http(s) URL with a host
fn parse_fetchable(url: &str) -> Result<Url, UrlError> {
    let parsed = Url::parse(url).map_err(|e| UrlError::Parse(e.to_string()))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(UrlError::UnsupportedScheme(parsed.scheme().to_string()));
    }

    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(parsed),
        _ => Err(UrlError::MissingHost),
    }
}
