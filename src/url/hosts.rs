use url::Url;

/// Checks if a host matches a wildcard pattern
///
/// This function supports two types of patterns:
/// 1. Exact match: "renesas.com" matches only "renesas.com"
/// 2. Wildcard match: "*.renesas.com" matches:
///    - "renesas.com" (the bare host)
///    - "www.renesas.com" (single subdomain)
///    - "cdn.eu.renesas.com" (nested subdomains)
///
/// Both sides are compared case-insensitively.
///
/// # Examples
///
/// ```
/// use datasheet_mirror::url::matches_wildcard;
///
/// assert!(matches_wildcard("media.digikey.com", "media.digikey.com"));
/// assert!(!matches_wildcard("media.digikey.com", "digikey.com"));
///
/// assert!(matches_wildcard("*.renesas.com", "renesas.com"));
/// assert!(matches_wildcard("*.renesas.com", "WWW.Renesas.com"));
/// assert!(!matches_wildcard("*.renesas.com", "notrenesas.com"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    let pattern = pattern.to_ascii_lowercase();
    let candidate = candidate.to_ascii_lowercase();

    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base || candidate.ends_with(&format!(".{}", base))
    } else {
        candidate == pattern
    }
}

/// A configured list of host patterns (trusted sources, viewer hosts)
#[derive(Debug, Clone, Default)]
pub struct HostList {
    patterns: Vec<String>,
}

impl HostList {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true if any pattern matches the host
    pub fn matches_host(&self, host: &str) -> bool {
        self.patterns
            .iter()
            .any(|pattern| matches_wildcard(pattern, host))
    }

    /// Returns true if the URL's host is on the list
    pub fn matches(&self, url: &Url) -> bool {
        url.host_str()
            .map(|host| self.matches_host(host))
            .unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }
}
