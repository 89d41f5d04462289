use serde::Deserialize;

/// Main configuration structure for Datasheet-Mirror
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub input: InputConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

/// Where the record collection comes from and which fields to read
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct InputConfig {
    /// Path to the JSON array of input records (can be overridden on the CLI)
    #[serde(default)]
    pub path: Option<String>,

    /// Field holding the part identifier
    #[serde(default = "default_identifier_field")]
    pub identifier_field: String,

    /// Field holding the raw datasheet URL
    #[serde(default = "default_url_field")]
    pub url_field: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: None,
            identifier_field: default_identifier_field(),
            url_field: default_url_field(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Directory receiving artifacts, the checkpoint and both ledgers
    pub directory: String,

    /// URL prefix under which fetched artifacts are published
    pub mirror_base: String,

    /// Artifact file extension, without the leading dot
    #[serde(default = "default_extension")]
    pub extension: String,
}

/// What to do with a query string that follows the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryPolicy {
    /// `a.pdf?v=2` stays `a.pdf?v=2`
    #[default]
    Keep,
    /// `a.pdf?v=2` becomes `a.pdf`
    Drop,
}

/// URL resolution settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResolverConfig {
    /// Scheme used to complete protocol-relative URLs
    #[serde(default = "default_scheme")]
    pub default_scheme: String,

    /// Query parameters that carry the real destination URL
    #[serde(default = "default_redirect_params")]
    pub redirect_params: Vec<String>,

    #[serde(default)]
    pub query_policy: QueryPolicy,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            default_scheme: default_scheme(),
            redirect_params: default_redirect_params(),
            query_policy: QueryPolicy::default(),
        }
    }
}

/// Fetch strategy settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FetchConfig {
    /// Upper bound for a single direct attempt, headers and body included (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// TCP/TLS connect timeout (seconds)
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Identity pool, tried in order
    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,

    /// Host patterns whose URLs are recorded as-is without fetching
    #[serde(default)]
    pub trusted_hosts: Vec<String>,

    /// Host patterns serving client-rendered document viewers
    #[serde(default)]
    pub viewer_hosts: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            user_agents: default_user_agents(),
            trusted_hosts: Vec::new(),
            viewer_hosts: Vec::new(),
        }
    }
}

/// Headless rendering settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RenderConfig {
    /// Disable to never launch a browser
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Explicit Chromium executable
    #[serde(default)]
    pub chrome_path: Option<String>,

    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,

    /// Pause after load for client-side rendering (milliseconds)
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    #[serde(default = "default_scroll_step_px")]
    pub scroll_step_px: u32,

    #[serde(default = "default_max_scrolls")]
    pub max_scrolls: u32,

    #[serde(default = "default_scroll_pause_ms")]
    pub scroll_pause_ms: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chrome_path: None,
            navigation_timeout_secs: default_navigation_timeout_secs(),
            settle_ms: default_settle_ms(),
            scroll_step_px: default_scroll_step_px(),
            max_scrolls: default_max_scrolls(),
            scroll_pause_ms: default_scroll_pause_ms(),
        }
    }
}

/// Browser signatures used when no pool is configured
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.3",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.0.3 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:85.0) Gecko/20100101 Firefox/85.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/88.0.4324.96 Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 14_3 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.0 Mobile/15E148 Safari/604.1",
];

fn default_identifier_field() -> String {
    "ManufacturerProductNumber".to_string()
}

fn default_url_field() -> String {
    "DatasheetUrl".to_string()
}

fn default_extension() -> String {
    "pdf".to_string()
}

fn default_scheme() -> String {
    "https".to_string()
}

fn default_redirect_params() -> Vec<String> {
    vec!["gotoUrl".to_string()]
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_user_agents() -> Vec<String> {
    DEFAULT_USER_AGENTS.iter().map(|ua| ua.to_string()).collect()
}

fn default_true() -> bool {
    true
}

fn default_navigation_timeout_secs() -> u64 {
    60
}

fn default_settle_ms() -> u64 {
    3000
}

fn default_scroll_step_px() -> u32 {
    800
}

fn default_max_scrolls() -> u32 {
    40
}

fn default_scroll_pause_ms() -> u64 {
    250
}
