use crate::config::types::{Config, FetchConfig, OutputConfig, RenderConfig, ResolverConfig};
use crate::ConfigError;
use reqwest::header::HeaderValue;
use url::Url;

/// Extensions that would let artifacts collide with the journal or with
/// in-progress downloads in the output directory
const RESERVED_EXTENSIONS: &[&str] = &["json", "tmp", "part"];

const MAX_EXTENSION_LEN: usize = 16;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_input_fields(&config.input.identifier_field, &config.input.url_field)?;
    validate_output_config(&config.output)?;
    validate_resolver_config(&config.resolver)?;
    validate_fetch_config(&config.fetch)?;
    validate_render_config(&config.render)?;
    Ok(())
}

fn validate_input_fields(identifier_field: &str, url_field: &str) -> Result<(), ConfigError> {
    if identifier_field.trim().is_empty() || url_field.trim().is_empty() {
        return Err(ConfigError::Validation(
            "identifier-field and url-field cannot be empty".to_string(),
        ));
    }
    if identifier_field == url_field {
        return Err(ConfigError::Validation(format!(
            "identifier-field and url-field must differ, both are '{}'",
            url_field
        )));
    }
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    let base = Url::parse(&config.mirror_base)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid mirror-base: {}", e)))?;

    if base.scheme() != "https" && base.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "mirror-base must use http or https, got '{}'",
            base.scheme()
        )));
    }

    // Artifact names are appended verbatim
    if !config.mirror_base.ends_with('/') {
        return Err(ConfigError::Validation(format!(
            "mirror-base must end with '/', got '{}'",
            config.mirror_base
        )));
    }

    if config.extension.is_empty()
        || config.extension.len() > MAX_EXTENSION_LEN
        || !config.extension.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return Err(ConfigError::Validation(format!(
            "extension must be 1-{} alphanumeric characters, got '{}'",
            MAX_EXTENSION_LEN, config.extension
        )));
    }

    if RESERVED_EXTENSIONS
        .iter()
        .any(|reserved| config.extension.eq_ignore_ascii_case(reserved))
    {
        return Err(ConfigError::Validation(format!(
            "extension '{}' is reserved for files the run keeps in the output directory",
            config.extension
        )));
    }

    Ok(())
}

/// Validates resolver configuration
fn validate_resolver_config(config: &ResolverConfig) -> Result<(), ConfigError> {
    if config.default_scheme != "https" && config.default_scheme != "http" {
        return Err(ConfigError::Validation(format!(
            "default-scheme must be 'http' or 'https', got '{}'",
            config.default_scheme
        )));
    }

    for param in &config.redirect_params {
        if param.is_empty() || param.contains(|c: char| matches!(c, '=' | '&' | '?')) {
            return Err(ConfigError::Validation(format!(
                "Invalid redirect parameter name '{}'",
                param
            )));
        }
    }

    Ok(())
}

/// Validates fetch configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 || config.timeout_secs > 3600 {
        return Err(ConfigError::Validation(format!(
            "timeout-secs must be between 1 and 3600, got {}",
            config.timeout_secs
        )));
    }

    if config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "connect-timeout-secs must be >= 1, got {}",
            config.connect_timeout_secs
        )));
    }

    if config.user_agents.is_empty() {
        return Err(ConfigError::Validation(
            "user-agents must contain at least one identity".to_string(),
        ));
    }

    for agent in &config.user_agents {
        if agent.trim().is_empty() || HeaderValue::from_str(agent).is_err() {
            return Err(ConfigError::Validation(format!(
                "user agent '{}' is not a valid header value",
                agent
            )));
        }
    }

    for pattern in config.trusted_hosts.iter().chain(&config.viewer_hosts) {
        validate_host_pattern(pattern)?;
    }

    Ok(())
}

/// Validates render configuration
fn validate_render_config(config: &RenderConfig) -> Result<(), ConfigError> {
    if config.navigation_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "navigation-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.scroll_step_px < 1 {
        return Err(ConfigError::Validation(
            "scroll-step-px must be >= 1".to_string(),
        ));
    }

    if let Some(path) = &config.chrome_path {
        if path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "chrome-path cannot be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates a host pattern (supports wildcards)
fn validate_host_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Host pattern cannot be empty".to_string(),
        ));
    }

    let host = pattern.strip_prefix("*.").unwrap_or(pattern);

    if host.is_empty() {
        return Err(ConfigError::InvalidPattern(format!(
            "Host pattern '{}' has no host after the wildcard",
            pattern
        )));
    }

    if !host
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' contains invalid characters",
            host
        )));
    }

    if host.starts_with('.')
        || host.ends_with('.')
        || host.starts_with('-')
        || host.ends_with('-')
        || host.contains("..")
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' is malformed",
            host
        )));
    }

    if !host.contains('.') {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' must contain at least one dot (e.g., 'example.com')",
            host
        )));
    }

    Ok(())
}
