use crate::config::types::{
    Config, FetchConfig, OutputConfig, ScanConfig, SourceConfig, ID_PLACEHOLDER,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_scan_config(&config.scan)?;
    validate_fetch_config(&config.fetch)?;
    validate_source_config(&config.source)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_scan_config(config: &ScanConfig) -> Result<(), ConfigError> {
    if config.keywords.is_empty() {
        return Err(ConfigError::Validation(
            "keywords must contain at least one entry".to_string(),
        ));
    }

    if let Some(pos) = config.keywords.iter().position(|k| k.trim().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "keyword #{} is blank",
            pos + 1
        )));
    }

    Ok(())
}

/// Validates fetch pipeline configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.max_pastes < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pastes must be >= 1, got {}",
            config.max_pastes
        )));
    }

    if config.max_connections < 1 || config.max_connections > 100 {
        return Err(ConfigError::Validation(format!(
            "max_connections must be between 1 and 100, got {}",
            config.max_connections
        )));
    }

    validate_seconds("min_request_interval", config.min_request_interval, true)?;
    validate_seconds("request_timeout", config.request_timeout, false)?;
    validate_seconds("session_timeout", config.session_timeout, false)?;

    for proxy in &config.proxies {
        validate_proxy(proxy)?;
    }

    Ok(())
}

/// Checks a seconds value is finite and positive (or zero when allowed)
fn validate_seconds(name: &str, value: f64, allow_zero: bool) -> Result<(), ConfigError> {
    let ok = value.is_finite() && (value > 0.0 || (allow_zero && value == 0.0));
    if !ok {
        let bound = if allow_zero { ">= 0" } else { "> 0" };
        return Err(ConfigError::Validation(format!(
            "{} must be a finite number of seconds {}, got {}",
            name, bound, value
        )));
    }
    Ok(())
}

fn validate_proxy(proxy: &str) -> Result<(), ConfigError> {
    let url = Url::parse(proxy)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", proxy, e)))?;

    match url.scheme() {
        "http" | "https" | "socks5" | "socks5h" => Ok(()),
        other => Err(ConfigError::Validation(format!(
            "Proxy '{}' has unsupported scheme '{}'",
            proxy, other
        ))),
    }
}

fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    if config.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "source name cannot be empty".to_string(),
        ));
    }

    let archive = Url::parse(&config.archive_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid archive_url: {}", e)))?;
    if !matches!(archive.scheme(), "http" | "https") {
        return Err(ConfigError::Validation(format!(
            "archive_url '{}' must use http or https",
            config.archive_url
        )));
    }

    if !config.raw_url_template.contains(ID_PLACEHOLDER) {
        return Err(ConfigError::Validation(format!(
            "raw_url_template '{}' must contain {}",
            config.raw_url_template, ID_PLACEHOLDER
        )));
    }

    Url::parse(&config.raw_url("aaaaaaaa"))
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid raw_url_template: {}", e)))?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
