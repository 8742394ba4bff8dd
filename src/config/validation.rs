use crate::config::types::{
    BrowserOptions, Config, OutputConfig, ReportConfig, SessionBackend, SessionConfig,
    TargetConfig,
};
use crate::ConfigError;
use chrono::FixedOffset;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_target_config(&config.target)?;
    validate_session_config(&config.session)?;
    validate_report_config(&config.report)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the target site configuration
fn validate_target_config(config: &TargetConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if config.page_param.trim().is_empty() {
        return Err(ConfigError::Validation(
            "page-param cannot be empty".to_string(),
        ));
    }

    validate_selector("card-selector", &config.card_selector)?;
    validate_selector("row-selector", &config.row_selector)?;
    validate_selector("counter-selector", &config.counter_selector)?;

    Ok(())
}

/// Validates session configuration
fn validate_session_config(config: &SessionConfig) -> Result<(), ConfigError> {
    if config.load_timeout_secs < 1 || config.load_timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "load-timeout-secs must be between 1 and 300, got {}",
            config.load_timeout_secs
        )));
    }

    if config.settle_delay_ms > 30_000 {
        return Err(ConfigError::Validation(format!(
            "settle-delay-ms must be <= 30000, got {}",
            config.settle_delay_ms
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.backend == SessionBackend::Webdriver {
        Url::parse(&config.webdriver_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid webdriver-url: {}", e)))?;
    }

    validate_browser_options(&config.browser)?;

    Ok(())
}

/// Validates browser launch options
fn validate_browser_options(options: &BrowserOptions) -> Result<(), ConfigError> {
    let parts: Vec<&str> = options.window_size.split(',').collect();
    let valid = parts.len() == 2
        && parts
            .iter()
            .all(|p| p.trim().parse::<u32>().map(|n| n > 0).unwrap_or(false));

    if !valid {
        return Err(ConfigError::Validation(format!(
            "window-size must look like 'WIDTH,HEIGHT', got '{}'",
            options.window_size
        )));
    }

    Ok(())
}

/// Validates report rendering policy
fn validate_report_config(config: &ReportConfig) -> Result<(), ConfigError> {
    if config.max_shown < 1 {
        return Err(ConfigError::Validation(
            "max-shown must be >= 1".to_string(),
        ));
    }

    if config.max_entry_chars < 1 {
        return Err(ConfigError::Validation(
            "max-entry-chars must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    parse_utc_offset(&config.local_utc_offset)?;

    Ok(())
}

/// Checks that a CSS selector compiles
fn validate_selector(field: &'static str, selector: &str) -> Result<(), ConfigError> {
    if selector.trim().is_empty() || Selector::parse(selector).is_err() {
        return Err(ConfigError::InvalidSelector {
            field,
            selector: selector.to_string(),
        });
    }
    Ok(())
}

/// Parses a fixed UTC offset of the form `+HH:MM` or `-HH:MM`
pub fn parse_utc_offset(value: &str) -> Result<FixedOffset, ConfigError> {
    let invalid = || ConfigError::InvalidOffset(value.to_string());

    let (sign, rest) = match value.chars().next() {
        Some('+') => (1, &value[1..]),
        Some('-') => (-1, &value[1..]),
        _ => return Err(invalid()),
    };

    let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
    if hours.len() != 2 || minutes.len() != 2 {
        return Err(invalid());
    }

    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if hours > 14 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}
