use super::Config;
use crate::error::AppError;
use std::net::SocketAddr;
use std::path::Path;

/// Validates the configuration settings
///
/// # Validation Rules
/// - Bind address must parse as `host:port`
/// - Cache max-age, refresh interval and every timeout must be non-zero
/// - Upstream URLs must use http(s)
/// - A present `[vendor]` section needs a non-empty API key
/// - Enabled extraction needs a non-empty API key
/// - Log file path parent directory must exist or be creatable
pub fn validate_config(config: &Config) -> Result<(), AppError> {
    config.bind_address.parse::<SocketAddr>().map_err(|e| {
        AppError::config_error(format!(
            "Invalid bind address '{}': {e}",
            config.bind_address
        ))
    })?;

    if config.data_dir.trim().is_empty() {
        return Err(AppError::config_error("Data directory cannot be empty"));
    }

    require_non_zero("cache_max_age_minutes", config.cache_max_age_minutes)?;
    require_non_zero("refresh_interval_minutes", config.refresh_interval_minutes)?;
    require_non_zero("http_timeout_seconds", config.http_timeout_seconds)?;
    require_non_zero("fetch_log_capacity", config.fetch_log_capacity as u64)?;

    require_http_url("scrape.lifts_url", &config.scrape.lifts_url)?;
    require_http_url("scrape.webcams_url", &config.scrape.webcams_url)?;
    require_non_zero(
        "scrape.navigation_timeout_seconds",
        config.scrape.navigation_timeout_seconds,
    )?;

    if let Some(vendor) = &config.vendor {
        require_http_url("vendor.base_url", &vendor.base_url)?;
        if vendor.api_key.trim().is_empty() {
            return Err(AppError::config_error(
                "Vendor API key cannot be empty when [vendor] is configured",
            ));
        }
        if vendor.resort_id.trim().is_empty() {
            return Err(AppError::config_error("Vendor resort id cannot be empty"));
        }
        require_non_zero("vendor.timeout_seconds", vendor.timeout_seconds)?;
    }

    if let Some(extraction) = &config.extraction
        && extraction.enabled
    {
        require_http_url("extraction.endpoint", &extraction.endpoint)?;
        if extraction.api_key.trim().is_empty() {
            return Err(AppError::config_error(
                "Extraction API key cannot be empty when extraction is enabled",
            ));
        }
        require_non_zero("extraction.timeout_seconds", extraction.timeout_seconds)?;
    }

    require_non_zero("retry.base_delay_seconds", config.retry.base_delay_seconds)?;
    if config.retry.max_delay_seconds < config.retry.base_delay_seconds {
        return Err(AppError::config_error(
            "retry.max_delay_seconds must not be smaller than retry.base_delay_seconds",
        ));
    }

    // Validate log file path if provided
    if let Some(log_path) = &config.log_file_path {
        if log_path.is_empty() {
            return Err(AppError::config_error("Log file path cannot be empty"));
        }

        if let Some(parent) = Path::new(log_path).parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::config_error(format!(
                    "Cannot create log directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    Ok(())
}

fn require_non_zero(field: &str, value: u64) -> Result<(), AppError> {
    if value == 0 {
        return Err(AppError::config_error(format!(
            "{field} must be greater than zero"
        )));
    }
    Ok(())
}

fn require_http_url(field: &str, value: &str) -> Result<(), AppError> {
    if !value.starts_with("http://") && !value.starts_with("https://") {
        return Err(AppError::config_error(format!(
            "{field} must be an http(s) URL, got '{value}'"
        )));
    }
    Ok(())
}
