use crate::constants::{self, env_vars};
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;

pub mod paths;
pub mod validation;

use paths::{get_config_path, get_data_dir_path, get_log_dir_path};
use validation::validate_config;

/// Configuration structure for the service.
///
/// Loaded from a TOML file, then overridden by environment variables, then
/// validated. A missing file yields the defaults.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Directory holding `lifts.json`, `webcams.json` and the fetch logs.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Address the HTTP facade listens on.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Snapshots older than this are stale.
    #[serde(default = "default_cache_max_age")]
    pub cache_max_age_minutes: u64,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_minutes: u64,
    /// Timeout for plain page captures without a navigation-specific value.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_seconds: u64,
    /// Path to the log file. If not specified, logs will be written to a default location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file_path: Option<String>,
    /// On total upstream failure keep the previous records tagged `cached-stale`
    /// instead of writing an empty `no-data` snapshot.
    #[serde(default)]
    pub keep_stale_on_failure: bool,
    #[serde(default = "default_fetch_log_capacity")]
    pub fetch_log_capacity: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<VendorConfig>,
    #[serde(default)]
    pub scrape: ScrapeConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction: Option<ExtractionConfig>,
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Vendor resort-status API. Absent means the vendor adapter is skipped.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct VendorConfig {
    #[serde(default = "default_vendor_base_url")]
    pub base_url: String,
    #[serde(default = "default_vendor_resort_id")]
    pub resort_id: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_vendor_auth_header")]
    pub auth_header: String,
    #[serde(default = "default_vendor_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ScrapeConfig {
    #[serde(default = "default_lifts_url")]
    pub lifts_url: String,
    #[serde(default = "default_webcams_url")]
    pub webcams_url: String,
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_seconds: u64,
    /// Wait after navigation for late dynamic content.
    #[serde(default = "default_settle_millis")]
    pub settle_millis: u64,
    #[serde(default = "default_max_document_chars")]
    pub max_document_chars: usize,
}

/// Structured-extraction (chat completions) service.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ExtractionConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_extraction_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_extraction_model")]
    pub model: String,
    #[serde(default = "default_extraction_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_extraction_max_tokens")]
    pub max_tokens: u32,
}

/// Backoff between failed scheduled refreshes.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RetryConfig {
    #[serde(default = "default_retry_base_delay")]
    pub base_delay_seconds: u64,
    #[serde(default = "default_retry_max_delay")]
    pub max_delay_seconds: u64,
    #[serde(default = "default_retry_max_attempts")]
    pub max_attempts: u32,
}

fn default_data_dir() -> String {
    get_data_dir_path()
}

fn default_bind_address() -> String {
    constants::server::DEFAULT_BIND_ADDRESS.to_string()
}

fn default_cache_max_age() -> u64 {
    constants::cache::DEFAULT_MAX_AGE_MINUTES
}

fn default_refresh_interval() -> u64 {
    constants::cache::DEFAULT_REFRESH_INTERVAL_MINUTES
}

/// Default HTTP timeout in seconds
fn default_http_timeout() -> u64 {
    constants::DEFAULT_HTTP_TIMEOUT_SECONDS
}

fn default_fetch_log_capacity() -> usize {
    constants::cache::DEFAULT_FETCH_LOG_CAPACITY
}

fn default_vendor_base_url() -> String {
    constants::upstream::DEFAULT_VENDOR_BASE_URL.to_string()
}

fn default_vendor_resort_id() -> String {
    constants::upstream::DEFAULT_VENDOR_RESORT_ID.to_string()
}

fn default_vendor_auth_header() -> String {
    constants::upstream::DEFAULT_VENDOR_AUTH_HEADER.to_string()
}

fn default_vendor_timeout() -> u64 {
    constants::upstream::DEFAULT_VENDOR_TIMEOUT_SECONDS
}

fn default_lifts_url() -> String {
    constants::upstream::DEFAULT_LIFTS_URL.to_string()
}

fn default_webcams_url() -> String {
    constants::upstream::DEFAULT_WEBCAMS_URL.to_string()
}

fn default_navigation_timeout() -> u64 {
    constants::upstream::DEFAULT_NAVIGATION_TIMEOUT_SECONDS
}

fn default_settle_millis() -> u64 {
    constants::upstream::DEFAULT_SETTLE_MILLIS
}

fn default_max_document_chars() -> usize {
    constants::upstream::DEFAULT_MAX_DOCUMENT_CHARS
}

fn default_true() -> bool {
    true
}

fn default_extraction_endpoint() -> String {
    constants::extraction::DEFAULT_ENDPOINT.to_string()
}

fn default_extraction_model() -> String {
    constants::extraction::DEFAULT_MODEL.to_string()
}

fn default_extraction_timeout() -> u64 {
    constants::extraction::DEFAULT_TIMEOUT_SECONDS
}

fn default_extraction_max_tokens() -> u32 {
    constants::extraction::DEFAULT_MAX_TOKENS
}

fn default_retry_base_delay() -> u64 {
    constants::retry::BASE_DELAY_SECONDS
}

fn default_retry_max_delay() -> u64 {
    constants::retry::MAX_DELAY_SECONDS
}

fn default_retry_max_attempts() -> u32 {
    constants::retry::MAX_ATTEMPTS
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: default_data_dir(),
            bind_address: default_bind_address(),
            cache_max_age_minutes: default_cache_max_age(),
            refresh_interval_minutes: default_refresh_interval(),
            http_timeout_seconds: default_http_timeout(),
            log_file_path: None,
            keep_stale_on_failure: false,
            fetch_log_capacity: default_fetch_log_capacity(),
            vendor: None,
            scrape: ScrapeConfig::default(),
            extraction: None,
            retry: RetryConfig::default(),
        }
    }
}

impl Default for VendorConfig {
    fn default() -> Self {
        VendorConfig {
            base_url: default_vendor_base_url(),
            resort_id: default_vendor_resort_id(),
            api_key: String::new(),
            auth_header: default_vendor_auth_header(),
            timeout_seconds: default_vendor_timeout(),
        }
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        ScrapeConfig {
            lifts_url: default_lifts_url(),
            webcams_url: default_webcams_url(),
            navigation_timeout_seconds: default_navigation_timeout(),
            settle_millis: default_settle_millis(),
            max_document_chars: default_max_document_chars(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        ExtractionConfig {
            enabled: true,
            endpoint: default_extraction_endpoint(),
            api_key: String::new(),
            model: default_extraction_model(),
            timeout_seconds: default_extraction_timeout(),
            max_tokens: default_extraction_max_tokens(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            base_delay_seconds: default_retry_base_delay(),
            max_delay_seconds: default_retry_max_delay(),
            max_attempts: default_retry_max_attempts(),
        }
    }
}

impl Config {
    /// Loads configuration, applies environment overrides and validates it.
    ///
    /// The file path is taken from `explicit_path`, then `LIFT_FEED_CONFIG`,
    /// then the platform default. A missing file yields the defaults.
    ///
    /// # Environment Variables
    /// - `LIFT_FEED_DATA_DIR`, `LIFT_FEED_BIND`, `LIFT_FEED_LOG_FILE`
    /// - `LIFT_FEED_CACHE_MAX_AGE_MINUTES` (fallback `CACHE_DURATION_MINUTES`)
    /// - `LIFT_FEED_REFRESH_INTERVAL_MINUTES`
    /// - `LIFT_FEED_LIFTS_URL` (fallback `WHISTLER_LIFTS_URL`)
    /// - `LIFT_FEED_WEBCAMS_URL` (fallback `WHISTLER_WEBCAMS_URL`)
    /// - `LIFT_FEED_VENDOR_API_KEY`
    /// - `LIFT_FEED_EXTRACTION_API_KEY` (fallback `OPENAI_API_KEY`)
    ///
    /// # Returns
    /// * `Ok(Config)` - Successfully loaded configuration
    /// * `Err(AppError)` - Unreadable file, bad TOML or failed validation
    pub async fn load(explicit_path: Option<&str>) -> Result<Self, AppError> {
        let config_path = Self::resolve_path(explicit_path);

        let mut config = if Path::new(&config_path).exists() {
            Self::load_from_path(&config_path).await?
        } else {
            tracing::debug!("No config file at {config_path}, using defaults");
            Config::default()
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Resolves which config file to read.
    pub fn resolve_path(explicit_path: Option<&str>) -> String {
        explicit_path
            .map(str::to_string)
            .or_else(|| std::env::var(env_vars::CONFIG_PATH).ok())
            .unwrap_or_else(get_config_path)
    }

    /// Applies overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_from(|name| std::env::var(name).ok());
    }

    /// Applies overrides using `lookup` to read variables.
    ///
    /// A prefixed variable wins over its legacy name. Numeric variables that
    /// fail to parse are ignored with a warning.
    pub fn apply_env_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let with_fallback =
            |primary: &str, legacy: &str| lookup(primary).or_else(|| lookup(legacy));

        if let Some(data_dir) = lookup(env_vars::DATA_DIR) {
            self.data_dir = data_dir;
        }

        if let Some(bind) = lookup(env_vars::BIND) {
            self.bind_address = bind;
        }

        if let Some(log_file_path) = lookup(env_vars::LOG_FILE) {
            self.log_file_path = Some(log_file_path);
        }

        if let Some(raw) = with_fallback(
            env_vars::CACHE_MAX_AGE_MINUTES,
            env_vars::legacy::CACHE_DURATION_MINUTES,
        ) {
            match raw.parse::<u64>() {
                Ok(minutes) => self.cache_max_age_minutes = minutes,
                Err(_) => tracing::warn!("Ignoring non-numeric cache max-age override '{raw}'"),
            }
        }

        if let Some(raw) = lookup(env_vars::REFRESH_INTERVAL_MINUTES) {
            match raw.parse::<u64>() {
                Ok(minutes) => self.refresh_interval_minutes = minutes,
                Err(_) => tracing::warn!("Ignoring non-numeric refresh interval override '{raw}'"),
            }
        }

        if let Some(url) = with_fallback(env_vars::LIFTS_URL, env_vars::legacy::LIFTS_URL) {
            self.scrape.lifts_url = url;
        }

        if let Some(url) = with_fallback(env_vars::WEBCAMS_URL, env_vars::legacy::WEBCAMS_URL) {
            self.scrape.webcams_url = url;
        }

        if let Some(key) = lookup(env_vars::VENDOR_API_KEY) {
            self.vendor.get_or_insert_with(VendorConfig::default).api_key = key;
        }

        if let Some(key) = with_fallback(
            env_vars::EXTRACTION_API_KEY,
            env_vars::legacy::EXTRACTION_API_KEY,
        ) {
            self.extraction
                .get_or_insert_with(ExtractionConfig::default)
                .api_key = key;
        }
    }

    /// Validates the configuration settings
    ///
    /// # Returns
    /// * `Ok(())` - Configuration is valid
    /// * `Err(AppError)` - Configuration validation failed
    pub fn validate(&self) -> Result<(), AppError> {
        validate_config(self)
    }

    pub fn cache_max_age(&self) -> Duration {
        Duration::from_secs(self.cache_max_age_minutes.saturating_mul(60))
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_minutes.saturating_mul(60))
    }

    /// Extraction settings when the structured path is configured and on.
    pub fn active_extraction(&self) -> Option<&ExtractionConfig> {
        self.extraction.as_ref().filter(|e| e.enabled)
    }

    /// Returns the platform-specific path for the config file.
    pub fn get_config_path() -> String {
        paths::get_config_path()
    }

    /// Returns the platform-specific path for the log directory.
    pub fn get_log_dir_path() -> String {
        paths::get_log_dir_path()
    }

    /// Displays the effective configuration to stdout with secrets masked.
    pub fn display(&self, config_path: &str) {
        let log_dir = get_log_dir_path();
        let file_state = if Path::new(config_path).exists() {
            ""
        } else {
            " (not found, using defaults)"
        };

        println!("\nCurrent Configuration");
        println!("────────────────────────────────────");
        println!("Config Location:");
        println!("{config_path}{file_state}");
        println!("────────────────────────────────────");
        println!("Listen Address:     {}", self.bind_address);
        println!("Data Directory:     {}", self.data_dir);
        println!("Cache Max Age:      {} minutes", self.cache_max_age_minutes);
        println!("Refresh Interval:   {} minutes", self.refresh_interval_minutes);
        println!("Keep Stale on Fail: {}", self.keep_stale_on_failure);
        println!("────────────────────────────────────");
        println!("Lifts Page:         {}", self.scrape.lifts_url);
        println!("Webcams Page:       {}", self.scrape.webcams_url);
        match &self.vendor {
            Some(vendor) => println!(
                "Vendor API:         {} (resort {}, key {})",
                vendor.base_url,
                vendor.resort_id,
                mask_secret(&vendor.api_key)
            ),
            None => println!("Vendor API:         not configured"),
        }
        match &self.extraction {
            Some(extraction) if extraction.enabled => println!(
                "Extraction:         {} via {} (key {})",
                extraction.model,
                extraction.endpoint,
                mask_secret(&extraction.api_key)
            ),
            Some(_) => println!("Extraction:         disabled"),
            None => println!("Extraction:         not configured (heuristic only)"),
        }
        println!("────────────────────────────────────");
        println!("Log File Location:");
        if let Some(custom_path) = &self.log_file_path {
            println!("{custom_path}");
        } else {
            println!("{log_dir}/lift_feed.log");
            println!("(Default location)");
        }
    }

    /// Saves configuration to a file path, creating the parent directory.
    ///
    /// # Errors
    /// * `AppError::Config` - If the provided path has no parent directory
    /// * `AppError::Io` - If there's an I/O error creating directories or writing the file
    /// * `AppError::TomlSerialize` - If there's an error serializing the configuration
    pub async fn save_to_path(&self, path: &str) -> Result<(), AppError> {
        let config_dir = Path::new(path).parent().ok_or_else(|| {
            AppError::config_error(format!("Path '{path}' has no parent directory"))
        })?;

        if !config_dir.exists() {
            fs::create_dir_all(config_dir).await?;
        }
        let content = toml::to_string_pretty(self)?;
        let mut file = fs::File::create(path).await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Loads configuration from a file path without env overrides or validation.
    pub async fn load_from_path(path: &str) -> Result<Self, AppError> {
        let content = fs::read_to_string(path).await?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return "<empty>".to_string();
    }
    let visible: String = secret.chars().take(4).collect();
    format!("{visible}…")
}
