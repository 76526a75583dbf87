//! Application-wide constants and configuration defaults
//!
//! This module centralizes the magic numbers used by the fetch, cache and
//! serve pipeline so they can be tuned in one place.

/// Default timeout for plain HTTP requests in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 30;

/// Upper bound on the TCP/TLS connect phase
pub const HTTP_CONNECT_TIMEOUT_SECONDS: u64 = 10;

/// Maximum number of idle connections per host in the HTTP client pool
pub const HTTP_POOL_MAX_IDLE_PER_HOST: usize = 16;

/// Service name reported by the health endpoint
pub const SERVICE_NAME: &str = "Lift Feed API";

/// Cache freshness and refresh cadence
pub mod cache {
    /// Snapshots older than this are served stale and refreshed in the background
    pub const DEFAULT_MAX_AGE_MINUTES: u64 = 10;

    /// Interval of the scheduled refresh
    pub const DEFAULT_REFRESH_INTERVAL_MINUTES: u64 = 7;

    /// Entries kept in each per-kind fetch log
    pub const DEFAULT_FETCH_LOG_CAPACITY: usize = 100;
}

/// Upstream endpoints and timeouts
pub mod upstream {
    /// Vendor resort-status API base URL
    pub const DEFAULT_VENDOR_BASE_URL: &str =
        "https://mtnapi-prod.azure-api.net/resortstatus/api/v1";

    /// Vendor resort identifier for Whistler Blackcomb
    pub const DEFAULT_VENDOR_RESORT_ID: &str = "80";

    /// Header carrying the vendor subscription key
    pub const DEFAULT_VENDOR_AUTH_HEADER: &str = "Ocp-Apim-Subscription-Key";

    pub const DEFAULT_VENDOR_TIMEOUT_SECONDS: u64 = 10;

    pub const DEFAULT_LIFTS_URL: &str = "https://whistlerpeak.com/livelifts/";

    pub const DEFAULT_WEBCAMS_URL: &str =
        "https://www.whistlerblackcomb.com/the-mountain/mountain-conditions/mountain-cams.aspx";

    /// Page navigation timeout, distinct from the plain HTTP timeout
    pub const DEFAULT_NAVIGATION_TIMEOUT_SECONDS: u64 = 45;

    /// Wait after navigation so late content can land
    pub const DEFAULT_SETTLE_MILLIS: u64 = 3000;

    /// Concurrent page captures; lifts and webcams scrapes take turns
    pub const MAX_BROWSER_SESSIONS: usize = 1;

    /// Captured documents are truncated to this many characters before extraction
    pub const DEFAULT_MAX_DOCUMENT_CHARS: usize = 60_000;
}

/// Structured-extraction service defaults
pub mod extraction {
    pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

    pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

    pub const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

    pub const DEFAULT_MAX_TOKENS: u32 = 2000;

    /// Low temperature keeps the JSON shape stable
    pub const TEMPERATURE: f32 = 0.1;
}

/// Retry configuration for scheduled refreshes
pub mod retry {
    /// Base delay for exponential backoff (seconds)
    pub const BASE_DELAY_SECONDS: u64 = 30;

    /// Maximum delay between retries (seconds)
    pub const MAX_DELAY_SECONDS: u64 = 300;

    /// Maximum number of retry attempts after a failed scheduled refresh
    pub const MAX_ATTEMPTS: u32 = 3;
}

/// HTTP facade limits
pub mod server {
    pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:3001";

    /// Request head must arrive within this many seconds
    pub const HEADER_READ_TIMEOUT_SECONDS: u64 = 10;

    pub const MAX_HEADER_BYTES: usize = 16 * 1024;

    pub const MAX_BODY_BYTES: usize = 64 * 1024;

    pub const MAX_HEADERS: usize = 32;
}

/// Environment variable names
pub mod env_vars {
    pub const CONFIG_PATH: &str = "LIFT_FEED_CONFIG";
    pub const DATA_DIR: &str = "LIFT_FEED_DATA_DIR";
    pub const BIND: &str = "LIFT_FEED_BIND";
    pub const LOG_FILE: &str = "LIFT_FEED_LOG_FILE";
    pub const CACHE_MAX_AGE_MINUTES: &str = "LIFT_FEED_CACHE_MAX_AGE_MINUTES";
    pub const REFRESH_INTERVAL_MINUTES: &str = "LIFT_FEED_REFRESH_INTERVAL_MINUTES";
    pub const LIFTS_URL: &str = "LIFT_FEED_LIFTS_URL";
    pub const WEBCAMS_URL: &str = "LIFT_FEED_WEBCAMS_URL";
    pub const VENDOR_API_KEY: &str = "LIFT_FEED_VENDOR_API_KEY";
    pub const EXTRACTION_API_KEY: &str = "LIFT_FEED_EXTRACTION_API_KEY";

    /// Names the original deployment used; honored when the prefixed name is unset
    pub mod legacy {
        pub const CACHE_DURATION_MINUTES: &str = "CACHE_DURATION_MINUTES";
        pub const LIFTS_URL: &str = "WHISTLER_LIFTS_URL";
        pub const WEBCAMS_URL: &str = "WHISTLER_WEBCAMS_URL";
        pub const EXTRACTION_API_KEY: &str = "OPENAI_API_KEY";
    }
}
