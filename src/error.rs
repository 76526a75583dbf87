use crate::data_fetcher::models::FeedKind;
use thiserror::Error;

/// Failure of a single upstream adapter step.
///
/// Every variant is recoverable from the orchestrator's point of view: it
/// only means "try the next adapter in the chain".
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    // Vendor API / plain HTTP failures
    #[error("Upstream rejected credentials ({status}): {url}")]
    Unauthorized { status: u16, url: String },

    #[error("Upstream rate limit exceeded (429): {url}")]
    RateLimited { url: String },

    #[error("Upstream returned HTTP {status}: {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Network timeout while fetching data from: {url}")]
    NetworkTimeout { url: String },

    #[error("Connection failed to: {url} - {message}")]
    NetworkConnection { url: String, message: String },

    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    // Payload failures
    #[error("{origin} returned malformed JSON: {message}")]
    MalformedJson { origin: String, message: String },

    #[error("{origin} returned unexpected data structure: {message}")]
    UnexpectedStructure { origin: String, message: String },

    #[error("{origin} returned no usable records: {message}")]
    NoData { origin: String, message: String },

    // Browser capture failures
    #[error("Navigation to {url} timed out after {seconds}s")]
    NavigationTimeout { url: String, seconds: u64 },

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    // Structured-extraction failures
    #[error("Extraction service timed out after {seconds}s")]
    ExtractionTimeout { seconds: u64 },

    #[error("Extraction service error{}: {message}", status.map(|s| format!(" ({s})")).unwrap_or_default())]
    ExtractionService {
        status: Option<u16>,
        message: String,
    },

    #[error("Extraction service unavailable: {message}")]
    ExtractionUnavailable { message: String },

    #[error("Extraction output could not be parsed: {message}")]
    MalformedExtraction { message: String },
}

impl FetchError {
    /// Maps a non-success HTTP status onto the matching variant
    pub fn from_status(status: u16, url: impl Into<String>) -> Self {
        let url = url.into();
        match status {
            401 | 403 => Self::Unauthorized { status, url },
            429 => Self::RateLimited { url },
            _ => Self::HttpStatus { status, url },
        }
    }

    /// Classifies a reqwest transport error
    pub fn from_transport(url: impl Into<String>, error: &reqwest::Error) -> Self {
        let url = url.into();
        if error.is_timeout() {
            Self::NetworkTimeout { url }
        } else if error.is_connect() {
            Self::NetworkConnection {
                url,
                message: error.to_string(),
            }
        } else {
            Self::Transport {
                url,
                message: error.to_string(),
            }
        }
    }

    pub fn malformed_json(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedJson {
            origin: origin.into(),
            message: message.into(),
        }
    }

    pub fn unexpected_structure(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnexpectedStructure {
            origin: origin.into(),
            message: message.into(),
        }
    }

    pub fn no_data(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NoData {
            origin: origin.into(),
            message: message.into(),
        }
    }

    pub fn navigation(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Navigation {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn extraction_service(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::ExtractionService {
            status,
            message: message.into(),
        }
    }

    pub fn extraction_unavailable(message: impl Into<String>) -> Self {
        Self::ExtractionUnavailable {
            message: message.into(),
        }
    }

    pub fn malformed_extraction(message: impl Into<String>) -> Self {
        Self::MalformedExtraction {
            message: message.into(),
        }
    }

    /// Credentials were refused; logged distinctly but handled like any failure
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, FetchError::Unauthorized { .. })
    }

    /// The extraction path cannot be used at all (quota, billing, disabled)
    pub fn is_extraction_unavailable(&self) -> bool {
        matches!(self, FetchError::ExtractionUnavailable { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            FetchError::NetworkTimeout { .. }
                | FetchError::NavigationTimeout { .. }
                | FetchError::ExtractionTimeout { .. }
        )
    }

    /// HTTP status carried by the error, if the failure had one
    pub fn http_status(&self) -> Option<u16> {
        match self {
            FetchError::Unauthorized { status, .. } | FetchError::HttpStatus { status, .. } => {
                Some(*status)
            }
            FetchError::RateLimited { .. } => Some(429),
            FetchError::ExtractionService { status, .. } => *status,
            _ => None,
        }
    }
}

/// Orchestration fault while refreshing a feed.
///
/// Unlike [`FetchError`] these are not upstream problems and surface as an
/// error on the explicit refresh path.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RefreshError {
    #[error("Failed to write {kind} cache: {message}")]
    CacheWrite { kind: FeedKind, message: String },

    #[error("Refresh of {kind} aborted: {message}")]
    Aborted { kind: FeedKind, message: String },
}

impl RefreshError {
    pub fn cache_write(kind: FeedKind, message: impl Into<String>) -> Self {
        Self::CacheWrite {
            kind,
            message: message.into(),
        }
    }

    pub fn aborted(kind: FeedKind, message: impl Into<String>) -> Self {
        Self::Aborted {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDeserialize(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Log setup error: {0}")]
    LogSetup(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error(transparent)]
    Refresh(#[from] RefreshError),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Invalid listen address: {0}")]
    AddrParse(#[from] std::net::AddrParseError),
}

impl AppError {
    /// Create a configuration error with context
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a log setup error with context
    pub fn log_setup_error(msg: impl Into<String>) -> Self {
        Self::LogSetup(msg.into())
    }

    pub fn server_error(msg: impl Into<String>) -> Self {
        Self::Server(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_distinguishes_auth_failures() {
        let unauthorized = FetchError::from_status(401, "https://vendor.example/api");
        let forbidden = FetchError::from_status(403, "https://vendor.example/api");
        let server = FetchError::from_status(500, "https://vendor.example/api");

        assert!(unauthorized.is_auth_failure());
        assert!(forbidden.is_auth_failure());
        assert!(!server.is_auth_failure());
        assert_eq!(forbidden.http_status(), Some(403));
        assert_eq!(server.http_status(), Some(500));
    }

    #[test]
    fn test_from_status_rate_limit() {
        let error = FetchError::from_status(429, "https://vendor.example/api");
        assert!(matches!(error, FetchError::RateLimited { .. }));
        assert_eq!(error.http_status(), Some(429));
        assert_eq!(
            error.to_string(),
            "Upstream rate limit exceeded (429): https://vendor.example/api"
        );
    }

    #[test]
    fn test_timeouts_are_grouped() {
        assert!(
            FetchError::NetworkTimeout {
                url: "u".to_string()
            }
            .is_timeout()
        );
        assert!(
            FetchError::NavigationTimeout {
                url: "u".to_string(),
                seconds: 45
            }
            .is_timeout()
        );
        assert!(FetchError::ExtractionTimeout { seconds: 60 }.is_timeout());
        assert!(!FetchError::malformed_extraction("bad").is_timeout());
    }

    #[test]
    fn test_extraction_service_display() {
        let with_status = FetchError::extraction_service(Some(500), "upstream exploded");
        assert_eq!(
            with_status.to_string(),
            "Extraction service error (500): upstream exploded"
        );

        let without_status = FetchError::extraction_service(None, "no choices");
        assert_eq!(
            without_status.to_string(),
            "Extraction service error: no choices"
        );
    }

    #[test]
    fn test_extraction_unavailable_helper() {
        let error = FetchError::extraction_unavailable("insufficient_quota");
        assert!(error.is_extraction_unavailable());
        assert_eq!(error.http_status(), None);
    }

    #[test]
    fn test_refresh_error_display() {
        let error = RefreshError::cache_write(FeedKind::Lifts, "read-only file system");
        assert_eq!(
            error.to_string(),
            "Failed to write lifts cache: read-only file system"
        );

        let app: AppError = error.into();
        assert!(matches!(app, AppError::Refresh(_)));
    }

    #[test]
    fn test_config_error_helper() {
        let error = AppError::config_error("Invalid configuration");
        assert!(matches!(error, AppError::Config(_)));
        assert_eq!(
            error.to_string(),
            "Configuration error: Invalid configuration"
        );
    }

    #[test]
    fn test_log_setup_error_helper() {
        let error = AppError::log_setup_error("Failed to initialize logger");
        assert_eq!(
            error.to_string(),
            "Log setup error: Failed to initialize logger"
        );
    }
}
