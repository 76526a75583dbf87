use serde::{Deserialize, Serialize};
use std::fmt;

/// The two data kinds the service aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    Lifts,
    Webcams,
}

impl FeedKind {
    pub const ALL: [FeedKind; 2] = [FeedKind::Lifts, FeedKind::Webcams];

    pub fn as_str(self) -> &'static str {
        match self {
            FeedKind::Lifts => "lifts",
            FeedKind::Webcams => "webcams",
        }
    }

    /// Snapshot file name inside the data directory
    pub fn snapshot_file_name(self) -> String {
        format!("{}.json", self.as_str())
    }

    /// Fetch log file name inside the data directory
    pub fn log_file_name(self) -> String {
        format!("{}-log.json", self.as_str())
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "lifts" => Some(FeedKind::Lifts),
            "webcams" => Some(FeedKind::Webcams),
            _ => None,
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    /// Vendor resort-status API
    LiveVendorApi,
    /// Page capture plus structured extraction
    LiveScrape,
    /// Page capture plus the name-scanning heuristic
    LiveScrapeFallback,
    /// Previous records kept after every adapter failed
    CachedStale,
    /// Every adapter failed and nothing was kept
    NoData,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Source::LiveVendorApi => "live-vendor-api",
            Source::LiveScrape => "live-scrape",
            Source::LiveScrapeFallback => "live-scrape-fallback",
            Source::CachedStale => "cached-stale",
            Source::NoData => "no-data",
        }
    }

    pub fn is_live(self) -> bool {
        matches!(
            self,
            Source::LiveVendorApi | Source::LiveScrape | Source::LiveScrapeFallback
        )
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names() {
        assert_eq!(FeedKind::Lifts.snapshot_file_name(), "lifts.json");
        assert_eq!(FeedKind::Webcams.snapshot_file_name(), "webcams.json");
        assert_eq!(FeedKind::Lifts.log_file_name(), "lifts-log.json");
        assert_eq!(FeedKind::Webcams.log_file_name(), "webcams-log.json");
    }

    #[test]
    fn test_source_wire_names_match_display() {
        for source in [
            Source::LiveVendorApi,
            Source::LiveScrape,
            Source::LiveScrapeFallback,
            Source::CachedStale,
            Source::NoData,
        ] {
            let json = serde_json::to_string(&source).unwrap();
            assert_eq!(json, format!("\"{source}\""));
        }
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!(FeedKind::parse(" Lifts "), Some(FeedKind::Lifts));
        assert_eq!(FeedKind::parse("webcams"), Some(FeedKind::Webcams));
        assert_eq!(FeedKind::parse("snow"), None);
    }
}
