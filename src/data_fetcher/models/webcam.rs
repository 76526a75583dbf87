use super::kind::{FeedKind, Source};
use super::snapshot::Snapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebcamRecord {
    pub name: String,
    pub location: String,
    /// Image or stream URL
    pub url: String,
    #[serde(rename = "isLive")]
    pub is_live: bool,
    #[serde(rename = "lastUpdated")]
    pub last_updated: DateTime<Utc>,
    /// Metres above sea level
    #[serde(default)]
    pub elevation: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "WebcamSnapshotWire")]
pub struct WebcamSnapshot {
    last_updated: DateTime<Utc>,
    source: Source,
    webcams: Vec<WebcamRecord>,
    error: Option<String>,
}

#[derive(Serialize)]
struct WebcamSnapshotRef<'a> {
    #[serde(rename = "lastUpdated")]
    last_updated: &'a DateTime<Utc>,
    source: Source,
    #[serde(rename = "webcamCount")]
    webcam_count: usize,
    webcams: &'a [WebcamRecord],
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

#[derive(Deserialize)]
struct WebcamSnapshotWire {
    #[serde(rename = "lastUpdated")]
    last_updated: DateTime<Utc>,
    source: Source,
    #[serde(rename = "webcamCount")]
    webcam_count: usize,
    #[serde(default)]
    webcams: Vec<WebcamRecord>,
    #[serde(default)]
    error: Option<String>,
}

impl TryFrom<WebcamSnapshotWire> for WebcamSnapshot {
    type Error = String;

    fn try_from(wire: WebcamSnapshotWire) -> Result<Self, Self::Error> {
        if wire.webcam_count != wire.webcams.len() {
            return Err(format!(
                "webcamCount {} does not match {} webcams",
                wire.webcam_count,
                wire.webcams.len()
            ));
        }
        if wire.source == Source::NoData && !wire.webcams.is_empty() {
            return Err("no-data snapshot must not carry webcams".to_string());
        }
        Ok(WebcamSnapshot {
            last_updated: wire.last_updated,
            source: wire.source,
            webcams: wire.webcams,
            error: wire.error,
        })
    }
}

impl Serialize for WebcamSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WebcamSnapshotRef {
            last_updated: &self.last_updated,
            source: self.source,
            webcam_count: self.webcams.len(),
            webcams: &self.webcams,
            error: self.error.as_deref(),
        }
        .serialize(serializer)
    }
}

impl WebcamSnapshot {
    /// Builds a snapshot from a successful adapter run; `source` must be live.
    pub fn live(source: Source, last_updated: DateTime<Utc>, webcams: Vec<WebcamRecord>) -> Self {
        debug_assert!(source.is_live(), "live snapshot built with source {source}");
        WebcamSnapshot {
            last_updated,
            source,
            webcams,
            error: None,
        }
    }

    pub fn webcams(&self) -> &[WebcamRecord] {
        &self.webcams
    }
}

impl Snapshot for WebcamSnapshot {
    const KIND: FeedKind = FeedKind::Webcams;

    fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    fn source(&self) -> Source {
        self.source
    }

    fn len(&self) -> usize {
        self.webcams.len()
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn no_data(error: String, at: DateTime<Utc>) -> Self {
        WebcamSnapshot {
            last_updated: at,
            source: Source::NoData,
            webcams: Vec::new(),
            error: Some(error),
        }
    }

    fn retag_stale(self, error: String) -> Self {
        WebcamSnapshot {
            source: Source::CachedStale,
            error: Some(error),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webcam_wire_format() {
        let snapshot = WebcamSnapshot::live(
            Source::LiveScrapeFallback,
            "2025-01-24T15:30:00Z".parse().unwrap(),
            vec![WebcamRecord {
                name: "Roundhouse Lodge".to_string(),
                location: "Mid-Mountain".to_string(),
                url: "https://cams.example.com/roundhouse.jpg".to_string(),
                is_live: true,
                last_updated: "2025-01-24T15:30:00Z".parse().unwrap(),
                elevation: Some(1860),
            }],
        );

        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["webcamCount"], 1);
        assert_eq!(value["source"], "live-scrape-fallback");
        assert_eq!(value["webcams"][0]["isLive"], true);
        assert_eq!(value["webcams"][0]["elevation"], 1860);

        let back: WebcamSnapshot = serde_json::from_value(value).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "live snapshot built with source cached-stale")]
    fn test_live_rejects_stale_source() {
        WebcamSnapshot::live(Source::CachedStale, Utc::now(), Vec::new());
    }
}
