use super::kind::{FeedKind, Source};
use super::snapshot::Snapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LiftStatus {
    Open,
    Closed,
    Scheduled,
    #[serde(rename = "On Hold")]
    OnHold,
    Maintenance,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LiftType {
    Gondola,
    #[serde(rename = "Express Chair")]
    ExpressChair,
    #[serde(rename = "Fixed Chair")]
    FixedChair,
    #[serde(rename = "Surface Lift")]
    SurfaceLift,
    #[serde(rename = "T-Bar")]
    TBar,
    Funicular,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mountain {
    Whistler,
    Blackcomb,
    Both,
    Unknown,
}

impl fmt::Display for LiftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LiftStatus::Open => "Open",
            LiftStatus::Closed => "Closed",
            LiftStatus::Scheduled => "Scheduled",
            LiftStatus::OnHold => "On Hold",
            LiftStatus::Maintenance => "Maintenance",
            LiftStatus::Unknown => "Unknown",
        };
        f.write_str(label)
    }
}

impl fmt::Display for Mountain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Mountain::Whistler => "Whistler",
            Mountain::Blackcomb => "Blackcomb",
            Mountain::Both => "Both",
            Mountain::Unknown => "Unknown",
        };
        f.write_str(label)
    }
}

/// One lift as of one fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiftRecord {
    #[serde(rename = "liftName")]
    pub name: String,
    pub status: LiftStatus,
    pub mountain: Mountain,
    #[serde(rename = "type")]
    pub lift_type: LiftType,
    /// Present only for open lifts that reported a wait
    #[serde(rename = "waitTimeMinutes", default)]
    pub wait_time_minutes: Option<u32>,
    /// Riders per hour; 0 when unknown
    #[serde(default)]
    pub capacity: u32,
    #[serde(rename = "lastUpdated")]
    pub last_updated: DateTime<Utc>,
}

/// A complete lift feed as served and persisted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "LiftSnapshotWire")]
pub struct LiftSnapshot {
    last_updated: DateTime<Utc>,
    source: Source,
    lifts: Vec<LiftRecord>,
    error: Option<String>,
}

#[derive(Serialize)]
struct LiftSnapshotRef<'a> {
    #[serde(rename = "lastUpdated")]
    last_updated: &'a DateTime<Utc>,
    source: Source,
    #[serde(rename = "liftCount")]
    lift_count: usize,
    lifts: &'a [LiftRecord],
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

#[derive(Deserialize)]
struct LiftSnapshotWire {
    #[serde(rename = "lastUpdated")]
    last_updated: DateTime<Utc>,
    source: Source,
    #[serde(rename = "liftCount")]
    lift_count: usize,
    #[serde(default)]
    lifts: Vec<LiftRecord>,
    #[serde(default)]
    error: Option<String>,
}

impl TryFrom<LiftSnapshotWire> for LiftSnapshot {
    type Error = String;

    fn try_from(wire: LiftSnapshotWire) -> Result<Self, Self::Error> {
        if wire.lift_count != wire.lifts.len() {
            return Err(format!(
                "liftCount {} does not match {} lifts",
                wire.lift_count,
                wire.lifts.len()
            ));
        }
        if wire.source == Source::NoData && !wire.lifts.is_empty() {
            return Err("no-data snapshot must not carry lifts".to_string());
        }
        Ok(LiftSnapshot {
            last_updated: wire.last_updated,
            source: wire.source,
            lifts: wire.lifts,
            error: wire.error,
        })
    }
}

impl Serialize for LiftSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        LiftSnapshotRef {
            last_updated: &self.last_updated,
            source: self.source,
            lift_count: self.lifts.len(),
            lifts: &self.lifts,
            error: self.error.as_deref(),
        }
        .serialize(serializer)
    }
}

impl LiftSnapshot {
    /// Builds a snapshot from a successful adapter run.
    ///
    /// `source` must be one of the live sources; `no-data` and
    /// `cached-stale` snapshots come from [`Snapshot::no_data`] and
    /// [`Snapshot::retag_stale`].
    pub fn live(source: Source, last_updated: DateTime<Utc>, lifts: Vec<LiftRecord>) -> Self {
        debug_assert!(source.is_live(), "live snapshot built with source {source}");
        LiftSnapshot {
            last_updated,
            source,
            lifts,
            error: None,
        }
    }

    pub fn lifts(&self) -> &[LiftRecord] {
        &self.lifts
    }

    pub fn lift_count(&self) -> usize {
        self.lifts.len()
    }

    pub fn find(&self, name: &str) -> Option<&LiftRecord> {
        let key = name.trim().to_lowercase();
        self.lifts
            .iter()
            .find(|lift| lift.name.trim().to_lowercase() == key)
    }
}

impl Snapshot for LiftSnapshot {
    const KIND: FeedKind = FeedKind::Lifts;

    fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    fn source(&self) -> Source {
        self.source
    }

    fn len(&self) -> usize {
        self.lifts.len()
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn no_data(error: String, at: DateTime<Utc>) -> Self {
        LiftSnapshot {
            last_updated: at,
            source: Source::NoData,
            lifts: Vec::new(),
            error: Some(error),
        }
    }

    fn retag_stale(self, error: String) -> Self {
        LiftSnapshot {
            source: Source::CachedStale,
            error: Some(error),
            ..self
        }
    }
}
