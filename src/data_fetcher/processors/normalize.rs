use super::mountain::classify;
use crate::data_fetcher::models::{LiftRecord, LiftStatus, LiftType, WebcamRecord};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::debug;

/// A lift as reported by an upstream, before normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawLift {
    pub name: String,
    pub status: Option<String>,
    pub lift_type: Option<String>,
    pub sector: Option<String>,
    /// Page or vendor grouping label (e.g. a map name or a mountain column)
    pub grouping: Option<String>,
    pub wait_time_minutes: Option<i64>,
    pub capacity: Option<i64>,
}

/// Output of [`normalize`].
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized<T> {
    pub records: Vec<T>,
    pub duplicates_dropped: usize,
    /// Entries without a usable name (or URL, for webcams)
    pub invalid_dropped: usize,
}

/// Dedup key: trimmed and lower-cased name
pub fn normalized_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Turns raw upstream lifts into canonical records.
///
/// The first occurrence of a name wins and upstream order is kept. Status
/// and type strings go through fixed tables; anything unrecognized becomes
/// `Unknown`. When no type was reported it is inferred from the name. Never
/// fails and never grows the input.
pub fn normalize(raw: Vec<RawLift>, fetched_at: DateTime<Utc>) -> Normalized<LiftRecord> {
    let mut seen = HashSet::with_capacity(raw.len());
    let mut records = Vec::with_capacity(raw.len());
    let mut duplicates_dropped = 0;
    let mut invalid_dropped = 0;

    for lift in raw {
        let name = lift.name.trim();
        if name.is_empty() {
            invalid_dropped += 1;
            continue;
        }
        if !seen.insert(normalized_key(name)) {
            duplicates_dropped += 1;
            continue;
        }

        let status = lift
            .status
            .as_deref()
            .map_or(LiftStatus::Unknown, map_status);
        let lift_type = match lift.lift_type.as_deref() {
            Some(raw_type) => map_lift_type(raw_type),
            None => infer_lift_type(name),
        };
        let wait_time_minutes = match (status, lift.wait_time_minutes) {
            (LiftStatus::Open, Some(minutes)) if minutes >= 0 => u32::try_from(minutes).ok(),
            _ => None,
        };
        let capacity = lift
            .capacity
            .map_or(0, |c| u32::try_from(c.max(0)).unwrap_or(u32::MAX));

        records.push(LiftRecord {
            name: name.to_string(),
            status,
            mountain: classify(name, lift.sector.as_deref(), lift.grouping.as_deref()),
            lift_type,
            wait_time_minutes,
            capacity,
            last_updated: fetched_at,
        });
    }

    if duplicates_dropped > 0 || invalid_dropped > 0 {
        debug!(
            "Normalized {} lifts ({} duplicates, {} invalid dropped)",
            records.len(),
            duplicates_dropped,
            invalid_dropped
        );
    }

    Normalized {
        records,
        duplicates_dropped,
        invalid_dropped,
    }
}

/// Dedups webcams by name, dropping entries without a name or URL.
pub fn normalize_webcams(raw: Vec<WebcamRecord>) -> Normalized<WebcamRecord> {
    let mut seen = HashSet::with_capacity(raw.len());
    let mut records = Vec::with_capacity(raw.len());
    let mut duplicates_dropped = 0;
    let mut invalid_dropped = 0;

    for mut webcam in raw {
        webcam.name = webcam.name.trim().to_string();
        webcam.url = webcam.url.trim().to_string();
        if webcam.name.is_empty() || webcam.url.is_empty() {
            invalid_dropped += 1;
            continue;
        }
        if !seen.insert(normalized_key(&webcam.name)) {
            duplicates_dropped += 1;
            continue;
        }
        records.push(webcam);
    }

    Normalized {
        records,
        duplicates_dropped,
        invalid_dropped,
    }
}

/// Lower-case, `_`/`-` to spaces, whitespace collapsed
fn table_key(value: &str) -> String {
    value
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub fn map_status(raw: &str) -> LiftStatus {
    match table_key(raw).as_str() {
        "open" | "opened" | "operating" | "running" => LiftStatus::Open,
        "closed" | "close" | "not operating" => LiftStatus::Closed,
        "scheduled" | "expected" | "opening soon" => LiftStatus::Scheduled,
        "on hold" | "hold" | "onhold" | "delayed" | "wind hold" | "standby" => {
            LiftStatus::OnHold
        }
        "maintenance" | "under maintenance" => LiftStatus::Maintenance,
        _ => LiftStatus::Unknown,
    }
}

pub fn map_lift_type(raw: &str) -> LiftType {
    match table_key(raw).as_str() {
        "gondola" | "cabin" => LiftType::Gondola,
        "express chair" | "express" | "high speed chair" | "detachable chair" | "express quad"
        | "express six" => LiftType::ExpressChair,
        "fixed chair" | "chair" | "chairlift" | "fixed grip chair" | "triple chair"
        | "quad chair" | "magic chair" => LiftType::FixedChair,
        "surface lift" | "surface" | "magic carpet" | "carpet" | "rope tow" | "platter" => {
            LiftType::SurfaceLift
        }
        "t bar" | "tbar" | "t bars" => LiftType::TBar,
        "funicular" => LiftType::Funicular,
        _ => LiftType::Unknown,
    }
}

/// Guesses the lift type from words in its name
pub fn infer_lift_type(name: &str) -> LiftType {
    let key = table_key(name);
    if key.contains("gondola") || key.contains("peak 2 peak") {
        LiftType::Gondola
    } else if key.contains("t bar") {
        LiftType::TBar
    } else if key.contains("express") {
        LiftType::ExpressChair
    } else if key.contains("chair") {
        LiftType::FixedChair
    } else if key.contains("carpet") || key.contains("tow") {
        LiftType::SurfaceLift
    } else if key.contains("funicular") {
        LiftType::Funicular
    } else {
        LiftType::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_fetcher::models::Mountain;

    fn raw(name: &str, status: &str) -> RawLift {
        RawLift {
            name: name.to_string(),
            status: Some(status.to_string()),
            ..RawLift::default()
        }
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let input = vec![
            raw("Creekside Gondola", "open"),
            raw("  creekside gondola ", "closed"),
            raw("Magic Chair", "closed"),
            raw("CREEKSIDE GONDOLA", "scheduled"),
        ];
        let output = normalize(input, Utc::now());

        assert_eq!(output.records.len(), 2);
        assert_eq!(output.duplicates_dropped, 2);
        assert_eq!(output.records[0].name, "Creekside Gondola");
        assert_eq!(output.records[0].status, LiftStatus::Open);
        assert_eq!(output.records[1].name, "Magic Chair");
    }

    #[test]
    fn test_output_never_longer_than_input() {
        let input = vec![raw("", "open"), raw("   ", "open"), raw("Peak Express", "open")];
        let output = normalize(input, Utc::now());
        assert_eq!(output.records.len(), 1);
        assert_eq!(output.invalid_dropped, 2);
    }

    #[test]
    fn test_status_table() {
        assert_eq!(map_status("OPEN"), LiftStatus::Open);
        assert_eq!(map_status("Closed"), LiftStatus::Closed);
        assert_eq!(map_status("on_hold"), LiftStatus::OnHold);
        assert_eq!(map_status("On-Hold"), LiftStatus::OnHold);
        assert_eq!(map_status("Scheduled"), LiftStatus::Scheduled);
        assert_eq!(map_status("maintenance"), LiftStatus::Maintenance);
        assert_eq!(map_status("bogus"), LiftStatus::Unknown);
    }

    #[test]
    fn test_type_table_and_inference() {
        assert_eq!(map_lift_type("Express Chair"), LiftType::ExpressChair);
        assert_eq!(map_lift_type("T-Bar"), LiftType::TBar);
        assert_eq!(map_lift_type("magic_carpet"), LiftType::SurfaceLift);
        assert_eq!(map_lift_type("rocket"), LiftType::Unknown);

        assert_eq!(infer_lift_type("Showcase T-Bar"), LiftType::TBar);
        assert_eq!(infer_lift_type("Harmony 6 Express"), LiftType::ExpressChair);
        assert_eq!(infer_lift_type("Franz's Chair"), LiftType::FixedChair);
        assert_eq!(infer_lift_type("Peak 2 Peak Gondola"), LiftType::Gondola);
    }

    #[test]
    fn test_reported_type_is_not_overridden_by_name() {
        let input = vec![RawLift {
            name: "Olympic Express".to_string(),
            lift_type: Some("zipline".to_string()),
            ..RawLift::default()
        }];
        let output = normalize(input, Utc::now());
        assert_eq!(output.records[0].lift_type, LiftType::Unknown);
        assert_eq!(output.records[0].status, LiftStatus::Unknown);
    }

    #[test]
    fn test_wait_time_only_when_open() {
        let input = vec![
            RawLift {
                wait_time_minutes: Some(7),
                ..raw("Peak Express", "open")
            },
            RawLift {
                wait_time_minutes: Some(7),
                ..raw("Symphony Express", "closed")
            },
            RawLift {
                wait_time_minutes: Some(-3),
                ..raw("Emerald 6 Express", "open")
            },
        ];
        let output = normalize(input, Utc::now());

        assert_eq!(output.records[0].wait_time_minutes, Some(7));
        assert_eq!(output.records[1].wait_time_minutes, None);
        assert_eq!(output.records[2].wait_time_minutes, None);
    }

    #[test]
    fn test_capacity_clamped() {
        let input = vec![
            RawLift {
                capacity: Some(-10),
                ..raw("Magic Chair", "open")
            },
            RawLift {
                capacity: Some(2800),
                ..raw("Wizard Express", "open")
            },
        ];
        let output = normalize(input, Utc::now());
        assert_eq!(output.records[0].capacity, 0);
        assert_eq!(output.records[1].capacity, 2800);
    }

    #[test]
    fn test_classification_uses_grouping() {
        let input = vec![RawLift {
            grouping: Some("Blackcomb".to_string()),
            ..raw("Lift 9", "open")
        }];
        let output = normalize(input, Utc::now());
        assert_eq!(output.records[0].mountain, Mountain::Blackcomb);
    }

    #[test]
    fn test_normalize_webcams() {
        let at = Utc::now();
        let cam = |name: &str, url: &str| WebcamRecord {
            name: name.to_string(),
            location: "Peak Area".to_string(),
            url: url.to_string(),
            is_live: true,
            last_updated: at,
            elevation: None,
        };
        let output = normalize_webcams(vec![
            cam("Whistler Peak", "https://cams.example.com/peak.jpg"),
            cam("whistler peak ", "https://cams.example.com/other.jpg"),
            cam("Village Square", ""),
        ]);
        assert_eq!(output.records.len(), 1);
        assert_eq!(output.duplicates_dropped, 1);
        assert_eq!(output.invalid_dropped, 1);
    }
}
