//! Name-scanning extraction used when structured extraction is unavailable.
//!
//! Both scanners work on an ASCII-lower-cased copy of the document so byte
//! offsets line up with the original text.

use super::normalize::RawLift;
use crate::data_fetcher::models::WebcamRecord;
use crate::error::FetchError;
use chrono::{DateTime, Utc};
use reqwest::Url;
use tracing::debug;

const ORIGIN: &str = "heuristic";

/// Bytes on either side of a lift name searched for a status token
const STATUS_WINDOW: usize = 160;

/// Furthest a media tag may sit from a webcam name and still be paired with it
const MEDIA_WINDOW: usize = 1500;

/// Known lifts: canonical name followed by the spellings pages use
pub const KNOWN_LIFTS: &[(&str, &[&str])] = &[
    ("Peak 2 Peak Gondola", &["peak 2 peak gondola", "peak-2-peak gondola", "p2p gondola"]),
    ("Whistler Village Gondola", &["whistler village gondola"]),
    ("Creekside Gondola", &["creekside gondola"]),
    ("Fitzsimmons Express", &["fitzsimmons express"]),
    ("Garbanzo Express", &["garbanzo express"]),
    ("Big Red Express", &["big red express"]),
    ("Emerald 6 Express", &["emerald 6 express", "emerald express"]),
    ("Franz's Chair", &["franz's chair", "franz&#39;s chair", "franz\u{2019}s chair"]),
    ("Olympic Chair", &["olympic chair"]),
    ("Peak Express", &["peak express"]),
    ("Harmony 6 Express", &["harmony 6 express", "harmony express"]),
    ("Symphony Express", &["symphony express"]),
    ("Whistler T-Bars", &["whistler t-bars", "t-bars"]),
    ("Blackcomb Gondola", &["blackcomb gondola"]),
    ("Excalibur Gondola", &["excalibur gondola"]),
    ("Excelerator Express", &["excelerator express"]),
    ("Magic Chair", &["magic chair"]),
    ("Jersey Cream Express", &["jersey cream express"]),
    ("Catskinner Express", &["catskinner express", "catskinner chair"]),
    ("Crystal Ridge Express", &["crystal ridge express", "crystal chair"]),
    ("Glacier Express", &["glacier express"]),
    ("7th Heaven Express", &["7th heaven express", "seventh heaven express"]),
    ("Showcase T-Bar", &["showcase t-bar"]),
    ("Horstman T-Bar", &["horstman t-bar"]),
    ("Wizard Express", &["wizard express"]),
    ("Solar Coaster Express", &["solar coaster express"]),
];

/// Status tokens and the status string each one stands for
const STATUS_TOKENS: &[(&str, &str)] = &[
    ("open", "Open"),
    ("closed", "Closed"),
    ("scheduled", "Scheduled"),
    ("hold", "On Hold"),
];

pub const KNOWN_WEBCAMS: &[&str] = &[
    "Peak Express",
    "Whistler Peak",
    "Blackcomb Glacier",
    "Roundhouse Lodge",
    "Village Square",
    "Rendezvous Lodge",
    "Crystal Hut",
    "Harmony",
    "Symphony",
    "Emerald Express",
    "Big Red Express",
    "Catskinner",
    "Jersey Cream",
    "7th Heaven",
    "Glacier Express",
];

/// Finds known lifts in `document` and infers each status from the nearest
/// status token.
///
/// The search window for a lift ends halfway to its neighbouring matches so
/// a token is never attributed across another lift. A lift with no token in
/// range gets no status (normalized to `Unknown`).
pub fn scan_lifts(document: &str) -> Result<Vec<RawLift>, FetchError> {
    let lower = document.to_ascii_lowercase();
    let bytes = lower.as_bytes();

    let mut matches: Vec<(usize, usize, &str)> = KNOWN_LIFTS
        .iter()
        .filter_map(|(canonical, spellings)| {
            spellings.iter().find_map(|spelling| {
                find(bytes, spelling.as_bytes(), 0)
                    .map(|start| (start, start + spelling.len(), *canonical))
            })
        })
        .collect();

    if matches.is_empty() {
        return Err(FetchError::no_data(
            ORIGIN,
            "no known lift names found in document",
        ));
    }
    matches.sort_by_key(|&(start, _, _)| start);

    let lifts = matches
        .iter()
        .enumerate()
        .map(|(i, &(start, end, name))| {
            let previous_end = i.checked_sub(1).map_or(0, |p| matches[p].1.min(start));
            let next_start = matches.get(i + 1).map_or(bytes.len(), |m| m.0.max(end));
            // Tokens between two matches belong to the nearer lift
            let lower_bound = start
                .saturating_sub(STATUS_WINDOW)
                .max(previous_end + (start - previous_end) / 2);
            let upper_bound = (end + STATUS_WINDOW).min(end + (next_start - end) / 2);

            RawLift {
                name: name.to_string(),
                status: nearest_status(bytes, lower_bound, start, end, upper_bound)
                    .map(str::to_string),
                ..RawLift::default()
            }
        })
        .collect::<Vec<_>>();

    debug!("Heuristic scan found {} known lifts", lifts.len());
    Ok(lifts)
}

fn nearest_status(
    bytes: &[u8],
    lower_bound: usize,
    name_start: usize,
    name_end: usize,
    upper_bound: usize,
) -> Option<&'static str> {
    let mut best: Option<(usize, &'static str)> = None;

    for &(token, status) in STATUS_TOKENS {
        let search_end = (upper_bound + token.len()).min(bytes.len());
        let mut from = lower_bound;
        while let Some(at) = find(&bytes[..search_end], token.as_bytes(), from) {
            if at >= upper_bound {
                break;
            }
            let token_end = at + token.len();
            from = at + 1;
            let distance = if token_end <= name_start {
                name_start - token_end
            } else if at >= name_end {
                at - name_end
            } else {
                continue;
            };
            if best.is_none_or(|(d, _)| distance < d) {
                best = Some((distance, status));
            }
        }
    }

    best.map(|(_, status)| status)
}

/// A media tag with a source URL
#[derive(Debug, Clone, PartialEq)]
struct MediaSource {
    position: usize,
    url: String,
    streaming: bool,
}

/// Finds known webcam names in `document` and pairs each with the nearest
/// `<img>`, `<iframe>` or `<video>` source.
pub fn scan_webcams(
    document: &str,
    page_url: &str,
    fetched_at: DateTime<Utc>,
) -> Result<Vec<WebcamRecord>, FetchError> {
    let lower = document.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let media = media_sources(document, bytes, page_url);

    let webcams: Vec<WebcamRecord> = KNOWN_WEBCAMS
        .iter()
        .filter_map(|name| {
            let needle = name.to_ascii_lowercase();
            let position = find(bytes, needle.as_bytes(), 0)?;
            let source = media
                .iter()
                .map(|m| (m.position.abs_diff(position), m))
                .filter(|(distance, _)| *distance <= MEDIA_WINDOW)
                .min_by_key(|(distance, _)| *distance)
                .map(|(_, m)| m)?;
            let (location, elevation) = location_for(name);

            Some(WebcamRecord {
                name: name.to_string(),
                location: location.to_string(),
                url: source.url.clone(),
                is_live: source.streaming,
                last_updated: fetched_at,
                elevation,
            })
        })
        .collect();

    if webcams.is_empty() {
        return Err(FetchError::no_data(
            ORIGIN,
            "no known webcams with media found in document",
        ));
    }
    debug!("Heuristic scan found {} webcams", webcams.len());
    Ok(webcams)
}

fn media_sources(document: &str, lower: &[u8], page_url: &str) -> Vec<MediaSource> {
    let base = Url::parse(page_url).ok();
    let mut sources = Vec::new();

    for (tag, streaming) in [("<img", false), ("<iframe", true), ("<video", true), ("<source", true)] {
        let mut from = 0;
        while let Some(start) = find(lower, tag.as_bytes(), from) {
            from = start + tag.len();
            let end = find(lower, b">", from).unwrap_or(lower.len());
            let Some(raw) = attribute_value(document, lower, from, end, b"src=") else {
                continue;
            };
            let raw = raw.replace("&amp;", "&");
            let url = match &base {
                Some(base) => base.join(&raw).map(String::from).unwrap_or(raw),
                None => raw,
            };
            let streaming = streaming || url.contains("stream") || url.contains("live");
            sources.push(MediaSource {
                position: start,
                url,
                streaming,
            });
        }
    }

    sources
}

/// Quoted value of `name` inside `[from, end)`, requiring whitespace before it
fn attribute_value<'a>(
    document: &'a str,
    lower: &[u8],
    from: usize,
    end: usize,
    name: &[u8],
) -> Option<&'a str> {
    let mut cursor = from;
    while let Some(at) = find(&lower[..end], name, cursor) {
        cursor = at + 1;
        if at == 0 || !lower[at - 1].is_ascii_whitespace() {
            continue;
        }
        let quote_at = at + name.len();
        let quote = *lower.get(quote_at)?;
        if quote != b'"' && quote != b'\'' {
            continue;
        }
        let value_start = quote_at + 1;
        let value_end = value_start + lower[value_start..end].iter().position(|&b| b == quote)?;
        let value = document.get(value_start..value_end)?.trim();
        if !value.is_empty() {
            return Some(value);
        }
    }
    None
}

/// Location label and elevation (metres) for a webcam name
pub fn location_for(name: &str) -> (&'static str, Option<u32>) {
    if name.contains("Peak") {
        ("Peak Area", Some(2180))
    } else if name.contains("Glacier") || name.contains("7th Heaven") {
        ("Blackcomb Glacier", Some(2240))
    } else if name.contains("Roundhouse") {
        ("Mid-Mountain", Some(1860))
    } else if name.contains("Village") {
        ("Whistler Village", Some(675))
    } else if name.contains("Rendezvous") {
        ("Blackcomb Mid-Mountain", Some(1860))
    } else if name.contains("Crystal") {
        ("Crystal Ridge", Some(2020))
    } else {
        ("Mountain Area", None)
    }
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| from + offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIFT_PAGE: &str = r#"
        <div class="lift-container openContainer">
          <div class="liftName openName"><div>Creekside Gondola</div></div>
        </div>
        <div class="lift-container closedContainer">
          <div class="liftName closedName">Harmony 6 Express</div>
        </div>
        <div class="lift-container holdContainer">
          <div class="liftName holdName">Peak 2 Peak Gondola</div>
        </div>
    "#;

    #[test]
    fn test_scan_lifts_reads_container_classes() {
        let lifts = scan_lifts(LIFT_PAGE).unwrap();
        let status_of = |name: &str| {
            lifts
                .iter()
                .find(|l| l.name == name)
                .and_then(|l| l.status.clone())
        };

        assert_eq!(lifts.len(), 3);
        assert_eq!(lifts[0].name, "Creekside Gondola");
        assert_eq!(status_of("Creekside Gondola").as_deref(), Some("Open"));
        assert_eq!(status_of("Harmony 6 Express").as_deref(), Some("Closed"));
        assert_eq!(status_of("Peak 2 Peak Gondola").as_deref(), Some("On Hold"));
    }

    #[test]
    fn test_scan_lifts_plain_text() {
        let text = "Magic Chair: scheduled. Wizard Express - CLOSED. Glacier Express";
        let lifts = scan_lifts(text).unwrap();

        assert_eq!(lifts.len(), 3);
        assert_eq!(lifts[0].status.as_deref(), Some("Scheduled"));
        assert_eq!(lifts[1].status.as_deref(), Some("Closed"));
        // The only token near Glacier Express sits closer to Wizard Express
        assert_eq!(lifts[2].status, None);
    }

    #[test]
    fn test_scan_lifts_nothing_found() {
        let error = scan_lifts("<html><body>Snow report</body></html>").unwrap_err();
        assert!(matches!(error, FetchError::NoData { .. }));
    }

    #[test]
    fn test_scan_webcams_pairs_nearest_media() {
        let page = r#"
            <h3>Roundhouse Lodge</h3>
            <img alt="cam" src="/images/cams/roundhouse.jpg?w=800&amp;h=600">
            <h3>Village Square</h3>
            <iframe src="https://stream.example.com/village"></iframe>
        "#;
        let webcams = scan_webcams(page, "https://www.example.com/cams/", Utc::now()).unwrap();

        assert_eq!(webcams.len(), 2);
        let roundhouse = webcams.iter().find(|w| w.name == "Roundhouse Lodge").unwrap();
        assert_eq!(
            roundhouse.url,
            "https://www.example.com/images/cams/roundhouse.jpg?w=800&h=600"
        );
        assert!(!roundhouse.is_live);
        assert_eq!(roundhouse.location, "Mid-Mountain");
        assert_eq!(roundhouse.elevation, Some(1860));

        let village = webcams.iter().find(|w| w.name == "Village Square").unwrap();
        assert_eq!(village.url, "https://stream.example.com/village");
        assert!(village.is_live);
    }

    #[test]
    fn test_scan_webcams_without_media_is_no_data() {
        let error = scan_webcams("<p>Roundhouse Lodge</p>", "https://x.example/", Utc::now())
            .unwrap_err();
        assert!(matches!(error, FetchError::NoData { .. }));
    }

    #[test]
    fn test_location_table() {
        assert_eq!(location_for("Whistler Peak"), ("Peak Area", Some(2180)));
        assert_eq!(location_for("7th Heaven"), ("Blackcomb Glacier", Some(2240)));
        assert_eq!(location_for("Harmony"), ("Mountain Area", None));
    }
}
