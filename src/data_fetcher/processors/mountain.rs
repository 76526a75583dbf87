use crate::data_fetcher::models::Mountain;

/// Phrases naming the gondola that spans both mountains
pub const BOTH_PHRASES: &[&str] = &["peak 2 peak", "peak-2-peak", "peak to peak", "p2p"];

pub const BLACKCOMB_TOKENS: &[&str] = &[
    "blackcomb",
    "excalibur",
    "excelerator",
    "magic",
    "jersey cream",
    "crystal",
    "glacier",
    "7th heaven",
    "seventh heaven",
    "catskinner",
    "showcase",
    "horstman",
    "solar coaster",
    "wizard",
    "rendezvous",
];

pub const WHISTLER_TOKENS: &[&str] = &[
    "whistler",
    "creekside",
    "fitzsimmons",
    "peak express",
    "big red",
    "olympic",
    "franz",
    "emerald",
    "symphony",
    "garbanzo",
    "harmony",
    "roundhouse",
    "red chair",
    "orange chair",
    "t-bars",
];

/// Maps a lift onto its mountain.
///
/// Checks run in a fixed order and the first hit wins:
/// 1. Peak-to-Peak phrases anywhere ⇒ `Both`
/// 2. Blackcomb tokens in name, sector or grouping ⇒ `Blackcomb`
/// 3. Whistler tokens ⇒ `Whistler`
/// 4. An exact grouping label (`whistler`/`w`, `blackcomb`/`b`, `both`/`p2p`)
/// 5. `Unknown`
///
/// A name carrying tokens of both mountains resolves to `Blackcomb` because
/// that check runs first.
///
/// # Examples
///
/// ```rust
/// use lift_feed::data_fetcher::models::Mountain;
/// use lift_feed::data_fetcher::processors::classify;
///
/// assert_eq!(classify("Peak 2 Peak Gondola", None, None), Mountain::Both);
/// assert_eq!(classify("Glacier Express", None, None), Mountain::Blackcomb);
/// assert_eq!(classify("Lift 12", None, Some("W")), Mountain::Whistler);
/// ```
pub fn classify(name: &str, sector: Option<&str>, grouping: Option<&str>) -> Mountain {
    let haystacks: Vec<String> = [Some(name), sector, grouping]
        .into_iter()
        .flatten()
        .map(fold)
        .collect();

    let any_contains = |tokens: &[&str]| {
        haystacks
            .iter()
            .any(|text| tokens.iter().any(|token| text.contains(token)))
    };

    if any_contains(BOTH_PHRASES) {
        return Mountain::Both;
    }
    if any_contains(BLACKCOMB_TOKENS) {
        return Mountain::Blackcomb;
    }
    if any_contains(WHISTLER_TOKENS) {
        return Mountain::Whistler;
    }

    grouping.map_or(Mountain::Unknown, grouping_label)
}

fn grouping_label(grouping: &str) -> Mountain {
    match fold(grouping).as_str() {
        "whistler" | "w" => Mountain::Whistler,
        "blackcomb" | "b" => Mountain::Blackcomb,
        "both" | "p2p" | "peak 2 peak" => Mountain::Both,
        _ => Mountain::Unknown,
    }
}

/// Lower-cases and collapses runs of whitespace
fn fold(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peak_to_peak_overrides_everything() {
        assert_eq!(classify("Peak 2 Peak Gondola", None, None), Mountain::Both);
        assert_eq!(
            classify("PEAK-2-PEAK", Some("Blackcomb"), Some("Whistler")),
            Mountain::Both
        );
        assert_eq!(classify("P2P", None, None), Mountain::Both);
        assert_eq!(
            classify("Gondola", Some("peak to peak"), None),
            Mountain::Both
        );
    }

    #[test]
    fn test_blackcomb_wins_ties() {
        assert_eq!(
            classify("Whistler Blackcomb Express", None, None),
            Mountain::Blackcomb
        );
        assert_eq!(
            classify("Emerald Express", Some("Blackcomb side"), None),
            Mountain::Blackcomb
        );
    }

    #[test]
    fn test_name_tokens() {
        assert_eq!(classify("Magic Chair", None, None), Mountain::Blackcomb);
        assert_eq!(classify("7th Heaven Express", None, None), Mountain::Blackcomb);
        assert_eq!(classify("Creekside Gondola", None, None), Mountain::Whistler);
        assert_eq!(classify("Franz's Chair", None, None), Mountain::Whistler);
        assert_eq!(classify("Peak Express", None, None), Mountain::Whistler);
    }

    #[test]
    fn test_glacier_is_blackcomb() {
        assert_eq!(classify("Glacier Express", None, None), Mountain::Blackcomb);
    }

    #[test]
    fn test_grouping_fallback_requires_exact_label() {
        assert_eq!(classify("Lift 4", None, Some(" b ")), Mountain::Blackcomb);
        assert_eq!(classify("Lift 4", None, Some("Both")), Mountain::Both);
        assert_eq!(classify("Lift 4", None, Some("Base area")), Mountain::Unknown);
    }

    #[test]
    fn test_unknown_rather_than_guess() {
        assert_eq!(classify("Lift 7", None, None), Mountain::Unknown);
        assert_eq!(classify("", Some(""), None), Mountain::Unknown);
    }

    #[test]
    fn test_whitespace_is_folded() {
        assert_eq!(classify("Jersey   Cream Express", None, None), Mountain::Blackcomb);
    }
}
