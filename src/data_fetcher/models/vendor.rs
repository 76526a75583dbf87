use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

/// Vendor resort-status response.
///
/// The vendor nests lifts inside "map" groupings (one per mountain or
/// area). The payload shape drifts, so every field is optional and a field
/// of the wrong type reads as absent instead of failing the response. Map
/// and lift entries that are not objects are skipped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VendorStatusResponse {
    #[serde(default, deserialize_with = "lenient_entries")]
    pub maps: Vec<VendorMap>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VendorMap {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_entries")]
    pub lifts: Vec<VendorLift>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VendorLift {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub lift_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub sector: Option<String>,
    #[serde(
        rename = "waitTimeInMinutes",
        default,
        deserialize_with = "lenient_integer"
    )]
    pub wait_time_in_minutes: Option<i64>,
    #[serde(default, deserialize_with = "lenient_integer")]
    pub capacity: Option<i64>,
}

/// Strings as-is; numbers and booleans as their text (so a numeric status
/// maps to `Unknown` downstream); anything else is absent.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    })
}

/// Integers, whole floats and numeric strings; anything else is absent.
fn lenient_integer<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().and_then(whole_number)),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<i64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().and_then(whole_number))
        }
        _ => None,
    })
}

fn whole_number(value: f64) -> Option<i64> {
    (value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64)
        .then_some(value as i64)
}

/// Array entries that decode as `T`; a missing or non-array value is empty.
fn lenient_entries<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let Value::Array(entries) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(entries
        .into_iter()
        .filter_map(|entry| {
            serde_json::from_value(entry)
                .inspect_err(|e| debug!("Skipping unreadable vendor entry: {e}"))
                .ok()
        })
        .collect())
}
