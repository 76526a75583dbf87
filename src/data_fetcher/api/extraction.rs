//! Structured extraction over a chat-completions service.
//!
//! The service turns a captured page into JSON. Its output is never trusted:
//! fences are stripped, a bare array is wrapped, and the result must match
//! the typed schema before it reaches the normalizer.

use super::http_client::create_http_client_with_timeout;
use crate::config::ExtractionConfig;
use crate::constants::extraction::TEMPERATURE;
use crate::data_fetcher::models::WebcamRecord;
use crate::data_fetcher::processors::RawLift;
use crate::data_fetcher::processors::heuristic::location_for;
use crate::error::FetchError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};

pub const SYSTEM_PROMPT: &str = "You are a precise web scraping assistant that extracts structured data from HTML. Always return valid JSON.";

const LIFT_INSTRUCTIONS: &str = r#"Parse this HTML from a ski resort live lift status page and extract ALL lifts.

Return ONLY a JSON object, no markdown, in exactly this shape:
{"lastUpdated": "<ISO-8601>", "source": "<page host>", "liftCount": <n>,
 "lifts": [{"liftName": "Creekside Gondola", "status": "Open", "mountain": "Whistler", "type": "Gondola", "lastUpdated": "<ISO-8601>"}]}

Rules:
1. status is one of Open, Closed, Scheduled, On Hold, Maintenance, Unknown. Containers with an "openContainer" class are Open, "closedContainer" Closed, "holdContainer" On Hold.
2. mountain is Whistler, Blackcomb or Both (Peak 2 Peak spans both). Use Unknown when unsure.
3. type is one of Gondola, Express Chair, Fixed Chair, Surface Lift, T-Bar, Funicular, Unknown, inferred from the name.
4. Include waitTimeMinutes only when the page shows a wait.
5. Do not miss any lift."#;

const WEBCAM_INSTRUCTIONS: &str = r#"Parse this HTML from a ski resort webcam page and extract the live mountain webcams.

Return ONLY a JSON array, no markdown, in exactly this shape:
[{"name": "Roundhouse Lodge", "url": "https://example.com/camera1.jpg", "location": "Whistler Mountain", "isLive": true, "lastUpdated": "<ISO-8601>"}]

Rules:
1. Only include actual mountain or ski area webcams.
2. Use the best available image or stream URL.
3. location names the mountain or area (Whistler, Blackcomb, Base, Peak).
4. isLive is true for live feeds and false for static images."#;

/// The structured-extraction capability.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Sends one prompt and returns the raw text answer.
    async fn complete(&self, system: &str, user: &str) -> Result<String, FetchError>;
}

/// Builds the user prompt for a captured lift page
pub fn lift_prompt(page_url: &str, document: &str) -> String {
    format!(
        "{LIFT_INSTRUCTIONS}\n\nPage: {page_url}\nCurrent time: {}\n\nHTML Content:\n{document}",
        Utc::now().to_rfc3339()
    )
}

/// Builds the user prompt for a captured webcam page
pub fn webcam_prompt(page_url: &str, document: &str) -> String {
    format!(
        "{WEBCAM_INSTRUCTIONS}\n\nPage: {page_url}\nCurrent time: {}\n\nHTML Content:\n{document}",
        Utc::now().to_rfc3339()
    )
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat-completions client.
pub struct ChatCompletionsExtractor {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    timeout_seconds: u64,
}

impl ChatCompletionsExtractor {
    pub fn new(config: &ExtractionConfig) -> Result<Self, reqwest::Error> {
        Ok(ChatCompletionsExtractor {
            client: create_http_client_with_timeout(config.timeout_seconds)?,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            timeout_seconds: config.timeout_seconds,
        })
    }
}

#[async_trait]
impl Extractor for ChatCompletionsExtractor {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn complete(&self, system: &str, user: &str) -> Result<String, FetchError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: TEMPERATURE,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.transport_error(&e))?;

        if !status.is_success() {
            return Err(classify_service_failure(status, &text));
        }

        let parsed: ChatResponse = serde_json::from_str(&text).map_err(|e| {
            FetchError::extraction_service(None, format!("unreadable response: {e}"))
        })?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| FetchError::extraction_service(None, "response had no content"))?;

        debug!("Extraction returned {} chars", content.len());
        Ok(content)
    }
}

impl ChatCompletionsExtractor {
    fn transport_error(&self, error: &reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::ExtractionTimeout {
                seconds: self.timeout_seconds,
            }
        } else {
            FetchError::extraction_service(None, error.to_string())
        }
    }
}

/// Quota and billing failures make the service unusable; anything else is an
/// ordinary service error.
fn classify_service_failure(status: StatusCode, body: &str) -> FetchError {
    let lowered = body.to_lowercase();
    let quota_exhausted = lowered.contains("quota") || lowered.contains("billing");

    if status == StatusCode::PAYMENT_REQUIRED
        || (status == StatusCode::TOO_MANY_REQUESTS && quota_exhausted)
    {
        warn!("Extraction service unavailable ({status})");
        return FetchError::extraction_unavailable(format!("{status}: quota or billing exhausted"));
    }

    let snippet: String = body.chars().take(200).collect();
    FetchError::extraction_service(Some(status.as_u16()), snippet)
}

/// Removes a surrounding markdown code fence, with or without a language tag.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag line (e.g. ```json)
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Parses fenced or bare JSON, wrapping a top-level array under `key`.
fn parse_wrapped(text: &str, key: &str) -> Result<Value, FetchError> {
    let value: Value = serde_json::from_str(strip_code_fences(text))
        .map_err(|e| FetchError::malformed_extraction(format!("invalid JSON: {e}")))?;
    Ok(match value {
        Value::Array(items) => {
            let mut wrapped = serde_json::Map::new();
            wrapped.insert(key.to_string(), Value::Array(items));
            Value::Object(wrapped)
        }
        other => other,
    })
}

#[derive(Deserialize)]
struct ExtractedLifts {
    lifts: Vec<ExtractedLift>,
}

#[derive(Deserialize)]
struct ExtractedLift {
    #[serde(rename = "liftName", alias = "name")]
    name: String,
    status: String,
    #[serde(default)]
    mountain: Option<String>,
    #[serde(rename = "type", default)]
    lift_type: Option<String>,
    #[serde(rename = "waitTimeMinutes", default)]
    wait_time_minutes: Option<i64>,
}

/// Validates extraction output for a lift page.
///
/// The reported mountain becomes the grouping label, so the classifier's own
/// name tokens still take precedence.
pub fn parse_lift_extraction(text: &str) -> Result<Vec<RawLift>, FetchError> {
    let value = parse_wrapped(text, "lifts")?;
    let parsed: ExtractedLifts = serde_json::from_value(value)
        .map_err(|e| FetchError::malformed_extraction(format!("schema mismatch: {e}")))?;

    Ok(parsed
        .lifts
        .into_iter()
        .map(|lift| RawLift {
            name: lift.name,
            status: Some(lift.status),
            lift_type: lift.lift_type,
            sector: None,
            grouping: lift.mountain,
            wait_time_minutes: lift.wait_time_minutes,
            capacity: None,
        })
        .collect())
}

#[derive(Deserialize)]
struct ExtractedWebcams {
    webcams: Vec<ExtractedWebcam>,
}

#[derive(Deserialize)]
struct ExtractedWebcam {
    name: String,
    #[serde(alias = "imageUrl")]
    url: String,
    #[serde(default)]
    location: Option<String>,
    #[serde(rename = "isLive", default)]
    is_live: Option<bool>,
    #[serde(default)]
    elevation: Option<u32>,
}

/// Validates extraction output for a webcam page.
///
/// Relative URLs are resolved against `page_url`; missing location and
/// elevation fall back to the known-camera table.
pub fn parse_webcam_extraction(
    text: &str,
    page_url: &str,
    fetched_at: DateTime<Utc>,
) -> Result<Vec<WebcamRecord>, FetchError> {
    let value = parse_wrapped(text, "webcams")?;
    let parsed: ExtractedWebcams = serde_json::from_value(value)
        .map_err(|e| FetchError::malformed_extraction(format!("schema mismatch: {e}")))?;
    let base = Url::parse(page_url).ok();

    Ok(parsed
        .webcams
        .into_iter()
        .map(|webcam| {
            let (known_location, known_elevation) = location_for(&webcam.name);
            let url = match &base {
                Some(base) => base
                    .join(&webcam.url)
                    .map(String::from)
                    .unwrap_or(webcam.url),
                None => webcam.url,
            };
            WebcamRecord {
                location: webcam
                    .location
                    .filter(|l| !l.trim().is_empty())
                    .unwrap_or_else(|| known_location.to_string()),
                elevation: webcam.elevation.or(known_elevation),
                is_live: webcam.is_live.unwrap_or(true),
                name: webcam.name,
                url,
                last_updated: fetched_at,
            }
        })
        .collect())
}

/// Truncates `document` to at most `max_chars` characters
pub fn truncate_document(document: &str, max_chars: usize) -> &str {
    match document.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &document[..byte_index],
        None => document,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> ExtractionConfig {
        ExtractionConfig {
            endpoint: format!("{}/v1/chat/completions", server.uri()),
            api_key: "sk-test".to_string(),
            timeout_seconds: 5,
            ..ExtractionConfig::default()
        }
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```\n"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  [2]  "), "[2]");
    }

    #[test]
    fn test_fenced_bare_array_is_wrapped() {
        let text = "```json\n[{\"liftName\":\"Peak Express\",\"status\":\"OPEN\",\"mountain\":\"Whistler\",\"type\":\"Express Chair\"}]\n```";
        let lifts = parse_lift_extraction(text).unwrap();

        assert_eq!(lifts.len(), 1);
        assert_eq!(lifts[0].name, "Peak Express");
        assert_eq!(lifts[0].status.as_deref(), Some("OPEN"));
        assert_eq!(lifts[0].grouping.as_deref(), Some("Whistler"));
    }

    #[test]
    fn test_object_form_ignores_reported_count() {
        let text = r#"{"lastUpdated":"2025-01-24T15:30:00Z","source":"whistlerpeak.com","liftCount":99,
            "lifts":[{"liftName":"Magic Chair","status":"Closed"}]}"#;
        let lifts = parse_lift_extraction(text).unwrap();
        assert_eq!(lifts.len(), 1);
        assert!(lifts[0].lift_type.is_none());
    }

    #[test]
    fn test_malformed_output_is_distinct() {
        assert!(matches!(
            parse_lift_extraction("Sorry, I cannot help with that."),
            Err(FetchError::MalformedExtraction { .. })
        ));
        assert!(matches!(
            parse_lift_extraction(r#"{"lifts":[{"status":"Open"}]}"#),
            Err(FetchError::MalformedExtraction { .. })
        ));
        assert!(matches!(
            parse_lift_extraction(r#"{"data":[]}"#),
            Err(FetchError::MalformedExtraction { .. })
        ));
    }

    #[test]
    fn test_webcam_extraction_accepts_object_and_image_url() {
        let text = r#"{"webcams":[{"name":"Whistler Peak","imageUrl":"/cams/peak.jpg"}]}"#;
        let webcams =
            parse_webcam_extraction(text, "https://www.example.com/cams/", Utc::now()).unwrap();

        assert_eq!(webcams[0].url, "https://www.example.com/cams/peak.jpg");
        assert_eq!(webcams[0].location, "Peak Area");
        assert_eq!(webcams[0].elevation, Some(2180));
        assert!(webcams[0].is_live);
    }

    #[test]
    fn test_truncate_document() {
        assert_eq!(truncate_document("héllo", 2), "hé");
        assert_eq!(truncate_document("abc", 10), "abc");
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "[]"}}]
            })))
            .mount(&mock_server)
            .await;

        let extractor = ChatCompletionsExtractor::new(&config_for(&mock_server)).unwrap();
        let content = extractor.complete(SYSTEM_PROMPT, "html").await.unwrap();
        assert_eq!(content, "[]");
    }

    #[tokio::test]
    async fn test_quota_exhaustion_is_unavailable() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"code": "insufficient_quota", "message": "You exceeded your current quota"}
            })))
            .mount(&mock_server)
            .await;

        let extractor = ChatCompletionsExtractor::new(&config_for(&mock_server)).unwrap();
        let error = extractor.complete(SYSTEM_PROMPT, "html").await.unwrap_err();
        assert!(error.is_extraction_unavailable());
    }

    #[tokio::test]
    async fn test_server_error_is_service_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&mock_server)
            .await;

        let extractor = ChatCompletionsExtractor::new(&config_for(&mock_server)).unwrap();
        let error = extractor.complete(SYSTEM_PROMPT, "html").await.unwrap_err();
        assert!(matches!(
            error,
            FetchError::ExtractionService {
                status: Some(500),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_timeout_is_extraction_timeout() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(3)),
            )
            .mount(&mock_server)
            .await;

        let config = ExtractionConfig {
            timeout_seconds: 1,
            ..config_for(&mock_server)
        };
        let extractor = ChatCompletionsExtractor::new(&config).unwrap();
        let error = extractor.complete(SYSTEM_PROMPT, "html").await.unwrap_err();
        assert!(matches!(error, FetchError::ExtractionTimeout { seconds: 1 }));
    }
}
