use http::StatusCode;
use http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    CONNECTION, CONTENT_LENGTH, CONTENT_TYPE,
};
use serde::Serialize;
use tracing::error;

/// A JSON (or empty) response. Every response allows any origin and closes
/// the connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    status: StatusCode,
    body: Vec<u8>,
}

impl Response {
    pub fn json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Response { status, body },
            Err(e) => {
                error!("Failed to serialize response body: {e}");
                Response {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    body: br#"{"error":"Internal server error"}"#.to_vec(),
                }
            }
        }
    }

    pub fn ok<T: Serialize + ?Sized>(value: &T) -> Self {
        Self::json(StatusCode::OK, value)
    }

    /// `{error, message}` body
    pub fn error(status: StatusCode, error: &str, message: impl Into<String>) -> Self {
        Self::json(
            status,
            &serde_json::json!({ "error": error, "message": message.into() }),
        )
    }

    pub fn no_content() -> Self {
        Response {
            status: StatusCode::NO_CONTENT,
            body: Vec::new(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Serializes status line, headers and body.
    pub fn to_bytes(&self) -> Vec<u8> {
        let reason = self.status.canonical_reason().unwrap_or("");
        let mut head = format!("HTTP/1.1 {} {}\r\n", self.status.as_u16(), reason);
        if !self.body.is_empty() {
            head.push_str(&format!("{}: application/json\r\n", CONTENT_TYPE));
        }
        head.push_str(&format!("{}: {}\r\n", CONTENT_LENGTH, self.body.len()));
        head.push_str(&format!("{}: *\r\n", ACCESS_CONTROL_ALLOW_ORIGIN));
        head.push_str(&format!(
            "{}: GET, POST, OPTIONS\r\n",
            ACCESS_CONTROL_ALLOW_METHODS
        ));
        head.push_str(&format!("{}: Content-Type\r\n", ACCESS_CONTROL_ALLOW_HEADERS));
        head.push_str(&format!("{}: close\r\n\r\n", CONNECTION));

        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(&self.body);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_response_bytes() {
        let response = Response::ok(&serde_json::json!({ "status": "ok" }));
        let text = String::from_utf8(response.to_bytes()).unwrap();

        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("content-type: application/json\r\n"));
        assert!(text.contains("content-length: 15\r\n"));
        assert!(text.contains("access-control-allow-origin: *\r\n"));
        assert!(text.contains("connection: close\r\n"));
        assert!(text.ends_with("\r\n\r\n{\"status\":\"ok\"}"));
    }

    #[test]
    fn test_no_content_has_no_body() {
        let response = Response::no_content();
        let text = String::from_utf8(response.to_bytes()).unwrap();
        assert!(text.starts_with("HTTP/1.1 204 No Content\r\n"));
        assert!(text.contains("content-length: 0\r\n"));
        assert!(!text.contains("content-type"));
    }

    #[test]
    fn test_error_body() {
        let response = Response::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to refresh lift data",
            "disk full",
        );
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["error"], "Failed to refresh lift data");
        assert_eq!(body["message"], "disk full");
    }
}
