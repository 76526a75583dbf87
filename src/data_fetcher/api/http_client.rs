//! Shared reqwest client construction

use reqwest::Client;
use std::time::Duration;

/// Identifies the service to upstreams that do not get a browser user agent.
const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Builds a pooled client whose whole-request timeout is `timeout_seconds`.
///
/// Each upstream (vendor API, page capture, extraction service) gets its
/// own client so a slow step only times out itself. The connect phase is
/// capped separately so an unreachable host fails fast.
pub fn create_http_client_with_timeout(timeout_seconds: u64) -> Result<Client, reqwest::Error> {
    let timeout = Duration::from_secs(timeout_seconds);
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(
            crate::constants::HTTP_CONNECT_TIMEOUT_SECONDS,
        )))
        .pool_max_idle_per_host(crate::constants::HTTP_POOL_MAX_IDLE_PER_HOST)
        .user_agent(DEFAULT_USER_AGENT)
        .build()
}

#[cfg(test)]
pub fn create_test_http_client() -> Client {
    create_http_client_with_timeout(crate::constants::DEFAULT_HTTP_TIMEOUT_SECONDS)
        .expect("Failed to create test HTTP client")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_client_identifies_itself() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("user-agent", DEFAULT_USER_AGENT))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let response = create_test_http_client()
            .get(server.uri())
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
    }
}
