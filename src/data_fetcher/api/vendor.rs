use super::adapter::Adapter;
use super::fetch_utils::fetch_json;
use super::http_client::create_http_client_with_timeout;
use crate::config::VendorConfig;
use crate::data_fetcher::models::{LiftSnapshot, Source, VendorStatusResponse};
use crate::data_fetcher::processors::{RawLift, normalize};
use crate::error::FetchError;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use tracing::{info, instrument, warn};

const ORIGIN: &str = "vendor API";

/// Authenticated client for the vendor resort-status endpoint.
pub struct VendorAdapter {
    client: Client,
    url: String,
    auth_header: String,
    api_key: String,
}

impl VendorAdapter {
    pub fn new(config: &VendorConfig) -> Result<Self, reqwest::Error> {
        Ok(VendorAdapter {
            client: create_http_client_with_timeout(config.timeout_seconds)?,
            url: status_url(&config.base_url, &config.resort_id),
            auth_header: config.auth_header.clone(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Per-resort status endpoint under `base_url`
pub fn status_url(base_url: &str, resort_id: &str) -> String {
    format!(
        "{}/resort/rpos/{}/status",
        base_url.trim_end_matches('/'),
        resort_id
    )
}

/// Flattens the vendor's map groupings into raw lifts, keeping the map name
/// as the grouping label.
pub fn flatten_maps(response: VendorStatusResponse) -> Vec<RawLift> {
    response
        .maps
        .into_iter()
        .flat_map(|map| {
            let grouping = map.name;
            map.lifts.into_iter().map(move |lift| RawLift {
                name: lift.name.unwrap_or_default(),
                status: lift.status,
                lift_type: lift.lift_type,
                sector: lift.sector,
                grouping: grouping.clone(),
                wait_time_minutes: lift.wait_time_in_minutes,
                capacity: lift.capacity,
            })
        })
        .collect()
}

#[async_trait]
impl Adapter<LiftSnapshot> for VendorAdapter {
    fn name(&self) -> &'static str {
        "vendor-api"
    }

    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch(&self) -> Result<LiftSnapshot, FetchError> {
        let request = self
            .client
            .get(&self.url)
            .header(self.auth_header.as_str(), self.api_key.as_str())
            .header(reqwest::header::ACCEPT, "application/json");

        let response: VendorStatusResponse =
            fetch_json(request, &self.url, ORIGIN).await.inspect_err(|e| {
                if e.is_auth_failure() {
                    warn!("Vendor API rejected credentials: {e}");
                }
            })?;

        let fetched_at = Utc::now();
        let normalized = normalize(flatten_maps(response), fetched_at);
        if normalized.records.is_empty() {
            return Err(FetchError::no_data(ORIGIN, "response contained no named lifts"));
        }

        info!(
            "Vendor API returned {} lifts ({} duplicates dropped)",
            normalized.records.len(),
            normalized.duplicates_dropped
        );
        Ok(LiftSnapshot::live(
            Source::LiveVendorApi,
            fetched_at,
            normalized.records,
        ))
    }
}
