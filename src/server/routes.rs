use super::request::Request;
use super::response::Response;
use crate::constants::SERVICE_NAME;
use crate::data_fetcher::models::{LiftSnapshot, Snapshot, WebcamSnapshot};
use crate::refresh::Refresher;
use crate::service::FeedService;
use chrono::Utc;
use http::{Method, StatusCode};
use serde_json::json;
use tracing::{debug, error};

pub const ENDPOINTS: &[&str] = &[
    "GET /health",
    "GET /api/lifts",
    "GET /api/webcams",
    "GET /api/all",
    "GET /api/status",
    "GET /api/lifts/log",
    "GET /api/webcams/log",
    "POST /api/lifts/refresh",
    "POST /api/webcams/refresh",
];

/// Maps a request onto a service operation.
pub async fn route(service: &FeedService, request: &Request) -> Response {
    let path = match request.path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };
    debug!("{} {}", request.method, path);

    match (&request.method, path) {
        (&Method::OPTIONS, _) => Response::no_content(),
        (&Method::GET, "/health") => health(),
        (&Method::GET, "/api/lifts") => Response::ok(&service.lifts().serve().await),
        (&Method::GET, "/api/webcams") => Response::ok(&service.webcams().serve().await),
        (&Method::POST, "/api/lifts/refresh") => {
            refresh(service.lifts(), "Failed to refresh lift data").await
        }
        (&Method::POST, "/api/webcams/refresh") => {
            refresh(service.webcams(), "Failed to refresh webcam data").await
        }
        (&Method::GET, "/api/lifts/log") => Response::ok(&service.lifts().log_entries().await),
        (&Method::GET, "/api/webcams/log") => {
            Response::ok(&service.webcams().log_entries().await)
        }
        (&Method::GET, "/api/all") => all(service).await,
        (&Method::GET, "/api/status") => Response::ok(&service.status().await),
        _ => not_found(&request.path),
    }
}

fn health() -> Response {
    Response::ok(&json!({
        "status": "ok",
        "timestamp": Utc::now(),
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn refresh<S: Snapshot>(refresher: &Refresher<S>, failure: &str) -> Response {
    match refresher.force_refresh().await {
        Ok(snapshot) => Response::ok(&json!({ "success": true, "data": snapshot })),
        Err(e) => {
            error!("{failure}: {e}");
            Response::error(StatusCode::INTERNAL_SERVER_ERROR, failure, e.to_string())
        }
    }
}

/// Both kinds from cache only. Missing or stale kinds get a background
/// refresh and an empty placeholder.
async fn all(service: &FeedService) -> Response {
    let lifts = cached_or_trigger(service.lifts()).await;
    let webcams = cached_or_trigger(service.webcams()).await;

    Response::ok(&json!({
        "lastUpdated": Utc::now(),
        "lifts": lifts.map_or_else(
            || json!({ "lifts": [], "liftCount": 0 }),
            |s: LiftSnapshot| json!(s),
        ),
        "webcams": webcams.map_or_else(
            || json!({ "webcams": [], "webcamCount": 0 }),
            |s: WebcamSnapshot| json!(s),
        ),
    }))
}

async fn cached_or_trigger<S: Snapshot>(refresher: &Refresher<S>) -> Option<S> {
    let cached = refresher.cached().await;
    if cached.as_ref().is_none_or(|s| !refresher.is_fresh(s)) {
        refresher.trigger_background();
    }
    cached
}

fn not_found(path: &str) -> Response {
    Response::json(
        StatusCode::NOT_FOUND,
        &json!({
            "error": "Endpoint not found",
            "path": path,
            "availableEndpoints": ENDPOINTS,
        }),
    )
}
