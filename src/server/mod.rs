//! Audio-source search proxy
//!
//! Stateless HTTP surface: one credentialed pass-through to the
//! third-party audio search API and one scrape-based track listing.
//! No caching, no retries, no rate limiting; permissive CORS on every
//! route so the browser client can call it directly.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::error::ApexResult;
use crate::server::forward::{forward, ForwardTarget};

pub mod forward;
pub mod scrape;

/// Default free-text query when the client sends none
const DEFAULT_QUERY: &str = "game music";
const DEFAULT_PAGE: &str = "1";
const DEFAULT_PER_PAGE: &str = "20";

/// A selectable background-music track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioTrack {
    pub id: usize,
    pub name: String,
    /// Preview/stream URL
    pub url: String,
    /// Duration in seconds, when the source reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Descriptive tags, when the source reports them
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl AudioTrack {
    /// Track descriptor shaped from a scraped preview URL
    pub fn scraped(index: usize, url: String) -> Self {
        Self {
            id: index,
            name: format!("Mixkit Track {}", index + 1),
            url,
            duration: None,
            tags: Vec::new(),
        }
    }
}

/// Proxy configuration: upstreams and the server-held credential
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Search API upstream base URL
    pub search_upstream: String,
    /// Server-held search API credential; requests fail without it
    pub search_api_key: Option<String>,
    /// Public page scraped for the track listing
    pub scrape_page_url: String,
}

impl ProxyConfig {
    /// Configuration from the environment (`PIXABAY_API_KEY`)
    pub fn from_env() -> Self {
        Self {
            search_upstream: "https://pixabay.com/api/audio/".to_string(),
            search_api_key: std::env::var("PIXABAY_API_KEY").ok(),
            scrape_page_url: "https://mixkit.co/free-stock-music/".to_string(),
        }
    }
}

/// Shared per-request state
#[derive(Clone)]
pub struct ServerState {
    config: ProxyConfig,
    http: reqwest::Client,
}

impl ServerState {
    pub fn new(config: ProxyConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }
}

/// Build the proxy router
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/api/audio/search", get(search_audio))
        .route("/api/audio/tracks", get(list_scraped_tracks))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve the proxy until the process exits
pub async fn serve(state: ServerState, port: u16) -> ApexResult<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Audio proxy listening on port {}", port);
    axum::serve(listener, router(state))
        .await
        .map_err(Into::into)
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: Option<String>,
    page: Option<String>,
    per_page: Option<String>,
}

/// Credentialed pass-through to the third-party audio search API
///
/// Relays the upstream body and status verbatim.
async fn search_audio(
    State(state): State<ServerState>,
    Query(params): Query<SearchParams>,
) -> Response {
    let Some(api_key) = state.config.search_api_key.clone() else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "PIXABAY_API_KEY is not set" })),
        )
            .into_response();
    };

    let target = ForwardTarget::new(state.config.search_upstream.clone())
        .with_credential("key", api_key);
    let query = vec![
        (
            "q".to_string(),
            params.q.unwrap_or_else(|| DEFAULT_QUERY.to_string()),
        ),
        (
            "page".to_string(),
            params.page.unwrap_or_else(|| DEFAULT_PAGE.to_string()),
        ),
        (
            "per_page".to_string(),
            params.per_page.unwrap_or_else(|| DEFAULT_PER_PAGE.to_string()),
        ),
        ("lang".to_string(), "ja".to_string()),
    ];

    match forward(&state.http, &target, &query).await {
        Ok(relayed) => (
            relayed.status,
            [(header::CONTENT_TYPE, "application/json")],
            relayed.body,
        )
            .into_response(),
        Err(e) => {
            warn!("Audio search proxy failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// Scraped track listing with a static fallback on upstream failure
async fn list_scraped_tracks(State(state): State<ServerState>) -> Response {
    let target = ForwardTarget::new(state.config.scrape_page_url.clone())
        .with_header("User-Agent", "Mozilla/5.0");
    let tracks = match forward(&state.http, &target, &[]).await {
        Ok(relayed) if relayed.status.is_success() => {
            extract_or_fallback(&String::from_utf8_lossy(&relayed.body))
        }
        Ok(relayed) => {
            warn!(
                "Scrape upstream returned {}, using fallback list",
                relayed.status
            );
            scrape::fallback_tracks()
        }
        Err(e) => {
            warn!("Scrape upstream unreachable ({}), using fallback list", e);
            scrape::fallback_tracks()
        }
    };
    Json(json!({ "tracks": tracks })).into_response()
}

fn extract_or_fallback(html: &str) -> Vec<AudioTrack> {
    let tracks = scrape::extract_tracks(html);
    if tracks.is_empty() {
        warn!("Scrape matched no preview URLs, using fallback list");
        scrape::fallback_tracks()
    } else {
        tracks
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    use super::*;

    fn test_state(api_key: Option<&str>) -> ServerState {
        ServerState::new(ProxyConfig {
            search_upstream: "http://127.0.0.1:9/api/audio/".to_string(),
            search_api_key: api_key.map(String::from),
            scrape_page_url: "http://127.0.0.1:9/free-stock-music/".to_string(),
        })
    }

    #[tokio::test]
    async fn test_search_without_credential_is_500_with_error_body() {
        let app = router(test_state(None));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/audio/search?q=lofi")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json.get("error").is_some());
    }

    #[tokio::test]
    async fn test_search_upstream_unreachable_is_500_with_error_body() {
        // Credential present, but nothing listens on the upstream port.
        let app = router(test_state(Some("test-key")));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/audio/search")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json.get("error").is_some());
    }

    #[tokio::test]
    async fn test_scrape_listing_falls_back_when_unreachable() {
        let app = router(test_state(None));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/audio/tracks")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let tracks = json.get("tracks").and_then(|t| t.as_array()).unwrap();
        assert!(!tracks.is_empty());
    }

    #[test]
    fn test_scraped_track_shape() {
        let track = AudioTrack::scraped(0, "https://example.test/a.mp3".to_string());
        let value = serde_json::to_value(&track).unwrap();
        assert_eq!(value["id"], 0);
        assert_eq!(value["name"], "Mixkit Track 1");
        // Absent metadata is omitted, not serialized as null.
        assert!(value.get("duration").is_none());
        assert!(value.get("tags").is_none());
    }
}
