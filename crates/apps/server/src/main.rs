mod feed;

use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use archive::{ArchiveStore, RefreshReport};
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use compute::normalize_week_feed;
use formats::RawEvent;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_FEED_URL: &str =
    "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary/2.5_week.geojson";

const COASTLINE_FILE: &str = "coastline.bin";

#[derive(Clone)]
pub struct AppState {
    archive: Arc<ArchiveStore>,
    data_root: PathBuf,
    feed_url: String,
    http: reqwest::Client,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let data_root = env::var("QUAKES_DATA_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./data"));
    let addr: SocketAddr = env::var("QUAKES_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:9400".to_string())
        .parse()
        .expect("invalid QUAKES_ADDR");
    let feed_url = env::var("QUAKES_FEED_URL").unwrap_or_else(|_| DEFAULT_FEED_URL.to_string());

    if let Err(err) = tokio::fs::create_dir_all(&data_root).await {
        warn!("failed to create data root: {err}");
    }

    let state = AppState {
        archive: Arc::new(ArchiveStore::new(data_root.clone())),
        data_root,
        feed_url,
        http: reqwest::Client::new(),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS]);

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/data/earthquakes.bin", get(get_points))
        .route("/data/earthquakes-stats.json", get(get_stats))
        .route("/data/earthquakes.json", get(get_events))
        .route("/data/coastline.bin", get(get_coastline))
        .route("/api/recent", get(get_recent))
        .route("/api/refresh", post(post_refresh))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("earthquake data server listening on http://{addr}");
    axum::serve(tokio::net::TcpListener::bind(addr).await.unwrap(), app)
        .await
        .unwrap();
}

async fn healthz() -> Response {
    (StatusCode::OK, "ok").into_response()
}

async fn get_points(State(state): State<AppState>) -> Response {
    serve_file(&state.archive.points_path(), "application/octet-stream").await
}

async fn get_stats(State(state): State<AppState>) -> Response {
    serve_file(&state.archive.stats_path(), "application/json").await
}

async fn get_events(State(state): State<AppState>) -> Response {
    serve_file(&state.archive.events_path(), "application/json").await
}

async fn get_coastline(State(state): State<AppState>) -> Response {
    serve_file(
        &state.data_root.join(COASTLINE_FILE),
        "application/octet-stream",
    )
    .await
}

async fn serve_file(path: &Path, content_type: &str) -> Response {
    match tokio::fs::read(path).await {
        Ok(data) => {
            let mut headers = HeaderMap::new();
            headers.insert(
                http::header::CONTENT_TYPE,
                HeaderValue::from_str(content_type)
                    .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
            );
            (StatusCode::OK, headers, Body::from(data)).into_response()
        }
        Err(err) => {
            error!("file read failed: {path:?} -> {err}");
            (StatusCode::NOT_FOUND, "not found").into_response()
        }
    }
}

/// The rolling week view, derived fresh from the live feed on every call.
async fn get_recent(State(state): State<AppState>) -> Response {
    match feed::fetch_feed_json(&state).await {
        Ok(raw) => {
            let window = normalize_week_feed(&raw);
            Json(window).into_response()
        }
        Err(err) => {
            error!("recent feed failed: {err}");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": err })),
            )
                .into_response()
        }
    }
}

/// The single mutating operation: fetch the feed, merge it into the
/// archive, rebuild the derived artifacts. Fetch failures abort before any
/// mutation, and re-running with an unchanged feed adds nothing.
async fn post_refresh(State(state): State<AppState>) -> Json<Value> {
    match run_refresh(&state).await {
        Ok(report) => Json(json!({
            "success": true,
            "added": report.added,
            "total": report.total,
        })),
        Err(err) => {
            error!("refresh failed: {err}");
            Json(json!({ "success": false, "error": err }))
        }
    }
}

async fn run_refresh(state: &AppState) -> Result<RefreshReport, String> {
    let raw = feed::fetch_feed_json(state).await?;

    let recent: Vec<RawEvent> = raw
        .get("features")
        .and_then(|v| v.as_array())
        .map(|features| {
            features
                .iter()
                .map(|f| RawEvent::from_feature(f.clone()))
                .collect()
        })
        .unwrap_or_default();

    info!(count = recent.len(), "recent feed fetched");

    state
        .archive
        .refresh(recent)
        .await
        .map_err(|e| e.to_string())
}
