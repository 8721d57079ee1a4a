//! ==============================================================================
//! web.rs - dashboard web server
//! ==============================================================================
//!
//! purpose:
//!     serves what the binder last rendered.
//!
//! routes:
//!     GET  /             html page: status (coloured), distance, timestamp, mode
//!     GET  /api          json snapshot of the display state
//!     POST /api/publish  {status?, distance_cm, seated?} -> publisher
//!
//! the page refreshes itself every `refresh_seconds`; the binder keeps the
//! shared display current in between, so a reload always shows the latest value.
//!
//! relationships:
//!     - reads: display.rs (SharedDisplay)
//!     - calls: publisher.rs, posture.rs (when no status is given)
//!
//! ==============================================================================

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, Json},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use crate::config::AppConfig;
use crate::display::{SharedDisplay, Snapshot};
use crate::posture::{self, Thresholds};
use crate::publisher::Publisher;
use crate::store::Backend;

#[derive(Clone)]
pub struct WebState {
    pub display: SharedDisplay,
    /// None when publishing from the dashboard is disabled
    pub publisher: Option<Publisher<Backend>>,
    pub thresholds: Thresholds,
    pub refresh_seconds: u64,
}

impl WebState {
    /// no publisher unless publishing is switched on and the path takes appends
    pub fn new(config: &AppConfig, display: SharedDisplay, backend: Backend) -> Self {
        Self {
            display,
            publisher: config.publishing_enabled().then(|| Publisher::new(backend)),
            thresholds: config.thresholds,
            refresh_seconds: config.dashboard.refresh_seconds,
        }
    }
}

pub fn router(state: WebState) -> Router {
    Router::new()
        .route("/", get(dashboard_handler))
        .route("/api", get(api_handler))
        .route("/api/publish", post(publish_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run_server(state: WebState, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(addr = %bind, "dashboard listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn dashboard_handler(State(state): State<WebState>) -> Html<String> {
    Html(render_page(&state.display.snapshot(), state.refresh_seconds))
}

/// json api endpoint for programmatic access
async fn api_handler(State(state): State<WebState>) -> Json<Snapshot> {
    Json(state.display.snapshot())
}

#[derive(Deserialize)]
struct PublishRequest {
    status: Option<String>,
    distance_cm: f64,
    #[serde(default = "seated_default")]
    seated: bool,
}

fn seated_default() -> bool {
    true
}

/// publish endpoint
/// POST /api/publish {"distance_cm": 42} or {"status": "...", "distance_cm": 42}
async fn publish_handler(
    State(state): State<WebState>,
    Json(req): Json<PublishRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let Some(publisher) = state.publisher else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({"status": "error", "message": "publishing disabled"})),
        );
    };

    let (status, distance_cm) = match req.status {
        Some(status) => (status, req.distance_cm),
        None => match posture::classify(req.distance_cm, req.seated, &state.thresholds) {
            Some(c) => (c.status.to_string(), c.distance_cm),
            None => {
                return (
                    StatusCode::OK,
                    Json(serde_json::json!({"status": "skipped", "distance_cm": req.distance_cm})),
                );
            }
        },
    };

    // fire-and-forget: the handle is dropped, the write carries on
    drop(publisher.publish(status.clone(), distance_cm));

    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({"status": "accepted", "record": {"status": status, "distance_cm": distance_cm}})),
    )
}

// ==============================================================================
// html
// ==============================================================================

fn render_page(snapshot: &Snapshot, refresh_seconds: u64) -> String {
    let d = &snapshot.display;
    let mode_row = if snapshot.show_mode {
        format!(
            r#"<div class="row"><span class="label">Mode</span><span id="mode">{}</span></div>"#,
            html_escape(&d.mode)
        )
    } else {
        String::new()
    };

    format!(
        r#"<!doctype html>
<html>
<head>
    <meta charset="utf-8">
    <meta http-equiv="refresh" content="{refresh}">
    <title>BackBeacon Dashboard</title>
    <style>
        body {{ font-family: system-ui; padding: 2rem; background: #1a1a2e; color: #eee; }}
        .card {{ background: #16213e; padding: 1.5rem; border-radius: 8px; max-width: 28rem; }}
        .row {{ display: flex; justify-content: space-between; padding: 0.4rem 0; }}
        .label {{ color: #888; }}
        #status {{ font-size: 1.6rem; font-weight: bold; }}
    </style>
</head>
<body>
    <h1>BackBeacon</h1>
    <div class="card">
        <div id="status" style="color: {color};">{status}</div>
        <div class="row"><span class="label">Distance</span><span id="distance">{distance}</span></div>
        <div class="row"><span class="label">Last update</span><span id="timestamp">{timestamp}</span></div>
        {mode_row}
    </div>
</body>
</html>"#,
        refresh = refresh_seconds.max(1),
        color = d.status_color.css(),
        status = html_escape(&d.status),
        distance = html_escape(&d.distance),
        timestamp = html_escape(&d.timestamp),
        mode_row = mode_row,
    )
}

/// escape html special characters to prevent xss
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
