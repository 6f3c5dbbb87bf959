//! Axum-based HTTP server for the status page and JSON API

use crate::duration_fmt::format_duration_or_sentinel;
use crate::status::{Occupancy, StatusSnapshot, round_to_minute, status_label};
use crate::tracker::SharedTracker;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, get_service},
};
use std::net::{IpAddr, SocketAddr};
use tower_http::services::ServeDir;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub tracker: SharedTracker,
}

fn occupancy_json(occupancy: Occupancy) -> serde_json::Value {
    match occupancy {
        Occupancy::InBed => serde_json::json!(true),
        Occupancy::OutOfBed => serde_json::json!(false),
        Occupancy::Unknown => serde_json::Value::Null,
    }
}

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title}</title>\n</head>\n<body>\n{body}\n</body>\n</html>\n"
    ))
}

fn status_page(snapshot: &StatusSnapshot) -> Html<String> {
    let last_updated = round_to_minute(snapshot.observed_at)
        .format("%Y-%m-%d %H:%M UTC")
        .to_string();
    let in_bed = match snapshot.occupancy {
        Occupancy::InBed => "yes",
        Occupancy::OutOfBed => "no",
        Occupancy::Unknown => "unknown",
    };
    let body = format!(
        "<h1>Currently {}</h1>\n\
         <p>In bed: {}</p>\n\
         <p>Time in bed: {}</p>\n\
         <p>Sleeping: {}</p>\n\
         <p>Last updated: {}</p>\n\
         <p><a href=\"/about\">About</a> &middot; <a href=\"/static/feed.xml\">Feed</a></p>",
        status_label(snapshot),
        in_bed,
        format_duration_or_sentinel(snapshot.time_in_bed),
        if snapshot.sleeping { "yes" } else { "no" },
        last_updated,
    );
    page("Bedwatch", &body)
}

fn error_page(status: StatusCode) -> (StatusCode, Html<String>) {
    let body = format!(
        "<h1>{}</h1>\n<p>{}</p>\n<p><a href=\"/\">Back</a></p>",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Error"),
    );
    (status, page("Bedwatch - error", &body))
}

async fn index(State(state): State<AppState>) -> axum::response::Response {
    let mut tracker = state.tracker.lock().await;
    match tracker.current(false).await {
        Ok(snapshot) => status_page(&snapshot).into_response(),
        Err(e) => {
            let logger = crate::logging::get_logger("web");
            logger.error(&format!("Status render failed: {}", e));
            error_page(StatusCode::INTERNAL_SERVER_ERROR).into_response()
        }
    }
}

async fn about() -> Html<String> {
    page(
        "Bedwatch - about",
        "<h1>About</h1>\n\
         <p>This page derives a bed-occupancy status from a few Home Assistant \
         sensors and publishes every status change to an RSS feed.</p>\n\
         <p><a href=\"/\">Back</a></p>",
    )
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn api_status(State(state): State<AppState>) -> axum::response::Response {
    let mut tracker = state.tracker.lock().await;
    match tracker.current(false).await {
        Ok(snapshot) => Json(serde_json::json!({
            "occupancy": occupancy_json(snapshot.occupancy),
            "sleeping": snapshot.sleeping,
            "time_in_bed": format_duration_or_sentinel(snapshot.time_in_bed),
            "time_in_bed_minutes": snapshot.time_in_bed.num_minutes(),
            "observed_at": snapshot.observed_at.to_rfc3339(),
        }))
        .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": e.to_string()})),
        )
            .into_response(),
    }
}

async fn not_found() -> (StatusCode, Html<String>) {
    error_page(StatusCode::NOT_FOUND)
}

pub fn build_router(state: AppState, public_dir: &str) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/about", get(about))
        .route("/api/health", get(health))
        .route("/api/status", get(api_status))
        .nest_service("/static", get_service(ServeDir::new(public_dir)))
        .fallback(not_found)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(tracker: SharedTracker, host: &str, port: u16) -> anyhow::Result<()> {
    let public_dir = {
        let t = tracker.lock().await;
        t.config().feed.public_dir.clone()
    };
    let state = AppState { tracker };
    let router = build_router(state, &public_dir);

    let logger = crate::logging::get_logger("web");
    logger.info(&format!(
        "Starting web server; requested host={}, port={}",
        host, port
    ));

    let (addr, parsed_ok): (SocketAddr, bool) = match host.parse::<IpAddr>() {
        Ok(ip) => (SocketAddr::new(ip, port), true),
        Err(_) => (([127, 0, 0, 1], port).into(), false),
    };
    if !parsed_ok {
        logger.warn(&format!("Invalid host '{}'; falling back to 127.0.0.1", host));
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    logger.info(&format!(
        "Web server listening at http://{}:{}",
        local_addr.ip(),
        local_addr.port()
    ));

    axum::serve(listener, router).await?;
    Ok(())
}
