use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use bedwatch::config::Config;
use bedwatch::error::BedwatchError;
use bedwatch::hass::{EntityState, SensorSource};
use bedwatch::tracker::StatusTracker;
use bedwatch::web::{AppState, build_router};
use http_body_util::BodyExt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceExt;

struct StaticSensors {
    occupancy: &'static str,
    lazy_hours: &'static str,
    phone: &'static str,
}

#[async_trait]
impl SensorSource for StaticSensors {
    async fn entity_state(&self, entity_id: &str) -> bedwatch::Result<EntityState> {
        let state = match entity_id {
            "binary_sensor.bed_occupancy" => self.occupancy,
            "sensor.lazy_counter" => self.lazy_hours,
            "binary_sensor.phone_interactive" => self.phone,
            _ => "unknown",
        };
        Ok(EntityState {
            entity_id: entity_id.to_string(),
            state: state.to_string(),
            last_changed: None,
        })
    }
}

struct FailingSensors;

#[async_trait]
impl SensorSource for FailingSensors {
    async fn entity_state(&self, entity_id: &str) -> bedwatch::Result<EntityState> {
        Err(BedwatchError::sensor(
            entity_id.to_string(),
            "timed out".to_string(),
        ))
    }
}

fn test_config(dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.homeassistant.access_token = "token".to_string();
    config.feed.store_path = dir.join("feed_store.json").display().to_string();
    config.feed.xml_path = dir.join("static").join("feed.xml").display().to_string();
    config.feed.public_dir = dir.join("static").display().to_string();
    config
}

fn router_with(sensors: Box<dyn SensorSource>, dir: &std::path::Path) -> axum::Router {
    let config = test_config(dir);
    let public_dir = config.feed.public_dir.clone();
    let tracker = StatusTracker::new(config, sensors).unwrap();
    let state = AppState {
        tracker: Arc::new(Mutex::new(tracker)),
    };
    build_router(state, &public_dir)
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn health_endpoint_is_ok() {
    let dir = tempfile::tempdir().unwrap();
    let app = router_with(
        Box::new(StaticSensors {
            occupancy: "on",
            lazy_hours: "1.5",
            phone: "on",
        }),
        dir.path(),
    );

    let response = app
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn index_renders_status_page() {
    let dir = tempfile::tempdir().unwrap();
    let app = router_with(
        Box::new(StaticSensors {
            occupancy: "on",
            lazy_hours: "1.5",
            phone: "on",
        }),
        dir.path(),
    );

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_string(response).await;
    assert!(body.contains("Currently in bed"));
    assert!(body.contains("1 hour and 30 minutes"));
    assert!(body.contains("Last updated"));
}

#[tokio::test]
async fn api_status_returns_snapshot_json() {
    let dir = tempfile::tempdir().unwrap();
    let app = router_with(
        Box::new(StaticSensors {
            occupancy: "off",
            lazy_hours: "0",
            phone: "on",
        }),
        dir.path(),
    );

    let response = app
        .oneshot(Request::builder().uri("/api/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["occupancy"], serde_json::json!(false));
    assert_eq!(body["sleeping"], serde_json::json!(false));
    assert_eq!(body["time_in_bed"], serde_json::json!("0 minutes"));
}

#[tokio::test]
async fn sensor_failure_renders_error_page() {
    let dir = tempfile::tempdir().unwrap();
    let app = router_with(Box::new(FailingSensors), dir.path());

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_string(response).await;
    assert!(body.contains("500"));
}

#[tokio::test]
async fn unknown_route_renders_not_found_page() {
    let dir = tempfile::tempdir().unwrap();
    let app = router_with(
        Box::new(StaticSensors {
            occupancy: "on",
            lazy_hours: "1",
            phone: "on",
        }),
        dir.path(),
    );

    let response = app
        .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn about_page_renders() {
    let dir = tempfile::tempdir().unwrap();
    let app = router_with(
        Box::new(StaticSensors {
            occupancy: "on",
            lazy_hours: "1",
            phone: "on",
        }),
        dir.path(),
    );

    let response = app
        .oneshot(Request::builder().uri("/about").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("About"));
}
