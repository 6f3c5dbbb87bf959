use async_trait::async_trait;
use bedwatch::config::Config;
use bedwatch::error::BedwatchError;
use bedwatch::feed::FeedPublisher;
use bedwatch::hass::{EntityState, SensorSource};
use bedwatch::tracker::StatusTracker;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

struct Inner {
    states: StdMutex<HashMap<String, String>>,
    reads: AtomicUsize,
    fail: AtomicBool,
}

#[derive(Clone)]
struct FakeSensors {
    inner: Arc<Inner>,
}

impl FakeSensors {
    fn new(occupancy: &str, lazy_hours: &str, phone: &str) -> Self {
        let mut states = HashMap::new();
        states.insert("binary_sensor.bed_occupancy".to_string(), occupancy.to_string());
        states.insert("sensor.lazy_counter".to_string(), lazy_hours.to_string());
        states.insert("binary_sensor.phone_interactive".to_string(), phone.to_string());
        Self {
            inner: Arc::new(Inner {
                states: StdMutex::new(states),
                reads: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
            }),
        }
    }

    fn set(&self, entity_id: &str, state: &str) {
        self.inner
            .states
            .lock()
            .unwrap()
            .insert(entity_id.to_string(), state.to_string());
    }

    fn set_failing(&self, failing: bool) {
        self.inner.fail.store(failing, Ordering::SeqCst);
    }

    fn reads(&self) -> usize {
        self.inner.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SensorSource for FakeSensors {
    async fn entity_state(&self, entity_id: &str) -> bedwatch::Result<EntityState> {
        if self.inner.fail.load(Ordering::SeqCst) {
            return Err(BedwatchError::sensor(
                entity_id.to_string(),
                "connection refused".to_string(),
            ));
        }
        self.inner.reads.fetch_add(1, Ordering::SeqCst);
        let state = self
            .inner
            .states
            .lock()
            .unwrap()
            .get(entity_id)
            .cloned()
            .unwrap_or_else(|| "unknown".to_string());
        Ok(EntityState {
            entity_id: entity_id.to_string(),
            state,
            last_changed: None,
        })
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

fn entry_count(config: &Config) -> usize {
    FeedPublisher::new(&config.feed)
        .load_or_init()
        .unwrap()
        .entries
        .len()
}

#[tokio::test]
async fn cache_hit_performs_single_sensor_batch() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let sensors = FakeSensors::new("on", "1.0", "on");
    let mut tracker = StatusTracker::new(config, Box::new(sensors.clone())).unwrap();

    let first = tracker.current(false).await.unwrap();
    assert_eq!(sensors.reads(), 3);

    // Second call within the freshness window is a pure cache hit
    let second = tracker.current(false).await.unwrap();
    assert_eq!(sensors.reads(), 3);
    assert_eq!(first.flags(), second.flags());
    assert_eq!(first.observed_at, second.observed_at);
}

#[tokio::test]
async fn forced_refresh_rereads_without_duplicate_entry() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let sensors = FakeSensors::new("on", "1.0", "on");
    let mut tracker = StatusTracker::new(config.clone(), Box::new(sensors.clone())).unwrap();

    tracker.current(false).await.unwrap();
    assert_eq!(entry_count(&config), 1);

    // Same flags on a forced refresh: a new sensor batch, no new entry
    tracker.current(true).await.unwrap();
    assert_eq!(sensors.reads(), 6);
    assert_eq!(entry_count(&config), 1);
}

#[tokio::test]
async fn change_gating_appends_exactly_one_entry_per_transition() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let sensors = FakeSensors::new("on", "2.5", "on");
    let mut tracker = StatusTracker::new(config.clone(), Box::new(sensors.clone())).unwrap();

    tracker.current(false).await.unwrap();
    assert_eq!(entry_count(&config), 1);

    sensors.set("binary_sensor.bed_occupancy", "off");
    tracker.current(true).await.unwrap();
    assert_eq!(entry_count(&config), 2);

    tracker.current(true).await.unwrap();
    assert_eq!(entry_count(&config), 2);

    sensors.set("binary_sensor.bed_occupancy", "on");
    tracker.current(true).await.unwrap();
    assert_eq!(entry_count(&config), 3);
}

#[tokio::test]
async fn sensor_failure_propagates_and_emits_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let sensors = FakeSensors::new("on", "1.0", "on");
    sensors.set_failing(true);
    let mut tracker = StatusTracker::new(config.clone(), Box::new(sensors.clone())).unwrap();

    let err = tracker.current(false).await.unwrap_err();
    assert!(err.is_sensor_unavailable());
    assert_eq!(entry_count(&config), 0);
}

#[tokio::test]
async fn fresh_snapshot_survives_backend_outage_until_forced() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let sensors = FakeSensors::new("on", "1.0", "on");
    let mut tracker = StatusTracker::new(config, Box::new(sensors.clone())).unwrap();

    tracker.current(false).await.unwrap();

    // Backend goes away: cached snapshot still served inside the window,
    // but a forced recomputation re-raises the error
    sensors.set_failing(true);
    assert!(tracker.current(false).await.is_ok());
    let err = tracker.current(true).await.unwrap_err();
    assert!(err.is_sensor_unavailable());
}

#[tokio::test]
async fn failed_feed_write_aborts_commit_and_reattempts_entry() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());

    // A plain file where the store's parent directory should be makes
    // every feed write fail until it is removed
    let blocker = dir.path().join("blocked");
    std::fs::write(&blocker, "").unwrap();
    config.feed.store_path = blocker.join("feed_store.json").display().to_string();

    let sensors = FakeSensors::new("on", "1.0", "on");
    let mut tracker = StatusTracker::new(config.clone(), Box::new(sensors.clone())).unwrap();

    let err = tracker.current(false).await.unwrap_err();
    assert!(matches!(err, BedwatchError::Feed { .. }));

    // The flags did not commit: once the store becomes writable, the same
    // transition is re-attempted and exactly one entry lands
    std::fs::remove_file(&blocker).unwrap();
    tracker.current(true).await.unwrap();
    assert_eq!(entry_count(&config), 1);

    // And the commit stuck: no duplicate on the next refresh
    tracker.current(true).await.unwrap();
    assert_eq!(entry_count(&config), 1);
}

#[tokio::test]
async fn unknown_occupancy_reading_yields_unknown_state() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let sensors = FakeSensors::new("unavailable", "0.0", "off");
    let mut tracker = StatusTracker::new(config, Box::new(sensors)).unwrap();

    let snap = tracker.current(false).await.unwrap();
    assert_eq!(snap.occupancy, bedwatch::status::Occupancy::Unknown);
    assert!(!snap.sleeping);
}
