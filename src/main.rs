use anyhow::Result;
use bedwatch::config::Config;
use bedwatch::hass::HassClient;
use bedwatch::tracker::StatusTracker;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, interval};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid config: {}", e))?;

    bedwatch::logging::init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Bedwatch {} starting up", env!("APP_VERSION"));

    let client = HassClient::new(&config.homeassistant)
        .map_err(|e| anyhow::anyhow!("Failed to create sensor client: {}", e))?;

    let refresh_period = Duration::from_secs(config.cache.refresh_interval_seconds);
    let (host, port) = (config.web.host.clone(), config.web.port);

    let tracker = StatusTracker::new(config, Box::new(client))
        .map_err(|e| anyhow::anyhow!("Failed to create tracker: {}", e))?;
    let tracker = Arc::new(Mutex::new(tracker));

    // Spawn web server
    let web_tracker = tracker.clone();
    let web_task = tokio::spawn(async move {
        if let Err(e) = bedwatch::web::serve(web_tracker, &host, port).await {
            error!("Web server error: {}", e);
        }
    });

    // Periodic refresh trigger; sensor failures are logged and the tick
    // skipped rather than crashing the process
    let mut tick = interval(refresh_period);
    loop {
        tick.tick().await;
        let mut t = tracker.lock().await;
        if let Err(e) = t.current(false).await {
            error!("Periodic refresh failed: {}", e);
        }
        if web_task.is_finished() {
            error!("Web server task ended, shutting down");
            break;
        }
    }

    Ok(())
}
