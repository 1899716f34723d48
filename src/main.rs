#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate prometheus;
#[macro_use]
extern crate rocket;

use chrono_tz::Tz;
use config::Config;
use rocket::{Build, Rocket, State};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tigo_cloud_rs::model::Credentials;
use tigo_cloud_rs::sensor;
use tigo_cloud_rs::{Error, PollingCoordinator, SessionCache, TelemetryClient};

mod metrics;

const API_URL: &str = "https://ei.tigoenergy.com";

#[derive(Clone, serde::Deserialize)]
pub struct TigoConfig {
    api_url: String,
    username: String,
    password: String,
    system_id: String,
    interval: u64,
    timezone: String,
    request_timeout: u64,
}

/// Structure containing state for API handlers.
pub struct StateData {
    coordinator: tokio::sync::Mutex<PollingCoordinator>,
    interval: u64,
    /// Timestamp of last refresh via `PollingCoordinator::refresh()`
    timestamp: Mutex<Option<Instant>>,
}

impl StateData {
    /// Updates `timestamp` to `now()`.
    fn touch(&self) {
        if let Ok(mut ts) = self.timestamp.lock() {
            *ts = Some(Instant::now());
        } else {
            log::trace!("Unable to lock timestamp mutex, will refresh again")
        }
    }

    /// Checks whether `interval_seconds` elapsed since last `touch()`
    fn interval_elapsed(&self, interval_secs: u64) -> bool {
        let elapsed_opt = self
            .timestamp
            .lock()
            .ok()
            .and_then(|a| a.map(|b| b.elapsed().as_secs()));

        if let Some(elapsed) = elapsed_opt {
            elapsed >= interval_secs
        } else {
            /* If there is None timestamp/elapsed, always return true to trigger action */
            true
        }
    }
}

pub fn read_settings() -> Result<TigoConfig, config::ConfigError> {
    let mut settings = Config::default();
    settings
        .merge(config::Environment::with_prefix("TIGO"))?
        .set_default("api_url", API_URL)?
        .set_default("interval", 60)?
        .set_default("timezone", "UTC")?
        .set_default("request_timeout", 30)?;

    settings.try_into()
}

fn coordinator(settings: TigoConfig) -> Result<PollingCoordinator, String> {
    let timezone = settings
        .timezone
        .parse::<Tz>()
        .map_err(|e| format!("Invalid timezone {}: {}", settings.timezone, e))?;

    let credentials = Credentials {
        username: settings.username,
        password: settings.password,
        system_id: settings.system_id,
    };
    let session = SessionCache::new(
        &settings.api_url,
        credentials,
        Duration::from_secs(settings.request_timeout),
    );

    Ok(PollingCoordinator::new(
        TelemetryClient::new(session, timezone),
        Duration::from_secs(settings.interval),
    ))
}

/// Scrapes drive the polling: no scrapes, no portal traffic.
#[get("/metrics")]
async fn metrics_route(state: &State<StateData>) -> Result<String, Error> {
    let mut coordinator = state.coordinator.lock().await;
    if state.interval_elapsed(state.interval) {
        /* failures are recorded by the coordinator, last known readings are still served */
        let _ = coordinator.refresh().await;
        state.touch();
    } else {
        log::info!("interval time not yet elapsed since last run; returning cached result")
    }
    metrics::publish(&coordinator);
    metrics::read()
}

#[get("/panels")]
async fn panels_route(state: &State<StateData>) -> Result<String, Error> {
    let mut coordinator = state.coordinator.lock().await;
    coordinator.ensure_system_description().await?;
    let panels = coordinator.get_panels()?;

    serde_json::to_string_pretty(&panels).or(Err(Error::FormatError))
}

#[get("/readings")]
async fn readings_route(state: &State<StateData>) -> Result<String, Error> {
    let coordinator = state.coordinator.lock().await;
    serde_json::to_string_pretty(coordinator.get_data()).or(Err(Error::FormatError))
}

#[get("/sensors")]
async fn sensors_route(state: &State<StateData>) -> Result<String, Error> {
    let mut coordinator = state.coordinator.lock().await;
    coordinator.ensure_system_description().await?;
    let sensors: Vec<_> = sensor::sensors(&coordinator)?
        .iter()
        .map(|s| sensor::describe(s.as_ref(), &coordinator))
        .collect();

    serde_json::to_string_pretty(&sensors).or(Err(Error::FormatError))
}

#[launch]
fn rocket() -> Rocket<Build> {
    env_logger::init();

    let coordinator = match read_settings()
        .map_err(|e| format!("Configuration error: {}", e))
        .and_then(coordinator)
    {
        Ok(coordinator) => coordinator,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    let state = StateData {
        interval: coordinator.update_interval().as_secs(),
        coordinator: tokio::sync::Mutex::new(coordinator),
        timestamp: Mutex::new(None),
    };

    rocket::build()
        .manage(state)
        .mount("/", routes![metrics_route, panels_route, readings_route, sensors_route])
}
