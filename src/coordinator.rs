use crate::api::Error;
use crate::model::{Panel, ReadingStore};
use crate::telemetry::TelemetryClient;
use chrono::{DateTime, Utc};

use std::time::Duration;

/// Time between updates while someone is consuming the readings.
pub const SCAN_INTERVAL: Duration = Duration::from_secs(60);

/// Runs fetch cycles on behalf of the host scheduler and exposes the readings.
pub struct PollingCoordinator {
    telemetry: TelemetryClient,
    update_interval: Duration,
    last_update_success: bool,
    last_update: Option<DateTime<Utc>>,
}

impl PollingCoordinator {
    pub fn new(telemetry: TelemetryClient, update_interval: Duration) -> Self {
        PollingCoordinator {
            telemetry,
            update_interval,
            last_update_success: true,
            last_update: None,
        }
    }

    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    /// Run one fetch cycle. Failures are logged and recorded, consumers keep
    /// seeing the last good readings.
    pub async fn refresh(&mut self) -> Result<(), Error> {
        let result = self.telemetry.fetch_cycle().await;
        self.record(&result);
        result
    }

    fn record(&mut self, result: &Result<(), Error>) {
        match result {
            Ok(()) => {
                if !self.last_update_success {
                    log::info!("Fetching tigo data recovered");
                }
                self.last_update_success = true;
                self.last_update = Some(Utc::now());
            }
            Err(e) => {
                log::error!("Error fetching tigo data: {}", e);
                self.last_update_success = false;
            }
        }
    }

    pub fn last_update_success(&self) -> bool {
        self.last_update_success
    }

    /// Time of the last successful update.
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    /// Wait for the system description, logging in if needed.
    pub async fn ensure_system_description(&mut self) -> Result<(), Error> {
        self.telemetry
            .session_mut()
            .get_system_description_async()
            .await
            .map(|_| ())
    }

    pub fn get_panels(&self) -> Result<Vec<Panel>, Error> {
        self.telemetry.get_panels()
    }

    pub fn get_reading(&self, panel_id: &str, metric: &str) -> Option<f64> {
        self.telemetry.get_reading(panel_id, metric)
    }

    pub fn get_summary(&self, metric: &str) -> Option<f64> {
        self.telemetry.get_summary(metric)
    }

    pub fn get_data(&self) -> &ReadingStore {
        self.telemetry.get_data()
    }
}
