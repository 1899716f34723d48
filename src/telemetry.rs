use crate::api::response::aggregate_energy::AggregateEnergy;
use crate::api::response::numeric_dataset;
use crate::api::{self, Error};
use crate::model::{AuthHeader, Panel, ReadingStore};
use crate::session::SessionCache;
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use reqwest::Client;

/// Slot of the per-panel energy taken from the aggregate energy document.
pub const ENERGY: &str = "energy";

/// Metrics fetched through the "last value" resource.
pub const LAST_VALUE_METRICS: [&str; 8] = [
    "pin",
    "rssi",
    "pwm",
    "temp",
    "vin",
    "vout",
    "iin",
    "reclaimedPower",
];

pub const SUMMARY_AGGREGATES: [&str; 6] = ["now", "minute", "hour", "day", "month", "year"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Authenticating,
    FetchingAggregate,
    FetchingMetrics,
    Done,
}

/// Fetches telemetry with the session of a `SessionCache` and keeps the latest
/// values in a `ReadingStore`.
pub struct TelemetryClient {
    session: SessionCache,
    timezone: Tz,
    fingerprint: Option<String>,
    store: ReadingStore,
    state: CycleState,
}

impl TelemetryClient {
    pub fn new(session: SessionCache, timezone: Tz) -> Self {
        TelemetryClient {
            session,
            timezone,
            fingerprint: None,
            store: ReadingStore::default(),
            state: CycleState::Idle,
        }
    }

    pub fn session(&self) -> &SessionCache {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionCache {
        &mut self.session
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    /// Calendar date in the portal's reference timezone.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }

    /// One refresh of the reading store for today.
    pub async fn fetch_cycle(&mut self) -> Result<(), Error> {
        let date = self.today();
        self.fetch_cycle_on(date).await
    }

    /// One refresh for `date`. On error the store keeps its previous content.
    pub async fn fetch_cycle_on(&mut self, date: NaiveDate) -> Result<(), Error> {
        let result = self.run_cycle(date).await;
        if result.is_err() {
            self.transition(CycleState::Idle);
        }
        result
    }

    fn transition(&mut self, state: CycleState) {
        log::trace!("fetch cycle: {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    async fn run_cycle(&mut self, date: NaiveDate) -> Result<(), Error> {
        self.transition(CycleState::Authenticating);
        let auth = self.session.get_auth_header().await?;
        let client = self.session.client()?;

        self.transition(CycleState::FetchingAggregate);
        let (raw, aggregate) = match self.fetch_aggregate(&client, &auth, date).await {
            Ok(aggregate) => aggregate,
            Err(e) => {
                self.session.invalidate();
                return Err(e);
            }
        };

        self.store
            .replace_metric(ENERGY, numeric_dataset(&aggregate.dataset));
        self.store.energy_raw = Some(raw);

        match aggregate.fingerprint() {
            Some(fingerprint) if self.fingerprint.as_deref() != Some(fingerprint.as_str()) => {
                self.transition(CycleState::FetchingMetrics);
                self.fingerprint = Some(fingerprint.clone());
                self.fetch_last_values(&client, &auth, date, &fingerprint)
                    .await;
            }
            Some(fingerprint) => {
                log::debug!("No new samples since {}, skipping last values", fingerprint)
            }
            None => log::debug!("No last sample time in aggregate energy, skipping last values"),
        }

        self.fetch_summary(&client, &auth, date).await;

        self.transition(CycleState::Done);
        Ok(())
    }

    async fn fetch_aggregate(
        &self,
        client: &Client,
        auth: &AuthHeader,
        date: NaiveDate,
    ) -> Result<(serde_json::Value, AggregateEnergy), Error> {
        let raw = api::aggregate_energy(
            client,
            self.session.api_url(),
            auth,
            self.session.system_id(),
            date,
        )
        .await?;

        match AggregateEnergy::from_raw(&raw) {
            Ok(aggregate) => Ok((raw, aggregate)),
            Err(e) => Err(Error::InvalidResponse(raw.to_string(), e.to_string())),
        }
    }

    /// Each metric is independent; a failed one keeps its previous readings.
    async fn fetch_last_values(
        &mut self,
        client: &Client,
        auth: &AuthHeader,
        date: NaiveDate,
        fingerprint: &str,
    ) {
        for metric in LAST_VALUE_METRICS {
            let result = api::last_value(
                client,
                self.session.api_url(),
                auth,
                self.session.system_id(),
                date,
                metric,
                fingerprint,
            )
            .await;

            match result {
                Ok(last_value) => self
                    .store
                    .replace_metric(metric, numeric_dataset(&last_value.dataset)),
                Err(e) => log::warn!(
                    "{}",
                    Error::MetricFetchError(metric.to_owned(), e.to_string())
                ),
            }
        }
    }

    async fn fetch_summary(&mut self, client: &Client, auth: &AuthHeader, date: NaiveDate) {
        for agg in SUMMARY_AGGREGATES {
            let result = api::aggregate_summary(
                client,
                self.session.api_url(),
                auth,
                self.session.system_id(),
                date,
                agg,
            )
            .await;

            match result {
                Ok(aggregate) => self.store.set_summary(agg, aggregate.solar_total()),
                Err(e) => log::warn!(
                    "{}",
                    Error::MetricFetchError(format!("summary {}", agg), e.to_string())
                ),
            }
        }
    }

    pub fn get_reading(&self, panel_id: &str, metric: &str) -> Option<f64> {
        self.store.reading(panel_id, metric)
    }

    pub fn get_summary(&self, metric: &str) -> Option<f64> {
        self.store.summary(metric)
    }

    pub fn get_panels(&self) -> Result<Vec<Panel>, Error> {
        self.session
            .get_system_description()
            .map(|system| system.panels())
            .ok_or(Error::NotReadyError)
    }

    pub fn get_data(&self) -> &ReadingStore {
        &self.store
    }
}
