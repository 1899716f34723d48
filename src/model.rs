use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use std::collections::HashMap;
use std::time::Duration;

pub type PanelId = String;
pub type MetricName = String;

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub system_id: String,
}

/// Authenticated portal session, built from the `wssJwt` cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Session cookie as returned by the login form POST.
#[derive(Debug, Clone)]
pub struct SessionCookie {
    pub value: String,
    pub max_age: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthHeader {
    pub token: String,
}

impl AuthHeader {
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.token)
    }

    pub fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header(http::header::ACCEPT, "application/json")
            .header(http::header::AUTHORIZATION, self.authorization())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    pub id: PanelId,
    pub name: String,
    /// Stable portal token (`T`), used for sensor identity.
    pub token: String,
    /// Every key of the underlying system object, for diagnostics.
    pub attributes: serde_json::Map<String, Value>,
}

pub use crate::api::response::system_config::SystemDescription;

/// Latest readings, per metric and per panel, plus the site-wide summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReadingStore {
    pub energy_raw: Option<Value>,
    metrics: HashMap<MetricName, HashMap<PanelId, f64>>,
    summary: HashMap<MetricName, f64>,
}

impl ReadingStore {
    /// Replace the whole slot of `metric`, dropping panels absent from `readings`.
    pub fn replace_metric(&mut self, metric: &str, readings: HashMap<PanelId, f64>) {
        self.metrics.insert(metric.to_owned(), readings);
    }

    pub fn metric(&self, metric: &str) -> Option<&HashMap<PanelId, f64>> {
        self.metrics.get(metric)
    }

    pub fn reading(&self, panel_id: &str, metric: &str) -> Option<f64> {
        self.metrics
            .get(metric)
            .and_then(|readings| readings.get(panel_id))
            .copied()
    }

    pub fn set_summary(&mut self, metric: &str, value: f64) {
        self.summary.insert(metric.to_owned(), value);
    }

    pub fn summary(&self, metric: &str) -> Option<f64> {
        self.summary.get(metric).copied()
    }
}
