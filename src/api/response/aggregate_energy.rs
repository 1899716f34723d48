use serde::Deserialize;
use serde_json::{Map, Value};

/* /api/v4/system/summary/aggenergy */
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateEnergy {
    pub dataset: Map<String, Value>,
    #[serde(default)]
    pub dataset_last_data: Map<String, Value>,
}

impl AggregateEnergy {
    pub fn from_raw(raw: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(raw)
    }

    /// `HH:MM` of the last sample, taken from any entry of `datasetLastData`
    /// (`2024-01-01T10:15:00Z` -> `10:15`).
    pub fn fingerprint(&self) -> Option<String> {
        self.dataset_last_data
            .values()
            .next()
            .and_then(Value::as_str)
            .and_then(|timestamp| timestamp.get(11..16))
            .map(String::from)
    }
}
