pub mod aggregate;
pub mod aggregate_energy;
pub mod last_value;
pub mod object_type;
pub mod system_config;

use serde_json::{Map, Value};
use std::collections::HashMap;

/// Keep the numeric entries (numbers or numeric strings) of a `dataset` map, keyed by panel id.
pub fn numeric_dataset(dataset: &Map<String, Value>) -> HashMap<String, f64> {
    dataset
        .iter()
        .filter_map(|(panel_id, value)| number(value).map(|v| (panel_id.to_owned(), v)))
        .collect()
}

/// The portal sends most readings as JSON numbers, some as numeric strings.
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        _ => value.as_f64(),
    }
}
