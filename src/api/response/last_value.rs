use serde::Deserialize;
use serde_json::{Map, Value};

/* /api/v4/system/summary/lastvalue */
#[derive(Debug, Clone, Deserialize)]
pub struct LastValue {
    pub dataset: Map<String, Value>,
}
