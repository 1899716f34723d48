use serde::Deserialize;
use serde_json::Value;

const SOLAR_TOTAL: &str = "solar_total";

#[derive(Debug, Clone, Deserialize)]
pub struct Series {
    pub id: String,
    #[serde(default)]
    pub data: Vec<Vec<Value>>,
}

/* /api/v4/data/aggregate?output=echart: chart series of `[x, y]` points */
#[derive(Debug, Clone, Deserialize)]
pub struct EchartAggregate {
    pub series: Vec<Series>,
}

impl EchartAggregate {
    /// Last non-null `y` of the `solar_total` series, 0 when there is none.
    pub fn solar_total(&self) -> f64 {
        self.series
            .iter()
            .find(|series| series.id == SOLAR_TOTAL)
            .and_then(|series| {
                series
                    .data
                    .iter()
                    .filter_map(|point| point.get(1).and_then(Value::as_f64))
                    .last()
            })
            .unwrap_or(0.0)
    }
}
