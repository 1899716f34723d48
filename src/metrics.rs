use prometheus::{Encoder, Gauge, GaugeVec, TextEncoder};
use tigo_cloud_rs::sensor::{self, Property, Sensor};
use tigo_cloud_rs::PollingCoordinator;

lazy_static! {
    static ref PANEL_READING_GAUGE: GaugeVec = register_gauge_vec!(
        opts!(
            "tigo_panel_reading",
            "latest per-panel reading reported by the Tigo portal",
        ),
        &["panel_id", "panel_name", "property", "unit", "device_class", "state_class"],
    )
    .unwrap();
    static ref SUMMARY_READING_GAUGE: GaugeVec = register_gauge_vec!(
        opts!(
            "tigo_summary_reading",
            "latest site-wide production reported by the Tigo portal",
        ),
        &["property", "unit", "device_class", "state_class"],
    )
    .unwrap();
    static ref LAST_UPDATE_SUCCESS_GAUGE: Gauge = register_gauge!(opts!(
        "tigo_last_update_success",
        "1 if the last fetch cycle succeeded, 0 otherwise",
    ))
    .unwrap();
    static ref LAST_UPDATE_TIMESTAMP_GAUGE: Gauge = register_gauge!(opts!(
        "tigo_last_update_timestamp_seconds",
        "time of the last successful fetch cycle",
    ))
    .unwrap();
}

fn unit(property: &Property) -> &'static str {
    property.unit.unwrap_or("")
}

fn device_class(property: &Property) -> &'static str {
    property.device_class.map(|c| c.as_str()).unwrap_or("")
}

/// Set `gauge` to the sensor value, or drop the label set when there is none.
fn publish_sensor(gauge: &GaugeVec, labels: &[&str], value: Option<f64>) {
    match value {
        Some(value) => gauge.with_label_values(labels).set(value),
        None => {
            let _ = gauge.remove_label_values(labels);
        }
    }
}

/// Copy the coordinator readings into the Prometheus registry.
pub fn publish(coordinator: &PollingCoordinator) {
    LAST_UPDATE_SUCCESS_GAUGE.set(if coordinator.last_update_success() {
        1.0
    } else {
        0.0
    });
    if let Some(last_update) = coordinator.last_update() {
        LAST_UPDATE_TIMESTAMP_GAUGE.set(last_update.timestamp() as f64);
    }

    match sensor::panel_sensors(coordinator) {
        Ok(sensors) => {
            for sensor in sensors {
                let property = sensor.property();
                publish_sensor(
                    &PANEL_READING_GAUGE,
                    &[
                        sensor.panel.id.as_str(),
                        sensor.panel.name.as_str(),
                        property.key,
                        unit(property),
                        device_class(property),
                        property.state_class.as_str(),
                    ],
                    sensor.value(coordinator),
                );
            }
        }
        Err(e) => log::warn!("No panel readings published: {}", e),
    }

    for sensor in sensor::summary_sensors() {
        let property = sensor.property();
        publish_sensor(
            &SUMMARY_READING_GAUGE,
            &[
                property.key,
                unit(property),
                device_class(property),
                property.state_class.as_str(),
            ],
            sensor.value(coordinator),
        );
    }
}

/// Read metrics from Prometheus exporter registry.
pub fn read() -> Result<String, tigo_cloud_rs::Error> {
    // Gather the metrics.
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    encoder
        .encode(&metric_families, &mut buffer)
        .or(Err(tigo_cloud_rs::Error::FormatError))?;
    String::from_utf8(buffer).or(Err(tigo_cloud_rs::Error::FormatError))
}
