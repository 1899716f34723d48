use crate::api::Error;
use crate::coordinator::PollingCoordinator;
use crate::model::Panel;
use serde::Serialize;

const DOMAIN: &str = "tigo_cloud";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Energy,
    Power,
    Temperature,
    Voltage,
    Current,
}

impl DeviceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::Energy => "energy",
            DeviceClass::Power => "power",
            DeviceClass::Temperature => "temperature",
            DeviceClass::Voltage => "voltage",
            DeviceClass::Current => "current",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateClass {
    Measurement,
    TotalIncreasing,
}

impl StateClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateClass::Measurement => "measurement",
            StateClass::TotalIncreasing => "total_increasing",
        }
    }
}

/// Display metadata of a reading.
#[derive(Debug)]
pub struct Property {
    pub key: &'static str,
    pub name: &'static str,
    pub unit: Option<&'static str>,
    pub device_class: Option<DeviceClass>,
    pub state_class: StateClass,
    pub icon: &'static str,
}

pub static PANEL_PROPERTIES: [Property; 9] = [
    Property {
        key: "energy",
        name: "Energy",
        unit: Some("Wh"),
        device_class: Some(DeviceClass::Energy),
        state_class: StateClass::TotalIncreasing,
        icon: "mdi:solar-power-variant-outline",
    },
    Property {
        key: "pin",
        name: "Power",
        unit: Some("W"),
        device_class: Some(DeviceClass::Power),
        state_class: StateClass::Measurement,
        icon: "mdi:solar-power",
    },
    Property {
        key: "rssi",
        name: "RSSI",
        unit: Some("dBm"),
        device_class: None,
        state_class: StateClass::Measurement,
        icon: "mdi:signal-variant",
    },
    Property {
        key: "pwm",
        name: "PWM",
        unit: None,
        device_class: None,
        state_class: StateClass::Measurement,
        icon: "mdi:square-wave",
    },
    Property {
        key: "temp",
        name: "Temperature",
        unit: Some("°C"),
        device_class: Some(DeviceClass::Temperature),
        state_class: StateClass::Measurement,
        icon: "mdi:thermometer",
    },
    Property {
        key: "vin",
        name: "Voltage In",
        unit: Some("V"),
        device_class: Some(DeviceClass::Voltage),
        state_class: StateClass::Measurement,
        icon: "mdi:alpha-v-circle-outline",
    },
    Property {
        key: "vout",
        name: "Voltage Out",
        unit: Some("V"),
        device_class: Some(DeviceClass::Voltage),
        state_class: StateClass::Measurement,
        icon: "mdi:alpha-v-circle",
    },
    Property {
        key: "iin",
        name: "Current In",
        unit: Some("A"),
        device_class: Some(DeviceClass::Current),
        state_class: StateClass::Measurement,
        icon: "mdi:alpha-a-circle-outline",
    },
    Property {
        key: "reclaimedPower",
        name: "Reclaimed Power",
        unit: Some("W"),
        device_class: Some(DeviceClass::Power),
        state_class: StateClass::Measurement,
        icon: "mdi:solar-power-variant",
    },
];

pub static SUMMARY_PROPERTIES: [Property; 6] = [
    Property {
        key: "now",
        name: "Current production",
        unit: Some("W"),
        device_class: Some(DeviceClass::Power),
        state_class: StateClass::Measurement,
        icon: "mdi:solar-power-variant",
    },
    Property {
        key: "minute",
        name: "Production last Minute",
        unit: Some("Wh"),
        device_class: Some(DeviceClass::Energy),
        state_class: StateClass::TotalIncreasing,
        icon: "mdi:solar-power-variant-outline",
    },
    Property {
        key: "hour",
        name: "Hourly Production",
        unit: Some("Wh"),
        device_class: Some(DeviceClass::Energy),
        state_class: StateClass::TotalIncreasing,
        icon: "mdi:solar-power-variant-outline",
    },
    Property {
        key: "day",
        name: "Daily Production",
        unit: Some("Wh"),
        device_class: Some(DeviceClass::Energy),
        state_class: StateClass::TotalIncreasing,
        icon: "mdi:solar-power-variant-outline",
    },
    Property {
        key: "month",
        name: "Production this Month",
        unit: Some("Wh"),
        device_class: Some(DeviceClass::Energy),
        state_class: StateClass::TotalIncreasing,
        icon: "mdi:solar-power-variant-outline",
    },
    Property {
        key: "year",
        name: "Production Year to date",
        unit: Some("Wh"),
        device_class: Some(DeviceClass::Energy),
        state_class: StateClass::TotalIncreasing,
        icon: "mdi:solar-power-variant-outline",
    },
];

/// Observable value pulled from the coordinator after each update.
pub trait Sensor {
    fn unique_id(&self) -> String;
    fn name(&self) -> String;
    fn property(&self) -> &'static Property;
    fn value(&self, coordinator: &PollingCoordinator) -> Option<f64>;
}

#[derive(Debug)]
pub struct PanelSensor {
    pub panel: Panel,
    pub property: &'static Property,
}

impl Sensor for PanelSensor {
    fn unique_id(&self) -> String {
        format!("{}.tigo.{}_{}", DOMAIN, self.panel.token, self.property.key)
    }

    fn name(&self) -> String {
        format!("{} {}", self.panel.name, self.property.name)
    }

    fn property(&self) -> &'static Property {
        self.property
    }

    fn value(&self, coordinator: &PollingCoordinator) -> Option<f64> {
        coordinator.get_reading(&self.panel.id, self.property.key)
    }
}

#[derive(Debug)]
pub struct SummarySensor {
    pub property: &'static Property,
}

impl Sensor for SummarySensor {
    fn unique_id(&self) -> String {
        format!("{}.tigo.summary.{}", DOMAIN, self.property.key)
    }

    fn name(&self) -> String {
        String::from(self.property.name)
    }

    fn property(&self) -> &'static Property {
        self.property
    }

    fn value(&self, coordinator: &PollingCoordinator) -> Option<f64> {
        coordinator.get_summary(self.property.key)
    }
}

pub fn panel_sensors(coordinator: &PollingCoordinator) -> Result<Vec<PanelSensor>, Error> {
    Ok(coordinator
        .get_panels()?
        .into_iter()
        .flat_map(|panel| {
            PANEL_PROPERTIES.iter().map(move |property| PanelSensor {
                panel: panel.clone(),
                property,
            })
        })
        .collect())
}

pub fn summary_sensors() -> Vec<SummarySensor> {
    SUMMARY_PROPERTIES
        .iter()
        .map(|property| SummarySensor { property })
        .collect()
}

/// Snapshot of a sensor as a host would register it.
#[derive(Debug, PartialEq, Serialize)]
pub struct SensorState {
    pub unique_id: String,
    pub name: String,
    pub unit: Option<&'static str>,
    pub device_class: Option<DeviceClass>,
    pub state_class: StateClass,
    pub icon: &'static str,
    pub value: Option<f64>,
}

pub fn describe(sensor: &dyn Sensor, coordinator: &PollingCoordinator) -> SensorState {
    let property = sensor.property();
    SensorState {
        unique_id: sensor.unique_id(),
        name: sensor.name(),
        unit: property.unit,
        device_class: property.device_class,
        state_class: property.state_class,
        icon: property.icon,
        value: sensor.value(coordinator),
    }
}

/// Every sensor of the installation: one per panel and panel property, plus the
/// summary sensors.
pub fn sensors(coordinator: &PollingCoordinator) -> Result<Vec<Box<dyn Sensor>>, Error> {
    let mut sensors: Vec<Box<dyn Sensor>> = Vec::new();
    for sensor in panel_sensors(coordinator)? {
        sensors.push(Box::new(sensor));
    }
    for sensor in summary_sensors() {
        sensors.push(Box::new(sensor));
    }
    Ok(sensors)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::session::test::{credentials, mock_portal};
    use crate::session::SessionCache;
    use crate::telemetry::{TelemetryClient, LAST_VALUE_METRICS, SUMMARY_AGGREGATES};
    use httpmock::prelude::*;
    use std::time::Duration;

    #[test]
    fn properties_cover_fetched_metrics() {
        for metric in LAST_VALUE_METRICS {
            assert!(PANEL_PROPERTIES.iter().any(|p| p.key == metric), "{}", metric);
        }
        let keys: Vec<_> = SUMMARY_PROPERTIES.iter().map(|p| p.key).collect();
        assert_eq!(SUMMARY_AGGREGATES.to_vec(), keys);
    }

    #[test]
    fn panel_sensor_identity() {
        let sensor = PanelSensor {
            panel: Panel {
                id: String::from("1101"),
                name: String::from("A1"),
                token: String::from("tok-a1"),
                attributes: serde_json::Map::new(),
            },
            property: &PANEL_PROPERTIES[1],
        };
        assert_eq!("tigo_cloud.tigo.tok-a1_pin", sensor.unique_id());
        assert_eq!("A1 Power", sensor.name());
    }

    #[test]
    fn summary_sensor_identity() {
        let sensors = summary_sensors();
        assert_eq!(6, sensors.len());
        assert_eq!("tigo_cloud.tigo.summary.now", sensors[0].unique_id());
        assert_eq!("Current production", sensors[0].name());
    }

    #[test]
    fn classes_serialize_like_labels() {
        assert_eq!(
            format!("\"{}\"", StateClass::TotalIncreasing.as_str()),
            serde_json::to_string(&StateClass::TotalIncreasing).unwrap()
        );
        assert_eq!(
            format!("\"{}\"", DeviceClass::Temperature.as_str()),
            serde_json::to_string(&DeviceClass::Temperature).unwrap()
        );
    }

    #[tokio::test]
    async fn described_sensors_carry_metadata_and_values() {
        let server = MockServer::start();
        mock_portal(&server, "jwt-1", 7200);
        server.mock(|when, then| {
            when.method(GET).path("/api/v4/system/summary/aggenergy");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"dataset": {"1101": 812.0}, "datasetLastData": {}}"#);
        });
        let session = SessionCache::new(&server.base_url(), credentials(), Duration::from_secs(5));
        let mut coordinator = PollingCoordinator::new(
            TelemetryClient::new(session, chrono_tz::UTC),
            Duration::from_secs(60),
        );
        coordinator.refresh().await.unwrap();

        let sensors = sensors(&coordinator).unwrap();
        assert_eq!(2 * PANEL_PROPERTIES.len() + SUMMARY_PROPERTIES.len(), sensors.len());

        let states: Vec<_> = sensors.iter().map(|s| describe(s.as_ref(), &coordinator)).collect();
        assert_eq!(
            SensorState {
                unique_id: String::from("tigo_cloud.tigo.tok-a1_energy"),
                name: String::from("A1 Energy"),
                unit: Some("Wh"),
                device_class: Some(DeviceClass::Energy),
                state_class: StateClass::TotalIncreasing,
                icon: "mdi:solar-power-variant-outline",
                value: Some(812.0),
            },
            states[0]
        );
        let pwm = states
            .iter()
            .find(|s| s.unique_id == "tigo_cloud.tigo.tok-a1_pwm")
            .unwrap();
        assert_eq!(None, pwm.device_class);
        assert_eq!(None, pwm.value);
        assert_eq!("mdi:square-wave", pwm.icon);
    }
}
