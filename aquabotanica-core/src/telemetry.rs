//! Telemetry record and the remote transport seam.

use crate::error::Error;
use crate::hardware::SensorSample;
use crate::location::Coordinates;
use log::{info, warn};
use serde::Serialize;

/// API version used in the MQTT username.
const API_VERSION: &str = "2021-04-12";

/// MQTT over TLS.
const MQTT_TLS_PORT: u16 = 8883;

/// Outbound sensor and location record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryRecord<'a> {
    pub device_id: &'a str,
    pub temperature: f32,
    pub humidity: f32,
    pub moisture: i32,
    pub latitude: f64,
    pub longitude: f64,
}

impl<'a> TelemetryRecord<'a> {
    /// Build a record. Invalid temperature/humidity are sent as-is and end up
    /// as `null` in the JSON.
    pub fn new(device_id: &'a str, sample: &SensorSample, position: Coordinates) -> Self {
        Self {
            device_id,
            temperature: sample.temperature,
            humidity: sample.humidity,
            moisture: sample.moisture,
            latitude: position.latitude,
            longitude: position.longitude,
        }
    }

    /// Serialize to compact JSON.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string(self)
            .map_err(|e| Error::Transport(format!("Failed to serialize telemetry: {e}")))
    }
}

/// Last connection state reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// Nothing reported yet.
    #[default]
    Unknown,

    /// Connected and authenticated.
    Authenticated,

    /// Not connected, with the reason given by the client.
    Disconnected(String),
}

/// Fire-and-forget uplink.
pub trait Transport {
    /// Hand a serialized record to the client. Delivery is not confirmed.
    fn send(&mut self, payload: &str) -> Result<(), Error>;

    /// Drive the client's internal work once per loop tick.
    fn pump(&mut self);

    /// Last known connection state.
    fn status(&self) -> ConnectionStatus;
}

/// Logs connection state transitions; never blocks on them.
#[derive(Debug, Default)]
pub struct ConnectionMonitor {
    last: ConnectionStatus,
}

impl ConnectionMonitor {
    pub fn last(&self) -> &ConnectionStatus {
        &self.last
    }

    /// Record a reported status.
    ///
    /// # Returns
    /// * `bool` - Whether it differs from the previous one.
    pub fn observe(&mut self, status: ConnectionStatus) -> bool {
        if status == self.last {
            return false;
        }

        match &status {
            ConnectionStatus::Authenticated => {
                info!("The device client is connected to IoT Hub")
            }
            ConnectionStatus::Disconnected(reason) => {
                warn!("Device client disconnected. Reason: {reason}")
            }
            ConnectionStatus::Unknown => {}
        }
        self.last = status;

        true
    }
}

/// Device credentials taken from an IoT Hub connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IotHubCredentials {
    pub host_name: String,
    pub device_id: String,
    pub shared_access_signature: String,
}

impl IotHubCredentials {
    /// Parse `HostName=...;DeviceId=...;SharedAccessSignature=...`.
    ///
    /// Keys may appear in any order. Values may themselves contain `=`.
    ///
    /// # Arguments
    /// * `connection_string` - The device connection string.
    ///
    /// # Returns
    /// * `Result<Self, Error>` - The credentials, or a `Config` error naming the missing key.
    pub fn parse(connection_string: &str) -> Result<Self, Error> {
        let mut host_name = None;
        let mut device_id = None;
        let mut signature = None;

        for part in connection_string.split(';').filter(|p| !p.trim().is_empty()) {
            let (key, value) = part.split_once('=').ok_or_else(|| {
                Error::Config(format!("Malformed connection string segment {part:?}"))
            })?;

            match key.trim() {
                "HostName" => host_name = Some(value.trim().to_owned()),
                "DeviceId" => device_id = Some(value.trim().to_owned()),
                "SharedAccessSignature" => signature = Some(value.trim().to_owned()),
                _ => {}
            }
        }

        let require = |value: Option<String>, key: &str| {
            value
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::Config(format!("Connection string lacks {key}")))
        };

        Ok(Self {
            host_name: require(host_name, "HostName")?,
            device_id: require(device_id, "DeviceId")?,
            shared_access_signature: require(signature, "SharedAccessSignature")?,
        })
    }

    pub fn broker_url(&self) -> String {
        format!("mqtts://{}:{}", self.host_name, MQTT_TLS_PORT)
    }

    pub fn username(&self) -> String {
        format!(
            "{}/{}/?api-version={}",
            self.host_name, self.device_id, API_VERSION
        )
    }

    /// Device-to-cloud event topic.
    pub fn event_topic(&self) -> String {
        format!("devices/{}/messages/events/", self.device_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_LOCATION, DEVICE_ID};

    const CONNECTION: &str = "HostName=plants.azure-devices.net;DeviceId=wio-1;\
        SharedAccessSignature=SharedAccessSignature sr=plants.azure-devices.net%2Fdevices%2Fwio-1&sig=abc%3D&se=1900000000";

    #[test]
    fn record_json_uses_camel_case_keys() {
        let sample = SensorSample {
            moisture: 250,
            temperature: 21.5,
            humidity: 40.0,
        };
        let json = TelemetryRecord::new(DEVICE_ID, &sample, DEFAULT_LOCATION)
            .to_json()
            .unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["deviceId"], "Wio");
        assert_eq!(value["moisture"], 250);
        assert_eq!(value["temperature"], 21.5);
        assert_eq!(value["humidity"], 40.0);
        assert_eq!(value["latitude"], 47.06895);
        assert_eq!(value["longitude"], 15.40643);
    }

    #[test]
    fn nan_serializes_as_null() {
        let sample = SensorSample {
            moisture: 1,
            temperature: f32::NAN,
            humidity: 55.0,
        };
        let json = TelemetryRecord::new(DEVICE_ID, &sample, DEFAULT_LOCATION)
            .to_json()
            .unwrap();

        assert!(json.contains("\"temperature\":null"), "{json}");
    }

    #[test]
    fn parses_connection_string() {
        let creds = IotHubCredentials::parse(CONNECTION).unwrap();

        assert_eq!(creds.host_name, "plants.azure-devices.net");
        assert_eq!(creds.device_id, "wio-1");
        assert!(creds.shared_access_signature.ends_with("&se=1900000000"));
        assert!(creds.shared_access_signature.contains("sig=abc%3D"));
        assert_eq!(creds.broker_url(), "mqtts://plants.azure-devices.net:8883");
        assert_eq!(
            creds.username(),
            "plants.azure-devices.net/wio-1/?api-version=2021-04-12"
        );
        assert_eq!(creds.event_topic(), "devices/wio-1/messages/events/");
    }

    #[test]
    fn missing_key_is_config_error() {
        let err = IotHubCredentials::parse("HostName=h;DeviceId=d").unwrap_err();
        assert_eq!(
            err,
            Error::Config("Connection string lacks SharedAccessSignature".into())
        );

        assert!(matches!(
            IotHubCredentials::parse(""),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            IotHubCredentials::parse("HostName"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn monitor_reports_transitions_only() {
        let mut monitor = ConnectionMonitor::default();

        assert!(!monitor.observe(ConnectionStatus::Unknown));
        assert!(monitor.observe(ConnectionStatus::Authenticated));
        assert!(!monitor.observe(ConnectionStatus::Authenticated));
        assert!(monitor.observe(ConnectionStatus::Disconnected("timeout".into())));
        assert_eq!(
            monitor.last(),
            &ConnectionStatus::Disconnected("timeout".into())
        );
    }
}
