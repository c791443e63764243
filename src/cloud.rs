use crate::error::AppError;
use aquabotanica_core::telemetry::{ConnectionMonitor, ConnectionStatus, IotHubCredentials, Transport};
use aquabotanica_core::Error;
use esp_idf_svc::mqtt::client::{
  EspMqttClient, EventPayload, MqttClientConfiguration, MqttProtocolVersion, QoS,
};
use log::{error, info, warn};
use std::sync::{Arc, Mutex};

/// Azure IoT Hub device client over MQTT.
///
/// The client runs on its own ESP-IDF task; its event callback only records
/// the connection status, which [`Transport::pump`] turns into log records.
pub struct IotHubLink {
  /// The MQTT client, absent if it could not be created.
  client: Option<EspMqttClient<'static>>,

  /// Device-to-cloud topic.
  topic: String,

  /// Status written by the client callback.
  status: Arc<Mutex<ConnectionStatus>>,

  /// Last status logged.
  monitor: ConnectionMonitor,
}

/// The IoT Hub link implementation.
impl IotHubLink {
  /// Connect with a device connection string.
  ///
  /// A failure is logged and yields a link that drops every message, so the
  /// station keeps running without telemetry.
  ///
  /// # Parameters
  /// - `connection_string`: `HostName=...;DeviceId=...;SharedAccessSignature=...`.
  ///
  /// # Returns
  /// The IoT Hub link.
  pub fn connect(connection_string: &str) -> Self {
    let status = Arc::new(Mutex::new(ConnectionStatus::Unknown));

    let (client, topic) = match Self::create(connection_string, Arc::clone(&status)) {
      Ok((client, topic)) => (Some(client), topic),
      Err(e) => {
        error!("Failed to create the IoT Hub client: {}", e);
        (None, String::new())
      }
    };

    Self { client, topic, status, monitor: ConnectionMonitor::default() }
  }

  /// Create the MQTT client.
  ///
  /// # Parameters
  /// - `connection_string`: The device connection string.
  /// - `status`: Where the client callback records connection changes.
  ///
  /// # Returns
  /// The client and the topic to publish to.
  fn create(
    connection_string: &str,
    status: Arc<Mutex<ConnectionStatus>>
  ) -> Result<(EspMqttClient<'static>, String), AppError> {
    let credentials = IotHubCredentials::parse(connection_string)?;
    let url = credentials.broker_url();
    let username = credentials.username();

    let config = MqttClientConfiguration {
      client_id: Some(credentials.device_id.as_str()),
      username: Some(username.as_str()),
      password: Some(credentials.shared_access_signature.as_str()),
      protocol_version: Some(MqttProtocolVersion::V3_1_1),
      crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
      ..Default::default()
    };

    let client = EspMqttClient::new_cb(&url, &config, move |event| {
      let next = match event.payload() {
        EventPayload::Connected(_) => ConnectionStatus::Authenticated,
        EventPayload::Disconnected => ConnectionStatus::Disconnected("connection closed".into()),
        EventPayload::Error(e) => ConnectionStatus::Disconnected(format!("{:?}", e)),
        _ => return,
      };

      if let Ok(mut current) = status.lock() {
        *current = next;
      }
    })
    .map_err(|e| AppError::TransportError(format!("Failed to start MQTT client for {}: {:?}", url, e)))?;

    info!("IoT Hub client started for device {}", credentials.device_id);

    Ok((client, credentials.event_topic()))
  }
}

impl Transport for IotHubLink {
  fn send(&mut self, payload: &str) -> Result<(), Error> {
    let Some(client) = self.client.as_mut() else {
      warn!("No IoT Hub client, telemetry dropped");
      return Ok(());
    };

    client
      .enqueue(&self.topic, QoS::AtLeastOnce, false, payload.as_bytes())
      .map(|_| ())
      .map_err(|e| Error::Transport(format!("Failed to queue telemetry: {:?}", e)))
  }

  fn pump(&mut self) {
    let status = self.status();
    self.monitor.observe(status);
  }

  fn status(&self) -> ConnectionStatus {
    self.status
      .lock()
      .map(|status| status.clone())
      .unwrap_or_else(|_| ConnectionStatus::Disconnected("status unavailable".into()))
  }
}
