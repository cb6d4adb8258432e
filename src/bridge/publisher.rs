//! Outbound side of the bridge
//!
//! `Bridge` is the handle REST handlers use to talk to devices. Every publish
//! is guarded by the connected flag: while the broker is unreachable the call
//! logs a warning and returns `false`. Nothing is queued or retried.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rumqttc::{AsyncClient, QoS};
use serde::Serialize;
use serde_json::Number;
use tracing::{info, warn};

use crate::topics;
use crate::utils::error::BridgeError;

/// The broker client operations the bridge needs. Implemented by rumqttc's
/// `AsyncClient`; tests substitute a recorder.
pub trait MqttSink: Send + Sync + 'static {
    fn publish(
        &self,
        topic: &str,
        qos: QoS,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), BridgeError>;

    fn subscribe(&self, filter: &str, qos: QoS) -> Result<(), BridgeError>;

    fn disconnect(&self) -> Result<(), BridgeError>;
}

impl MqttSink for AsyncClient {
    fn publish(
        &self,
        topic: &str,
        qos: QoS,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), BridgeError> {
        Ok(self.try_publish(topic, qos, retain, payload)?)
    }

    fn subscribe(&self, filter: &str, qos: QoS) -> Result<(), BridgeError> {
        Ok(self.try_subscribe(filter, qos)?)
    }

    fn disconnect(&self) -> Result<(), BridgeError> {
        Ok(self.try_disconnect()?)
    }
}

impl<T: MqttSink + ?Sized> MqttSink for Arc<T> {
    fn publish(
        &self,
        topic: &str,
        qos: QoS,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), BridgeError> {
        (**self).publish(topic, qos, retain, payload)
    }

    fn subscribe(&self, filter: &str, qos: QoS) -> Result<(), BridgeError> {
        (**self).subscribe(filter, qos)
    }

    fn disconnect(&self) -> Result<(), BridgeError> {
        (**self).disconnect()
    }
}

/// Partial thermostat update; only the fields that are set go out.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ThermostatCommand {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_temp: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LightCommand {
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness: Option<u8>,
}

/// Retained notice that a new firmware package can be downloaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentNotice {
    pub id: String,
    pub version: String,
    pub filename: String,
    pub size: u64,
    pub sha256: String,
    pub download_url: String,
    pub timestamp: String,
}

pub struct Bridge {
    sink: Box<dyn MqttSink>,
    connected: AtomicBool,
}

impl Bridge {
    /// A bridge starts disconnected; the event loop flips the flag on ConnAck.
    pub fn new(sink: impl MqttSink) -> Self {
        Self {
            sink: Box::new(sink),
            connected: AtomicBool::new(false),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Issue one subscription request per fixed filter. A failure is logged
    /// and the remaining filters are still requested. Returns how many
    /// requests were accepted by the client.
    pub fn subscribe_all(&self) -> usize {
        let mut accepted = 0;
        for filter in topics::SUBSCRIPTIONS {
            match self.sink.subscribe(filter, QoS::AtMostOnce) {
                Ok(()) => {
                    info!(filter, "Subscribed");
                    accepted += 1;
                }
                Err(e) => warn!(filter, error = %e, "Failed to subscribe"),
            }
        }
        accepted
    }

    pub fn publish_thermostat_command(&self, target_temp: Option<Number>, mode: Option<&str>) -> bool {
        let command = ThermostatCommand {
            target_temp,
            mode: mode.map(str::to_string),
        };
        self.publish_json("thermostat command", topics::THERMOSTAT_COMMAND, false, &command)
    }

    pub fn publish_light_command(&self, id: u32, state: &str, brightness: Option<u8>) -> bool {
        let command = LightCommand {
            state: state.to_string(),
            brightness,
        };
        self.publish_json("light command", &topics::light_command(id), false, &command)
    }

    /// Retained so devices that connect later still see the latest package.
    pub fn publish_deployment_available(&self, notice: &DeploymentNotice) -> bool {
        self.publish_json(
            "deployment notification",
            topics::DEPLOYMENT_AVAILABLE,
            true,
            notice,
        )
    }

    pub fn disconnect(&self) {
        if let Err(e) = self.sink.disconnect() {
            warn!(error = %e, "MQTT disconnect request failed");
        }
        self.set_connected(false);
    }

    fn publish_json<T: Serialize>(&self, what: &str, topic: &str, retain: bool, payload: &T) -> bool {
        if !self.is_connected() {
            warn!(topic, "MQTT not connected, cannot publish {what}");
            return false;
        }

        let bytes = match serde_json::to_vec(payload) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(topic, error = %e, "Failed to encode {what}");
                return false;
            }
        };

        info!(topic, payload = %String::from_utf8_lossy(&bytes), "Publishing {what}");
        match self.sink.publish(topic, QoS::AtLeastOnce, retain, bytes) {
            Ok(()) => true,
            Err(e) => {
                warn!(topic, error = %e, "Failed to publish {what}");
                false
            }
        }
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("connected", &self.is_connected())
            .finish()
    }
}
