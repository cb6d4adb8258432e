//! In-memory `MqttSink` for tests.

use parking_lot::Mutex;
use rumqttc::QoS;
use serde_json::Value;

use super::publisher::MqttSink;
use crate::utils::error::BridgeError;

#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub topic: String,
    pub qos: QoS,
    pub retain: bool,
    pub payload: Value,
}

#[derive(Default)]
pub struct RecordingSink {
    pub published: Mutex<Vec<Published>>,
    pub subscribed: Mutex<Vec<String>>,
    pub reject_filter: Option<&'static str>,
    pub reject_publish: bool,
}

impl MqttSink for RecordingSink {
    fn publish(
        &self,
        topic: &str,
        qos: QoS,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), BridgeError> {
        if self.reject_publish {
            return Err(BridgeError::Rejected("queue full".into()));
        }
        self.published.lock().push(Published {
            topic: topic.to_string(),
            qos,
            retain,
            payload: serde_json::from_slice(&payload).unwrap(),
        });
        Ok(())
    }

    fn subscribe(&self, filter: &str, _qos: QoS) -> Result<(), BridgeError> {
        if self.reject_filter == Some(filter) {
            return Err(BridgeError::Rejected("closed".into()));
        }
        self.subscribed.lock().push(filter.to_string());
        Ok(())
    }

    fn disconnect(&self) -> Result<(), BridgeError> {
        Ok(())
    }
}
