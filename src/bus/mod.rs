//! Message bus abstraction
//!
//! Components depend on [`MessageBus`] rather than a concrete transport:
//! [`LocalBus`] fans messages out in-process, [`BusClient`] bridges to the
//! websocket bus service shared with the rest of the assistant.

mod client;

pub use client::BusClient;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::Result;

/// Channel capacity for bus fan-out
pub(crate) const CHANNEL_CAPACITY: usize = 256;

/// Event names consumed and emitted by the enclosure
pub mod events {
    pub const NO_INTERNET: &str = "enclosure.notify.no_internet";
    pub const AP_UP: &str = "system.wifi.ap_up";
    pub const AP_DEVICE_CONNECTED: &str = "system.wifi.ap_device_connected";
    pub const AP_DEVICE_DISCONNECTED: &str = "system.wifi.ap_device_disconnected";
    pub const AP_CONNECTION_SUCCESS: &str = "system.wifi.ap_connection_success";
    pub const PAIRED: &str = "mycroft.paired";
    pub const SPEAK: &str = "speak";
    pub const WIFI_SETUP: &str = "system.wifi.setup";
    pub const MIC_MUTE: &str = "mycroft.mic.mute";
    pub const MIC_UNMUTE: &str = "mycroft.mic.unmute";
    pub const AUDIO_OUTPUT_START: &str = "recognizer_loop:audio_output_start";
    pub const AUDIO_OUTPUT_END: &str = "recognizer_loop:audio_output_end";
}

/// A bus message: event name plus untyped payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Event name (e.g. `"system.wifi.ap_up"`)
    #[serde(rename = "type")]
    pub msg_type: String,

    /// Event payload
    #[serde(default)]
    pub data: Map<String, Value>,

    /// Routing context
    #[serde(default)]
    pub context: Map<String, Value>,
}

impl Message {
    /// Create a message with an empty payload
    #[must_use]
    pub fn new(msg_type: &str) -> Self {
        Self {
            msg_type: msg_type.to_string(),
            data: Map::new(),
            context: Map::new(),
        }
    }

    /// Return this message with `data` as its payload
    ///
    /// Non-object values are ignored.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        if let Value::Object(map) = data {
            self.data = map;
        }
        self
    }

    /// Build a `speak` message
    #[must_use]
    pub fn speak(utterance: &str) -> Self {
        Self::new(events::SPEAK).with_data(serde_json::json!({ "utterance": utterance }))
    }

    /// Serialize to the JSON wire format
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse from the JSON wire format
    ///
    /// # Errors
    ///
    /// Returns error if the text is not a bus message
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Publish/subscribe capability injected into bus-driven components
pub trait MessageBus: Send + Sync {
    /// Publish a message to all subscribers
    ///
    /// # Errors
    ///
    /// Returns error if the bus is closed
    fn emit(&self, message: Message) -> Result<()>;

    /// Subscribe to every message seen on the bus from now on
    fn subscribe(&self) -> broadcast::Receiver<Message>;
}

/// In-process bus over a broadcast channel
///
/// Emitted messages are delivered to every subscriber, including the emitter.
#[derive(Clone)]
pub struct LocalBus {
    tx: broadcast::Sender<Message>,
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalBus {
    /// Create a new bus with no subscribers
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }
}

impl MessageBus for LocalBus {
    fn emit(&self, message: Message) -> Result<()> {
        tracing::trace!(msg_type = %message.msg_type, "emit");
        // No subscribers is not an error
        let _ = self.tx.send(message);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.tx.subscribe()
    }
}

/// Wait for the next message of `msg_type` on `rx`
///
/// Returns `None` on timeout or when the bus closes. Lagged receivers skip
/// the dropped messages and keep waiting.
pub async fn wait_for(
    rx: &mut broadcast::Receiver<Message>,
    msg_type: &str,
    timeout: Option<Duration>,
) -> Option<Message> {
    let wait = async {
        loop {
            match rx.recv().await {
                Ok(message) if message.msg_type == msg_type => return Some(message),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, msg_type, "bus receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    };

    match timeout {
        Some(limit) => tokio::time::timeout(limit, wait).await.ok().flatten(),
        None => wait.await,
    }
}

/// Run `handler` once, on the first `msg_type` message after this call
///
/// The subscription is taken before returning, so a message emitted right
/// after `once` is never missed.
pub fn once<B, F>(bus: &B, msg_type: &'static str, handler: F) -> tokio::task::JoinHandle<()>
where
    B: MessageBus + ?Sized,
    F: FnOnce(Message) + Send + 'static,
{
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        if let Some(message) = wait_for(&mut rx, msg_type, None).await {
            handler(message);
        }
    })
}
