// sim/mod.rs
//
// In-process stand-in for the shadow service: an MQTT-shaped loopback
// broker in front of one simulated lamp. A desired-state command published
// on the command topic is applied to the lamp and confirmed on
// `<topic>/accepted`, the same round trip the cloud performs. The demo
// binary and the integration tests run against this.
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::info;

use crate::error::PanelError;
use crate::models::{ConnectionEvent, LightState, QoS, ShadowDocument};
use crate::shadow::ShadowReader;
use crate::transport::{ConnectionConfig, MessageHandler, MqttConnection, MqttTransport};
use crate::utils;

/// One simulated light, reporting whatever it was last asked to be.
pub struct SimLamp {
    reported: RwLock<LightState>,
}

impl SimLamp {
    pub fn new(initial: LightState) -> Self {
        Self {
            reported: RwLock::new(initial),
        }
    }

    pub fn reported(&self) -> LightState {
        *self.reported.read().unwrap_or_else(|e| e.into_inner())
    }

    fn apply_desired(&self, desired: LightState) -> LightState {
        let mut reported = self.reported.write().unwrap_or_else(|e| e.into_inner());
        *reported = desired;
        *reported
    }
}

type SubscriptionTable = DashMap<String, Vec<MessageHandler>>;

/// Loopback transport plus shadow-read endpoint over a [`SimLamp`].
pub struct LoopbackBroker {
    lamp: Arc<SimLamp>,
    command_topic: String,
    subscriptions: Arc<SubscriptionTable>,
    fail_handshake: bool,
    fail_publishes: bool,
}

impl LoopbackBroker {
    pub fn new(command_topic: impl Into<String>, initial: LightState) -> Self {
        Self {
            lamp: Arc::new(SimLamp::new(initial)),
            command_topic: command_topic.into(),
            subscriptions: Arc::new(DashMap::new()),
            fail_handshake: false,
            fail_publishes: false,
        }
    }

    /// Broker that emits an `Error` lifecycle event instead of `Connected`.
    pub fn with_failing_handshake(mut self) -> Self {
        self.fail_handshake = true;
        self
    }

    /// Broker whose publishes fail at the transport level.
    pub fn with_failing_publishes(mut self) -> Self {
        self.fail_publishes = true;
        self
    }

    pub fn lamp(&self) -> Arc<SimLamp> {
        self.lamp.clone()
    }
}

#[async_trait]
impl MqttTransport for LoopbackBroker {
    async fn open(&self, config: ConnectionConfig) -> Result<Arc<dyn MqttConnection>, PanelError> {
        let (events, _) = broadcast::channel(16);
        let outcome = if self.fail_handshake {
            ConnectionEvent::Error("handshake refused".into())
        } else {
            ConnectionEvent::Connected
        };

        info!(client_id = %config.client_id, "Loopback handshake started");
        Ok(Arc::new(LoopbackConnection {
            lamp: self.lamp.clone(),
            command_topic: self.command_topic.clone(),
            subscriptions: self.subscriptions.clone(),
            fail_publishes: self.fail_publishes,
            handshake_outcome: Mutex::new(Some(outcome)),
            events,
        }))
    }
}

#[async_trait]
impl ShadowReader for LoopbackBroker {
    async fn get_shadow(&self, _thing_name: &str) -> Result<ShadowDocument, PanelError> {
        Ok(reported_document(self.lamp.reported()))
    }
}

struct LoopbackConnection {
    lamp: Arc<SimLamp>,
    command_topic: String,
    subscriptions: Arc<SubscriptionTable>,
    fail_publishes: bool,
    /// Handshake outcome, held back until someone listens for lifecycle
    /// events so it cannot be dropped before the subscription exists.
    handshake_outcome: Mutex<Option<ConnectionEvent>>,
    events: broadcast::Sender<ConnectionEvent>,
}

impl LoopbackConnection {
    fn dispatch(&self, topic: &str, payload: &[u8]) {
        if let Some(handlers) = self.subscriptions.get(topic) {
            for handler in handlers.iter() {
                handler(topic, payload);
            }
        }
    }
}

impl MqttConnection for LoopbackConnection {
    fn subscribe(&self, topic: &str, _qos: QoS, handler: MessageHandler) -> Result<(), PanelError> {
        self.subscriptions
            .entry(topic.to_string())
            .or_default()
            .push(handler);
        Ok(())
    }

    fn publish(
        &self,
        topic: &str,
        payload: serde_json::Value,
        _qos: QoS,
    ) -> Result<(), PanelError> {
        if self.fail_publishes {
            return Err(PanelError::Publish {
                topic: topic.to_string(),
                reason: "transport severed".into(),
            });
        }
        if topic != self.command_topic {
            return Ok(());
        }
        let doc: ShadowDocument = serde_json::from_value(payload).map_err(|e| {
            PanelError::Publish {
                topic: topic.to_string(),
                reason: e.to_string(),
            }
        })?;
        let Some(desired) = doc.state.desired.map(|s| s.status) else {
            return Ok(());
        };

        let reported = self.lamp.apply_desired(desired);
        let ack = reported_document(reported);
        let bytes = serde_json::to_vec(&ack).map_err(|e| PanelError::Publish {
            topic: topic.to_string(),
            reason: e.to_string(),
        })?;
        self.dispatch(&utils::accepted_topic(&self.command_topic), &bytes);
        Ok(())
    }

    fn events(&self) -> broadcast::Receiver<ConnectionEvent> {
        let receiver = self.events.subscribe();
        let outcome = self
            .handshake_outcome
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(outcome) = outcome {
            let _ = self.events.send(outcome);
        }
        receiver
    }
}

fn reported_document(status: LightState) -> ShadowDocument {
    let mut doc = ShadowDocument::default();
    doc.state.reported = Some(crate::models::LightStatus { status });
    doc
}
