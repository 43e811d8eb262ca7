// transport/mod.rs
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::PanelError;
use crate::models::{ConnectionEvent, Credentials, QoS};

/// Handler invoked once per inbound message on a subscribed topic.
/// Delivery is at-least-once; handlers must tolerate duplicates.
pub type MessageHandler = Box<dyn Fn(&str, &[u8]) + Send + Sync>;

/// Everything the broker needs for one websocket MQTT handshake.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub client_id: String,
    pub endpoint: String,
    pub region: String,
    pub credentials: Credentials,
    pub clean_session: bool,
    pub keep_alive_secs: u16,
    pub use_websockets: bool,
}

impl ConnectionConfig {
    pub fn builder() -> ConnectionConfigBuilder {
        ConnectionConfigBuilder::default()
    }
}

#[derive(Default)]
pub struct ConnectionConfigBuilder {
    client_id: Option<String>,
    endpoint: Option<String>,
    region: Option<String>,
    credentials: Option<Credentials>,
    clean_session: bool,
    keep_alive_secs: u16,
    use_websockets: bool,
}

impl ConnectionConfigBuilder {
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_credentials(mut self, region: impl Into<String>, credentials: Credentials) -> Self {
        self.region = Some(region.into());
        self.credentials = Some(credentials);
        self
    }

    pub fn with_clean_session(mut self, clean_session: bool) -> Self {
        self.clean_session = clean_session;
        self
    }

    pub fn with_keep_alive_secs(mut self, secs: u16) -> Self {
        self.keep_alive_secs = secs;
        self
    }

    pub fn with_use_websockets(mut self) -> Self {
        self.use_websockets = true;
        self
    }

    pub fn build(self) -> Result<ConnectionConfig, PanelError> {
        let missing = |field: &str| {
            PanelError::ConnectionFailed(format!("connection config missing {field}"))
        };
        Ok(ConnectionConfig {
            client_id: self.client_id.ok_or_else(|| missing("client id"))?,
            endpoint: self.endpoint.ok_or_else(|| missing("endpoint"))?,
            region: self.region.ok_or_else(|| missing("region"))?,
            credentials: self.credentials.ok_or_else(|| missing("credentials"))?,
            clean_session: self.clean_session,
            keep_alive_secs: self.keep_alive_secs,
            use_websockets: self.use_websockets,
        })
    }
}

/// Broker seam: starts a handshake and hands back the pending connection.
/// The outcome arrives on the connection's event stream.
#[async_trait]
pub trait MqttTransport: Send + Sync {
    async fn open(&self, config: ConnectionConfig) -> Result<Arc<dyn MqttConnection>, PanelError>;
}

pub trait MqttConnection: Send + Sync {
    fn subscribe(&self, topic: &str, qos: QoS, handler: MessageHandler) -> Result<(), PanelError>;
    fn publish(&self, topic: &str, payload: serde_json::Value, qos: QoS) -> Result<(), PanelError>;
    fn events(&self) -> broadcast::Receiver<ConnectionEvent>;
}
