// session/mod.rs
use std::sync::Arc;

use metrics::counter;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::error::PanelError;
use crate::models::{ConnectionEvent, Credentials, QoS};
use crate::transport::{ConnectionConfig, MessageHandler, MqttConnection, MqttTransport};
use crate::utils;

/// Owns the lifecycle of exactly one persistent connection per session.
pub struct SessionManager {
    transport: Arc<dyn MqttTransport>,
}

impl SessionManager {
    pub fn new(transport: Arc<dyn MqttTransport>) -> Self {
        Self { transport }
    }

    /// One-shot handshake: resolves on the `Connected` lifecycle event,
    /// fails on `Error`. Later events never re-resolve this call; they are
    /// only logged by a background task. There is no retry path.
    pub async fn connect(
        &self,
        settings: &Settings,
        credentials: Credentials,
    ) -> Result<Session, PanelError> {
        let client_id = utils::session_client_id();
        let config = ConnectionConfig::builder()
            .with_clean_session(true)
            .with_client_id(&client_id)
            .with_endpoint(&settings.aws.iot_endpoint)
            .with_credentials(&settings.aws.region, credentials)
            .with_use_websockets()
            .with_keep_alive_secs(settings.connection.keep_alive_secs)
            .build()?;

        info!(%client_id, "Connecting websocket...");
        let connection = self.transport.open(config).await?;
        let mut events = connection.events();
        loop {
            match events.recv().await {
                Ok(ConnectionEvent::Connected) => break,
                Ok(ConnectionEvent::Error(e)) => return Err(PanelError::ConnectionFailed(e)),
                Ok(other) => warn!(?other, "Lifecycle event before connect ack"),
                Err(_) => {
                    return Err(PanelError::ConnectionFailed(
                        "event stream closed during handshake".into(),
                    ));
                }
            }
        }
        info!("Connected");
        tokio::spawn(log_lifecycle(events));
        Ok(Session { connection })
    }
}

/// Background observer for mid-session lifecycle events. Reconnects happen
/// inside the transport; this layer only records them.
async fn log_lifecycle(mut events: broadcast::Receiver<ConnectionEvent>) {
    loop {
        match events.recv().await {
            Ok(ConnectionEvent::Interrupted(e)) => {
                counter!("panel_connection_interruptions_total").increment(1);
                warn!("Connection interrupted: error={e}");
            }
            Ok(ConnectionEvent::Resumed) => info!("Resumed"),
            Ok(ConnectionEvent::Disconnected) => info!("Disconnected"),
            Ok(ConnectionEvent::Error(e)) => error!("Connection error: {e}"),
            Ok(ConnectionEvent::Connected) => {}
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Publish/subscribe capability handed to the synchronizer. It never owns
/// the raw connection teardown; an interrupted transport leaves the
/// capability in place and operations fail at call time.
#[derive(Clone)]
pub struct Session {
    connection: Arc<dyn MqttConnection>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

impl Session {
    pub fn subscribe(
        &self,
        topic: &str,
        qos: QoS,
        handler: MessageHandler,
    ) -> Result<(), PanelError> {
        self.connection.subscribe(topic, qos, handler)
    }

    /// Failures are caught and logged, never retried and never surfaced to
    /// the caller's UI state.
    pub fn publish(&self, topic: &str, payload: serde_json::Value, qos: QoS) {
        match self.connection.publish(topic, payload, qos) {
            Ok(()) => {
                counter!("panel_publishes_total").increment(1);
            }
            Err(e) => {
                counter!("panel_publish_failures_total").increment(1);
                error!("Error publishing: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AwsSettings, ConnectionSettings, MetricsSettings};
    use async_trait::async_trait;
    use std::time::Duration;

    struct ScriptedTransport {
        script: Vec<ConnectionEvent>,
    }

    struct ScriptedConnection {
        script: std::sync::Mutex<Vec<ConnectionEvent>>,
        events: broadcast::Sender<ConnectionEvent>,
    }

    #[async_trait]
    impl MqttTransport for ScriptedTransport {
        async fn open(
            &self,
            _config: ConnectionConfig,
        ) -> Result<Arc<dyn MqttConnection>, PanelError> {
            let (tx, _) = broadcast::channel(8);
            Ok(Arc::new(ScriptedConnection {
                script: std::sync::Mutex::new(self.script.clone()),
                events: tx,
            }))
        }
    }

    impl MqttConnection for ScriptedConnection {
        fn subscribe(
            &self,
            _topic: &str,
            _qos: QoS,
            _handler: MessageHandler,
        ) -> Result<(), PanelError> {
            Ok(())
        }

        fn publish(
            &self,
            _topic: &str,
            _payload: serde_json::Value,
            _qos: QoS,
        ) -> Result<(), PanelError> {
            Ok(())
        }

        fn events(&self) -> broadcast::Receiver<ConnectionEvent> {
            let receiver = self.events.subscribe();
            for event in self.script.lock().unwrap().drain(..) {
                let _ = self.events.send(event);
            }
            receiver
        }
    }

    #[test]
    fn session_debug_formats_for_test_assertions() {
        let result: Result<Session, PanelError> =
            Err(PanelError::ConnectionFailed("refused".into()));
        assert!(format!("{result:?}").contains("ConnectionFailed"));
    }

    fn settings() -> Settings {
        Settings {
            aws: AwsSettings {
                region: "us-east-1".into(),
                identity_pool_id: "us-east-1:pool".into(),
                iot_endpoint: "example.iot.us-east-1.amazonaws.com".into(),
                thing_name: "lamp".into(),
                publish_topic: "things/lamp/shadow/update".into(),
            },
            connection: ConnectionSettings { keep_alive_secs: 30 },
            metrics: MetricsSettings {
                enabled: false,
                port: 9090,
            },
            credentials: None,
        }
    }

    fn credentials() -> Credentials {
        Credentials {
            access_key_id: "id".into(),
            secret_access_key: "secret".into(),
            session_token: "token".into(),
        }
    }

    #[tokio::test]
    async fn connect_resolves_on_connected_event() {
        let manager = SessionManager::new(Arc::new(ScriptedTransport {
            script: vec![ConnectionEvent::Connected],
        }));
        let result = tokio::time::timeout(
            Duration::from_secs(1),
            manager.connect(&settings(), credentials()),
        )
        .await
        .expect("handshake should settle");
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn connect_rejects_on_error_event() {
        let manager = SessionManager::new(Arc::new(ScriptedTransport {
            script: vec![ConnectionEvent::Error("unauthorized".into())],
        }));
        let err = tokio::time::timeout(
            Duration::from_secs(1),
            manager.connect(&settings(), credentials()),
        )
        .await
        .expect("handshake should settle")
        .unwrap_err();
        assert!(matches!(err, PanelError::ConnectionFailed(_)));
    }
}
