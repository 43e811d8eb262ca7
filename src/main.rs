// main.rs
use std::sync::Arc;

use light_panel::config::Settings;
use light_panel::credentials::{self, StaticCredentialProvider};
use light_panel::metrics::setup_metrics;
use light_panel::models::{Credentials, LightState, QoS};
use light_panel::panel::TerminalPanel;
use light_panel::session::SessionManager;
use light_panel::shadow;
use light_panel::sim::LoopbackBroker;
use light_panel::sync::Synchronizer;
use light_panel::transport::MqttTransport;
use light_panel::utils;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;
use validator::Validate;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::new().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    settings
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid config: {}", e))?;

    if settings.metrics.enabled {
        setup_metrics(settings.metrics.port);
    }

    // Identity exchange. Any failure here is fatal for startup.
    let provider = StaticCredentialProvider::new(panel_credentials(&settings));
    let creds =
        credentials::fetch_credentials(&provider, &settings.aws.identity_pool_id).await?;

    // The demo runs against the in-process shadow service; a cloud-backed
    // transport plugs in through the same two traits.
    let broker = Arc::new(LoopbackBroker::new(
        settings.aws.publish_topic.clone(),
        LightState::Off,
    ));

    // Snapshot-read failure is logged and swallowed; the panel then starts
    // without an initial state and stays disabled until a live message.
    let initial = shadow::try_read_initial_state(broker.as_ref(), &settings.aws.thing_name).await;

    let manager = SessionManager::new(broker.clone() as Arc<dyn MqttTransport>);
    let session = manager.connect(&settings, creds).await?;

    let panel = Arc::new(TerminalPanel);
    let sync = Arc::new(Synchronizer::new(
        Arc::new(session.clone()),
        panel,
        settings.aws.publish_topic.clone(),
    ));
    if let Some(initial) = initial {
        sync.handle_snapshot(initial);
    }

    let handler_sync = sync.clone();
    session.subscribe(
        &utils::accepted_topic(&settings.aws.publish_topic),
        QoS::AtLeastOnce,
        Box::new(move |topic, payload| handler_sync.handle_message(topic, payload)),
    )?;
    sync.handle_subscribed();

    info!("Panel ready: press enter to toggle the light, ctrl-d to quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(_line) = lines.next_line().await? {
        sync.handle_toggle();
    }

    Ok(())
}

/// Credentials from the `[credentials]` settings section, with demo
/// placeholders when none are configured. Overrides arrive through the same
/// config layering as everything else (PANEL_CREDENTIALS__* variables).
fn panel_credentials(settings: &Settings) -> Credentials {
    match &settings.credentials {
        Some(section) => Credentials::from(section),
        None => Credentials {
            access_key_id: "demo-access-key".into(),
            secret_access_key: "demo-secret".into(),
            session_token: "demo-session-token".into(),
        },
    }
}
