// config/mod.rs
use config::Config;
use serde::Deserialize;
use validator::Validate;

use crate::models::Credentials;

#[derive(Debug, Deserialize, Validate)]
pub struct Settings {
    #[validate(nested)]
    pub aws: AwsSettings,
    pub connection: ConnectionSettings,
    pub metrics: MetricsSettings,
    /// Pre-issued temporary credentials for the static provider. Absent in
    /// deployments where a real identity broker supplies them.
    #[serde(default)]
    pub credentials: Option<CredentialSettings>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AwsSettings {
    #[validate(length(min = 1))]
    pub region: String,
    #[validate(length(min = 1))]
    pub identity_pool_id: String,
    #[validate(length(min = 1))]
    pub iot_endpoint: String,
    #[validate(length(min = 1))]
    pub thing_name: String,
    #[validate(length(min = 1))]
    pub publish_topic: String,
}

#[derive(Debug, Deserialize)]
pub struct ConnectionSettings {
    pub keep_alive_secs: u16,
}

#[derive(Debug, Deserialize)]
pub struct MetricsSettings {
    pub enabled: bool,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialSettings {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
}

impl From<&CredentialSettings> for Credentials {
    fn from(settings: &CredentialSettings) -> Self {
        Credentials {
            access_key_id: settings.access_key_id.clone(),
            secret_access_key: settings.secret_access_key.clone(),
            session_token: settings.session_token.clone(),
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, config::ConfigError> {
        let settings = Config::builder()
            .add_source(config::File::with_name("config/config").required(false))
            .add_source(config::Environment::with_prefix("PANEL").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}
