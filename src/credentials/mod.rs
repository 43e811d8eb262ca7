// credentials/mod.rs
use async_trait::async_trait;
use tracing::info;

use crate::error::PanelError;
use crate::models::Credentials;

/// Identity broker seam. The real broker exchanges a pool identifier for an
/// identity, then the identity for temporary credentials; it is an external
/// collaborator and not reimplemented here.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn exchange_identity(&self, pool_id: &str) -> Result<String, PanelError>;
    async fn credentials_for(&self, identity_id: &str) -> Result<Credentials, PanelError>;
}

/// Runs the two-step exchange. Any failure is fatal for startup.
pub async fn fetch_credentials(
    provider: &dyn CredentialProvider,
    pool_id: &str,
) -> Result<Credentials, PanelError> {
    let identity_id = provider.exchange_identity(pool_id).await?;
    info!(%identity_id, "Obtained federated identity");
    provider.credentials_for(&identity_id).await
}

/// Provider backed by pre-issued values, used by the demo binary and tests.
pub struct StaticCredentialProvider {
    credentials: Credentials,
}

impl StaticCredentialProvider {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn exchange_identity(&self, pool_id: &str) -> Result<String, PanelError> {
        if pool_id.is_empty() {
            return Err(PanelError::Auth("empty identity pool id".into()));
        }
        Ok(format!("{pool_id}:static"))
    }

    async fn credentials_for(&self, _identity_id: &str) -> Result<Credentials, PanelError> {
        Ok(self.credentials.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canned() -> Credentials {
        Credentials {
            access_key_id: "AKIA...".into(),
            secret_access_key: "secret".into(),
            session_token: "token".into(),
        }
    }

    #[tokio::test]
    async fn exchange_chains_identity_then_credentials() {
        let provider = StaticCredentialProvider::new(canned());
        let creds = fetch_credentials(&provider, "us-east-1:pool").await.unwrap();
        assert_eq!(creds.access_key_id, "AKIA...");
    }

    #[tokio::test]
    async fn auth_failure_propagates() {
        let provider = StaticCredentialProvider::new(canned());
        let err = fetch_credentials(&provider, "").await.unwrap_err();
        assert!(matches!(err, PanelError::Auth(_)));
    }
}
