use async_trait::async_trait;
use aws_sdk_secretsmanager::Client as SecretsManagerClient;
use serde::Deserialize;

use crate::error::{ForwarderError, Result};

#[derive(Clone, Deserialize)]
pub struct WebhookCredentials {
    pub url: String,
    pub secret: String,
}

impl std::fmt::Debug for WebhookCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookCredentials")
            .field("url", &self.url)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl WebhookCredentials {
    pub fn from_secret_string(secret_string: &str) -> Result<Self> {
        let credentials: WebhookCredentials = serde_json::from_str(secret_string)
            .map_err(|e| ForwarderError::credentials(format!("secret is not {{url, secret}} JSON: {}", e)))?;

        if credentials.url.is_empty() || credentials.secret.is_empty() {
            return Err(ForwarderError::credentials("secret has an empty url or secret"));
        }
        Ok(credentials)
    }
}

#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn webhook_credentials(&self, secret_id: &str) -> Result<WebhookCredentials>;
}

pub struct SecretsManagerStore {
    client: SecretsManagerClient,
}

impl SecretsManagerStore {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: SecretsManagerClient::new(config),
        }
    }
}

#[async_trait]
impl SecretStore for SecretsManagerStore {
    async fn webhook_credentials(&self, secret_id: &str) -> Result<WebhookCredentials> {
        if secret_id.is_empty() {
            return Err(ForwarderError::credentials("no secret id configured"));
        }

        let response = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .send()
            .await
            .map_err(|e| ForwarderError::credentials(format!("failed to read {}: {}", secret_id, e)))?;

        let secret_string = response
            .secret_string()
            .ok_or_else(|| ForwarderError::credentials(format!("{} has no secret string", secret_id)))?;

        WebhookCredentials::from_secret_string(secret_string)
    }
}

#[derive(Debug, Clone)]
pub struct StaticSecret {
    credentials: WebhookCredentials,
}

impl StaticSecret {
    pub fn new(url: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            credentials: WebhookCredentials {
                url: url.into(),
                secret: secret.into(),
            },
        }
    }
}

#[async_trait]
impl SecretStore for StaticSecret {
    async fn webhook_credentials(&self, _secret_id: &str) -> Result<WebhookCredentials> {
        Ok(self.credentials.clone())
    }
}
