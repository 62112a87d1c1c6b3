use chrono::Utc;
use log::{debug, error, info};
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::payload::{Deployment, IncidentPayload};
use super::signer::{event_timestamp, sign, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use crate::config::ForwarderConfig;
use crate::enricher::EnrichedAlarm;
use crate::error::{ForwarderError, Result};
use crate::secrets::{SecretStore, WebhookCredentials};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryReceipt {
    pub status_code: u16,
    pub body: String,
}

#[derive(Debug, Clone)]
pub enum Delivery {
    Sent(DeliveryReceipt),
    DryRun(IncidentPayload),
}

pub struct WebhookClient<S: SecretStore> {
    http: reqwest::Client,
    secrets: S,
    secret_id: String,
    deployment: Deployment,
    dry_run: bool,
}

impl<S: SecretStore> WebhookClient<S> {
    pub fn new(config: &ForwarderConfig, secrets: S) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            secrets,
            secret_id: config.secret_id.clone(),
            deployment: config.deployment(),
            dry_run: config.dry_run,
        })
    }

    pub async fn deliver(&self, enriched: &EnrichedAlarm) -> Result<Delivery> {
        let payload = IncidentPayload::from_enriched(enriched, &self.deployment);
        let body = payload.to_body()?;

        if self.dry_run {
            info!(
                "DRY RUN: not sending incident {} (priority {})",
                payload.incident_id, payload.priority
            );
            debug!("DRY RUN payload: {}", body);
            return Ok(Delivery::DryRun(payload));
        }

        let credentials = self
            .secrets
            .webhook_credentials(&self.secret_id)
            .await
            .map_err(|e| {
                error!("Failed to get webhook credentials: {}", e);
                e
            })?;

        let timestamp = event_timestamp(Utc::now());
        let receipt = self.post(&credentials, &timestamp, body).await?;
        Ok(Delivery::Sent(receipt))
    }

    async fn post(
        &self,
        credentials: &WebhookCredentials,
        timestamp: &str,
        body: String,
    ) -> Result<DeliveryReceipt> {
        let signature = sign(&credentials.secret, timestamp, &body)?;

        let response = self
            .http
            .post(&credentials.url)
            .header(CONTENT_TYPE, "application/json")
            .header(TIMESTAMP_HEADER, timestamp)
            .header(SIGNATURE_HEADER, signature)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                error!("Webhook transport error: {}", e);
                ForwarderError::Transport(e)
            })?;

        let status = response.status();
        let body = response.text().await?;
        info!("Webhook response: {}", status.as_u16());

        if !status.is_success() {
            error!("HTTP error: {} - {}", status.as_u16(), body);
            return Err(ForwarderError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(DeliveryReceipt {
            status_code: status.as_u16(),
            body,
        })
    }
}
