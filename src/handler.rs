use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::alarm::AlarmRecord;
use crate::config::ForwarderConfig;
use crate::enricher::Enricher;
use crate::error::Result;
use crate::parser::{message_from_sns_record, parse_alarm_message, parse_state_change};
use crate::secrets::SecretStore;
use crate::tags::{MetricHistory, TagLookup};
use crate::webhook::{Delivery, DeliveryReceipt, IncidentPayload, WebhookClient};

pub const STATE_CHANGE_DETAIL_TYPE: &str = "CloudWatch Alarm State Change";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventShape {
    SnsBatch,
    StateChange,
    Unrecognized,
}

pub fn classify(event: &Value) -> EventShape {
    if event.get("Records").is_some_and(Value::is_array) {
        EventShape::SnsBatch
    } else if event.get("detail-type").and_then(Value::as_str) == Some(STATE_CHANGE_DETAIL_TYPE) {
        EventShape::StateChange
    } else {
        EventShape::Unrecognized
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Success,
    Skipped,
    DryRun,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordResult {
    pub alarm_name: String,
    pub status: RecordStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_response: Option<DeliveryReceipt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<IncidentPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecordResult {
    fn new(alarm_name: String, status: RecordStatus) -> Self {
        Self {
            alarm_name,
            status,
            webhook_response: None,
            payload: None,
            error: None,
        }
    }

    fn failed(alarm_name: String, error: impl ToString) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::new(alarm_name, RecordStatus::Error)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchSummary {
    pub processed: usize,
    pub results: Vec<RecordResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HandlerResponse {
    pub status_code: u16,
    pub body: String,
}

impl HandlerResponse {
    fn ok(summary: &BatchSummary) -> Self {
        let body = serde_json::to_string(summary)
            .unwrap_or_else(|e| json!({ "error": e.to_string() }).to_string());
        Self {
            status_code: 200,
            body,
        }
    }

    fn client_error(message: &str) -> Self {
        Self {
            status_code: 400,
            body: json!({ "error": message }).to_string(),
        }
    }

    pub fn summary(&self) -> serde_json::Result<BatchSummary> {
        serde_json::from_str(&self.body)
    }
}

pub struct Forwarder<T: TagLookup, M: MetricHistory, S: SecretStore> {
    enricher: Enricher<T, M>,
    client: WebhookClient<S>,
}

impl<T: TagLookup, M: MetricHistory, S: SecretStore> Forwarder<T, M, S> {
    pub fn new(config: &ForwarderConfig, tags: T, metrics: M, secrets: S) -> Result<Self> {
        Ok(Self {
            enricher: Enricher::new(tags, metrics, config.default_priority),
            client: WebhookClient::new(config, secrets)?,
        })
    }

    pub async fn handle_event(&self, event: &Value) -> HandlerResponse {
        let mut results = Vec::new();

        match classify(event) {
            EventShape::SnsBatch => {
                let records = event["Records"].as_array().map(Vec::as_slice).unwrap_or_default();
                info!("Processing {} SNS records", records.len());
                for record in records {
                    results.push(self.process_sns_record(record).await);
                }
            }
            EventShape::StateChange => {
                info!("Processing EventBridge alarm state change");
                results.push(self.process_state_change(event).await);
            }
            EventShape::Unrecognized => {
                warn!("Unrecognized event shape, ignoring event");
                return HandlerResponse::client_error(
                    "unrecognized event: expected SNS Records or a CloudWatch Alarm State Change event",
                );
            }
        }

        let summary = BatchSummary {
            processed: results.len(),
            results,
        };
        HandlerResponse::ok(&summary)
    }

    async fn process_sns_record(&self, record: &Value) -> RecordResult {
        let message = match message_from_sns_record(record) {
            Ok(message) => message,
            Err(e) => {
                error!("Error processing record: {}", e);
                return RecordResult::failed("unknown".to_string(), e);
            }
        };

        let name = name_hint(message.get("AlarmName"));
        info!("Processing alarm: {}", name);

        match parse_alarm_message(&message) {
            Ok(alarm) => self.forward(alarm).await,
            Err(e) => {
                error!("Error parsing alarm {}: {}", name, e);
                RecordResult::failed(name, e)
            }
        }
    }

    async fn process_state_change(&self, event: &Value) -> RecordResult {
        let name = name_hint(event.pointer("/detail/alarmName"));

        match parse_state_change(event) {
            Ok(alarm) => self.forward(alarm).await,
            Err(e) => {
                error!("Error parsing alarm {}: {}", name, e);
                RecordResult::failed(name, e)
            }
        }
    }

    pub async fn forward(&self, alarm: AlarmRecord) -> RecordResult {
        let name = alarm.alarm_name.clone();
        let enriched = self.enricher.enrich(alarm).await;

        if !enriched.webhook_enabled {
            info!("Webhook disabled for alarm: {}", name);
            return RecordResult::new(name, RecordStatus::Skipped);
        }

        match self.client.deliver(&enriched).await {
            Ok(Delivery::Sent(receipt)) => {
                info!("Successfully processed alarm: {}", name);
                RecordResult {
                    webhook_response: Some(receipt),
                    ..RecordResult::new(name, RecordStatus::Success)
                }
            }
            Ok(Delivery::DryRun(payload)) => RecordResult {
                payload: Some(payload),
                ..RecordResult::new(name, RecordStatus::DryRun)
            },
            Err(e) => {
                error!("Error delivering alarm {}: {}", name, e);
                RecordResult::failed(name, e)
            }
        }
    }
}

fn name_hint(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string()
}
