use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::enricher::{EnrichedAlarm, Priority};
use crate::tags::MetricPoint;

const DESCRIBED_METRIC_POINTS: usize = 5;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Deployment {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IncidentPayload {
    pub event_type: String,
    pub incident_id: String,
    pub action: String,
    pub priority: Priority,
    pub title: String,
    pub description: String,
    pub timestamp: String,
    pub service: String,
    pub data: IncidentData,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct IncidentData {
    pub metadata: IncidentMetadata,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct IncidentMetadata {
    pub region: String,
    pub account_id: String,
    pub alarm_name: String,
    pub alarm_arn: String,
    pub service_type: String,
    pub metric_name: String,
    pub namespace: String,
    pub dimensions: BTreeMap<String, String>,
    pub threshold: Option<f64>,
    pub state: String,
    pub previous_state: String,
    #[serde(default)]
    pub recent_metrics: Vec<MetricPoint>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub deployment_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub deployment_description: String,
}

impl IncidentPayload {
    pub fn from_enriched(enriched: &EnrichedAlarm, deployment: &Deployment) -> Self {
        let alarm = &enriched.alarm;

        Self {
            event_type: "incident".to_string(),
            incident_id: alarm.incident_id(),
            action: "created".to_string(),
            priority: enriched.priority,
            title: format!("{} - {} Alert", enriched.service_name, alarm.metric_name),
            description: describe(enriched),
            timestamp: alarm.timestamp.clone(),
            service: enriched.service_name.clone(),
            data: IncidentData {
                metadata: IncidentMetadata {
                    region: alarm.region.clone(),
                    account_id: alarm.account_id.clone(),
                    alarm_name: alarm.alarm_name.clone(),
                    alarm_arn: alarm.alarm_arn.clone(),
                    service_type: alarm.service_type.clone(),
                    metric_name: alarm.metric_name.clone(),
                    namespace: alarm.namespace.clone(),
                    dimensions: alarm.dimensions.clone(),
                    threshold: alarm.threshold,
                    state: alarm.state.clone(),
                    previous_state: alarm.previous_state.clone(),
                    recent_metrics: enriched.recent_metrics.clone(),
                    deployment_name: deployment.name.clone(),
                    deployment_description: deployment.description.clone(),
                },
            },
        }
    }

    pub fn to_body(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

fn describe(enriched: &EnrichedAlarm) -> String {
    let alarm = &enriched.alarm;

    let mut lines = vec![
        format!(
            "CloudWatch alarm {} changed from {} to {}",
            alarm.alarm_name, alarm.previous_state, alarm.state
        ),
        format!("Account: {}", alarm.account_id),
        format!("Region: {}", alarm.region),
        format!("Metric: {}", alarm.metric_path()),
    ];

    if !alarm.dimensions.is_empty() {
        lines.push(format!("Dimensions: {}", alarm.formatted_dimensions()));
    }
    if !alarm.reason.is_empty() {
        lines.push(format!("Reason: {}", alarm.reason));
    }
    if let Some(threshold) = alarm.threshold {
        if alarm.comparison_operator.is_empty() {
            lines.push(format!("Threshold: {}", threshold));
        } else {
            lines.push(format!("Threshold: {} {}", alarm.comparison_operator, threshold));
        }
    }

    if !enriched.recent_metrics.is_empty() {
        lines.push(String::new());
        lines.push("Recent metric values:".to_string());
        for point in enriched.recent_metrics.iter().take(DESCRIBED_METRIC_POINTS) {
            lines.push(format!(
                "- {}: {}",
                point.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
                point.value
            ));
        }
    }

    lines.join("\n")
}
