use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct AlarmRecord {
    pub alarm_name: String,
    pub alarm_arn: String,
    pub alarm_description: String,
    pub state: String,
    pub previous_state: String,
    pub reason: String,
    pub timestamp: String,
    pub region: String,
    pub account_id: String,
    pub metric_name: String,
    pub namespace: String,
    pub dimensions: BTreeMap<String, String>,
    pub service_type: String,
    pub threshold: Option<f64>,
    pub comparison_operator: String,
    pub statistic: String,
    pub period: u64,
    pub evaluation_periods: u64,
}

/// Raw values pulled out of a notification before defaults are applied.
#[derive(Debug, Default, Clone)]
pub struct AlarmFields {
    pub alarm_name: Option<String>,
    pub alarm_arn: Option<String>,
    pub alarm_description: Option<String>,
    pub state: Option<String>,
    pub previous_state: Option<String>,
    pub reason: Option<String>,
    pub timestamp: Option<String>,
    pub region: Option<String>,
    pub account_id: Option<String>,
    pub metric_name: Option<String>,
    pub namespace: Option<String>,
    pub dimensions: BTreeMap<String, String>,
    pub threshold: Option<f64>,
    pub comparison_operator: Option<String>,
    pub statistic: Option<String>,
    pub period: Option<u64>,
    pub evaluation_periods: Option<u64>,
}

pub const DEFAULT_PERIOD_SECS: u64 = 300;
pub const DEFAULT_EVALUATION_PERIODS: u64 = 1;

impl AlarmRecord {
    pub fn from_fields(fields: AlarmFields) -> Self {
        let alarm_arn = fields.alarm_arn.unwrap_or_default();
        let namespace = fields.namespace.unwrap_or_default();
        let region = fields
            .region
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| region_from_arn(&alarm_arn));

        Self {
            alarm_name: fields.alarm_name.unwrap_or_else(|| "Unknown".to_string()),
            alarm_description: fields.alarm_description.unwrap_or_default(),
            state: fields.state.unwrap_or_else(|| "UNKNOWN".to_string()),
            previous_state: fields.previous_state.unwrap_or_else(|| "UNKNOWN".to_string()),
            reason: fields.reason.unwrap_or_default(),
            timestamp: fields
                .timestamp
                .unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
            region,
            account_id: fields.account_id.unwrap_or_default(),
            metric_name: fields.metric_name.unwrap_or_default(),
            service_type: service_type(&namespace),
            namespace,
            dimensions: fields.dimensions,
            threshold: fields.threshold,
            comparison_operator: fields.comparison_operator.unwrap_or_default(),
            statistic: fields.statistic.unwrap_or_default(),
            period: fields.period.unwrap_or(DEFAULT_PERIOD_SECS),
            evaluation_periods: fields.evaluation_periods.unwrap_or(DEFAULT_EVALUATION_PERIODS),
            alarm_arn,
        }
    }

    pub fn incident_id(&self) -> String {
        format!("{}-{}", self.alarm_name, self.timestamp)
    }

    pub fn metric_path(&self) -> String {
        format!("{}/{}", self.namespace, self.metric_name)
    }

    pub fn formatted_dimensions(&self) -> String {
        self.dimensions
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn summary(&self) -> String {
        format!("{} | {} | {}", self.alarm_name, self.metric_path(), self.state)
    }
}

pub fn service_type(namespace: &str) -> String {
    match namespace {
        "AWS/ECS" | "ECS/ContainerInsights" => "ECS".to_string(),
        "AWS/RDS" => "RDS".to_string(),
        "AWS/DynamoDB" => "DynamoDB".to_string(),
        "AWS/ApplicationELB" => "ALB".to_string(),
        "AWS/NATGateway" => "NAT Gateway".to_string(),
        other => other.strip_prefix("AWS/").unwrap_or(other).to_string(),
    }
}

// arn:partition:service:region:account:resource
fn region_from_arn(arn: &str) -> String {
    arn.split(':')
        .nth(3)
        .filter(|r| !r.is_empty())
        .unwrap_or("unknown")
        .to_string()
}
