use log::info;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::alarm::{AlarmFields, AlarmRecord};
use crate::error::{ForwarderError, Result};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct AlarmMessage {
    alarm_name: Option<String>,
    alarm_arn: Option<String>,
    alarm_description: Option<String>,
    new_state_value: Option<String>,
    old_state_value: Option<String>,
    new_state_reason: Option<String>,
    state_change_time: Option<String>,
    region: Option<String>,
    #[serde(rename = "AWSAccountId")]
    aws_account_id: Option<String>,
    trigger: Option<Trigger>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct Trigger {
    metric_name: Option<String>,
    namespace: Option<String>,
    dimensions: Option<Vec<TriggerDimension>>,
    threshold: Option<f64>,
    comparison_operator: Option<String>,
    statistic: Option<String>,
    period: Option<u64>,
    evaluation_periods: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TriggerDimension {
    name: String,
    value: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StateChangeEvent {
    account: Option<String>,
    region: Option<String>,
    time: Option<String>,
    resources: Vec<String>,
    detail: Option<StateChangeDetail>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StateChangeDetail {
    alarm_name: Option<String>,
    state: Option<AlarmState>,
    previous_state: Option<AlarmState>,
    configuration: Option<AlarmConfiguration>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AlarmState {
    value: Option<String>,
    reason: Option<String>,
    timestamp: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AlarmConfiguration {
    description: Option<String>,
    metrics: Vec<MetricDataQuery>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct MetricDataQuery {
    metric_stat: Option<MetricStat>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MetricStat {
    metric: Option<Metric>,
    period: Option<u64>,
    stat: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Metric {
    namespace: Option<String>,
    name: Option<String>,
    dimensions: BTreeMap<String, String>,
}

pub fn parse_alarm_message(message: &Value) -> Result<AlarmRecord> {
    if !message.is_object() {
        return Err(ForwarderError::malformed("alarm message is not a JSON object"));
    }

    let message: AlarmMessage = serde_json::from_value(message.clone())
        .map_err(|e| ForwarderError::malformed(format!("invalid alarm message: {}", e)))?;
    let trigger = message.trigger.unwrap_or_default();

    let mut dimensions = BTreeMap::new();
    for dim in trigger.dimensions.unwrap_or_default() {
        dimensions.insert(dim.name, dim.value);
    }

    let record = AlarmRecord::from_fields(AlarmFields {
        alarm_name: message.alarm_name,
        alarm_arn: message.alarm_arn,
        alarm_description: message.alarm_description,
        state: message.new_state_value,
        previous_state: message.old_state_value,
        reason: message.new_state_reason,
        timestamp: message.state_change_time,
        region: message.region,
        account_id: message.aws_account_id,
        metric_name: trigger.metric_name,
        namespace: trigger.namespace,
        dimensions,
        threshold: trigger.threshold,
        comparison_operator: trigger.comparison_operator,
        statistic: trigger.statistic,
        period: trigger.period,
        evaluation_periods: trigger.evaluation_periods,
    });

    info!("Parsed alarm: {}", record.summary());
    Ok(record)
}

pub fn parse_state_change(event: &Value) -> Result<AlarmRecord> {
    if !event.is_object() {
        return Err(ForwarderError::malformed("state change event is not a JSON object"));
    }

    let event: StateChangeEvent = serde_json::from_value(event.clone())
        .map_err(|e| ForwarderError::malformed(format!("invalid state change event: {}", e)))?;
    let detail = event.detail.ok_or(ForwarderError::MissingField("detail"))?;
    let state = detail.state.unwrap_or_default();
    let configuration = detail.configuration.unwrap_or_default();

    // first plain metric; math expressions have no metricStat
    let metric_stat = configuration
        .metrics
        .into_iter()
        .find_map(|query| query.metric_stat)
        .unwrap_or_default();
    let metric = metric_stat.metric.unwrap_or_default();

    let record = AlarmRecord::from_fields(AlarmFields {
        alarm_name: detail.alarm_name,
        alarm_arn: event.resources.into_iter().next(),
        alarm_description: configuration.description,
        state: state.value,
        previous_state: detail.previous_state.and_then(|s| s.value),
        reason: state.reason,
        timestamp: state.timestamp.or(event.time),
        region: event.region,
        account_id: event.account,
        metric_name: metric.name,
        namespace: metric.namespace,
        dimensions: metric.dimensions,
        threshold: None,
        comparison_operator: None,
        statistic: metric_stat.stat,
        period: metric_stat.period,
        evaluation_periods: None,
    });

    info!("Parsed alarm: {}", record.summary());
    Ok(record)
}

pub fn message_from_sns_record(record: &Value) -> Result<Value> {
    let raw = record
        .get("Sns")
        .and_then(|sns| sns.get("Message"))
        .and_then(Value::as_str)
        .ok_or(ForwarderError::MissingField("Sns.Message"))?;

    let message: Value = serde_json::from_str(raw)
        .map_err(|e| ForwarderError::malformed(format!("SNS message is not JSON: {}", e)))?;
    Ok(message)
}
