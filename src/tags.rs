use async_trait::async_trait;
use aws_sdk_cloudwatch::Client as CloudWatchClient;
use aws_sdk_cloudwatch::primitives::DateTime as AwsDateTime;
use aws_sdk_cloudwatch::types::{Datapoint, Dimension, Statistic};
use chrono::{DateTime, Duration, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::alarm::AlarmRecord;
use crate::error::{ForwarderError, Result};

const HISTORY_WINDOW_HOURS: i64 = 1;

#[async_trait]
pub trait TagLookup: Send + Sync {
    async fn tags_for(&self, arn: &str) -> Result<HashMap<String, String>>;
}

pub struct CloudWatchTags {
    client: CloudWatchClient,
}

impl CloudWatchTags {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: CloudWatchClient::new(config),
        }
    }
}

#[async_trait]
impl TagLookup for CloudWatchTags {
    async fn tags_for(&self, arn: &str) -> Result<HashMap<String, String>> {
        let response = self
            .client
            .list_tags_for_resource()
            .resource_arn(arn)
            .send()
            .await
            .map_err(|e| ForwarderError::tag_lookup(e.to_string()))?;

        let tags: HashMap<String, String> = response
            .tags()
            .iter()
            .map(|tag| (tag.key().to_string(), tag.value().to_string()))
            .collect();

        debug!("Found {} tags on {}", tags.len(), arn);
        Ok(tags)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticTags {
    tags: HashMap<String, HashMap<String, String>>,
}

impl StaticTags {
    pub fn with_tag(mut self, arn: &str, key: &str, value: &str) -> Self {
        self.tags
            .entry(arn.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn for_any_arn(tags: HashMap<String, String>) -> Self {
        let mut lookup = HashMap::new();
        lookup.insert(String::new(), tags);
        Self { tags: lookup }
    }
}

#[async_trait]
impl TagLookup for StaticTags {
    async fn tags_for(&self, arn: &str) -> Result<HashMap<String, String>> {
        Ok(self
            .tags
            .get(arn)
            .or_else(|| self.tags.get(""))
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

#[async_trait]
pub trait MetricHistory: Send + Sync {
    async fn recent_points(&self, alarm: &AlarmRecord) -> Result<Vec<MetricPoint>>;
}

pub struct CloudWatchMetrics {
    client: CloudWatchClient,
}

impl CloudWatchMetrics {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: CloudWatchClient::new(config),
        }
    }
}

#[async_trait]
impl MetricHistory for CloudWatchMetrics {
    async fn recent_points(&self, alarm: &AlarmRecord) -> Result<Vec<MetricPoint>> {
        if alarm.statistic.is_empty() {
            return Err(ForwarderError::metric_history(format!(
                "alarm {} has no statistic",
                alarm.alarm_name
            )));
        }
        let period = i32::try_from(alarm.period)
            .map_err(|_| ForwarderError::metric_history(format!("period {} out of range", alarm.period)))?;

        let end = Utc::now();
        let start = end - Duration::hours(HISTORY_WINDOW_HOURS);

        let mut request = self
            .client
            .get_metric_statistics()
            .namespace(&alarm.namespace)
            .metric_name(&alarm.metric_name)
            .start_time(AwsDateTime::from_secs(start.timestamp()))
            .end_time(AwsDateTime::from_secs(end.timestamp()))
            .period(period)
            .statistics(Statistic::from(alarm.statistic.as_str()));

        for (name, value) in &alarm.dimensions {
            let dimension = Dimension::builder()
                .name(name)
                .value(value)
                .build()
                .map_err(|e| ForwarderError::metric_history(e.to_string()))?;
            request = request.dimensions(dimension);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ForwarderError::metric_history(e.to_string()))?;

        let points: Vec<MetricPoint> = response
            .datapoints()
            .iter()
            .filter_map(|dp| {
                let ts = dp.timestamp()?;
                Some(MetricPoint {
                    timestamp: DateTime::from_timestamp(ts.secs(), ts.subsec_nanos())?,
                    value: statistic_value(dp, &alarm.statistic),
                })
            })
            .collect();

        debug!(
            "Found {} datapoints for {}",
            points.len(),
            alarm.metric_path()
        );
        Ok(points)
    }
}

fn statistic_value(dp: &Datapoint, statistic: &str) -> f64 {
    let value = match statistic {
        "Average" => dp.average(),
        "Sum" => dp.sum(),
        "Minimum" => dp.minimum(),
        "Maximum" => dp.maximum(),
        "SampleCount" => dp.sample_count(),
        _ => None,
    };
    value.unwrap_or(0.0)
}

#[derive(Debug, Clone, Default)]
pub struct StaticMetrics {
    points: Vec<MetricPoint>,
}

impl StaticMetrics {
    pub fn new(points: Vec<MetricPoint>) -> Self {
        Self { points }
    }
}

#[async_trait]
impl MetricHistory for StaticMetrics {
    async fn recent_points(&self, _alarm: &AlarmRecord) -> Result<Vec<MetricPoint>> {
        Ok(self.points.clone())
    }
}
