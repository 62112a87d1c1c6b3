use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::alarm::AlarmRecord;
use crate::tags::{MetricHistory, MetricPoint, TagLookup};

pub const TAG_ENABLED: &str = "DevOpsAgentEnabled";
pub const TAG_PRIORITY: &str = "DevOpsAgentPriority";
pub const TAG_SERVICE: &str = "DevOpsAgentService";

pub const RECENT_METRIC_LIMIT: usize = 10;

const NAME_PREFIXES: [&str; 3] = ["ApplicationInsights/", "AWS/", "ECS/"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
            Priority::Low => "LOW",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HIGH" => Ok(Priority::High),
            "MEDIUM" => Ok(Priority::Medium),
            "LOW" => Ok(Priority::Low),
            other => Err(format!("unknown priority '{}', expected HIGH, MEDIUM or LOW", other)),
        }
    }
}

impl TryFrom<String> for Priority {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrichedAlarm {
    #[serde(flatten)]
    pub alarm: AlarmRecord,
    pub tags: HashMap<String, String>,
    pub recent_metrics: Vec<MetricPoint>,
    pub webhook_enabled: bool,
    pub priority: Priority,
    pub service_name: String,
}

pub struct Enricher<T: TagLookup, M: MetricHistory> {
    tags: T,
    metrics: M,
    default_priority: Priority,
}

impl<T: TagLookup, M: MetricHistory> Enricher<T, M> {
    pub fn new(tags: T, metrics: M, default_priority: Priority) -> Self {
        Self {
            tags,
            metrics,
            default_priority,
        }
    }

    pub async fn enrich(&self, alarm: AlarmRecord) -> EnrichedAlarm {
        let tags = self.fetch_tags(&alarm).await;
        let recent_metrics = self.fetch_recent_metrics(&alarm).await;

        let webhook_enabled = tags
            .get(TAG_ENABLED)
            .map(|v| !v.trim().eq_ignore_ascii_case("false"))
            .unwrap_or(true);

        let priority = match tags.get(TAG_PRIORITY).map(|v| v.parse::<Priority>()) {
            Some(Ok(priority)) => priority,
            Some(Err(e)) => {
                warn!("Ignoring {} tag on {}: {}", TAG_PRIORITY, alarm.alarm_name, e);
                default_priority(&alarm, self.default_priority)
            }
            None => default_priority(&alarm, self.default_priority),
        };

        let service_name = tags
            .get(TAG_SERVICE)
            .filter(|v| !v.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| service_name(&alarm));

        info!(
            "Enriched alarm {}: priority={} service={} enabled={}",
            alarm.alarm_name, priority, service_name, webhook_enabled
        );

        EnrichedAlarm {
            alarm,
            tags,
            recent_metrics,
            webhook_enabled,
            priority,
            service_name,
        }
    }

    async fn fetch_tags(&self, alarm: &AlarmRecord) -> HashMap<String, String> {
        if alarm.alarm_arn.is_empty() {
            info!("Alarm {} has no ARN, skipping tag lookup", alarm.alarm_name);
            return HashMap::new();
        }

        match self.tags.tags_for(&alarm.alarm_arn).await {
            Ok(tags) => tags,
            Err(e) => {
                warn!("Failed to get alarm tags for {}: {}", alarm.alarm_arn, e);
                HashMap::new()
            }
        }
    }

    async fn fetch_recent_metrics(&self, alarm: &AlarmRecord) -> Vec<MetricPoint> {
        if alarm.namespace.is_empty() || alarm.metric_name.is_empty() {
            return Vec::new();
        }

        match self.metrics.recent_points(alarm).await {
            Ok(points) => newest_first(points),
            Err(e) => {
                warn!("Failed to get recent metrics for {}: {}", alarm.alarm_name, e);
                Vec::new()
            }
        }
    }
}

pub fn newest_first(mut points: Vec<MetricPoint>) -> Vec<MetricPoint> {
    points.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    points.truncate(RECENT_METRIC_LIMIT);
    points
}

pub fn default_priority(alarm: &AlarmRecord, fallback: Priority) -> Priority {
    let metric = alarm.metric_name.as_str();

    match alarm.namespace.as_str() {
        "AWS/RDS" if metric.contains("CPU") => Priority::High,
        "AWS/DynamoDB" if metric.contains("SystemErrors") => Priority::High,
        "AWS/ApplicationELB" if metric.contains("4XX") => Priority::High,
        "AWS/Lambda" if metric.contains("Errors") => Priority::High,
        "AWS/ECS" if metric.contains("CPU") || metric.contains("Memory") => Priority::Medium,
        "AWS/NATGateway" => Priority::Medium,
        "AWS/ApplicationELB" if metric.contains("5XX") => Priority::Medium,
        _ => fallback,
    }
}

pub fn service_name(alarm: &AlarmRecord) -> String {
    let mut name = alarm.alarm_name.clone();
    for prefix in NAME_PREFIXES {
        name = name.replace(prefix, "");
    }

    if name.contains('/') {
        if let Some(first) = name.split('/').next().filter(|s| !s.is_empty()) {
            return first.to_string();
        }
    }

    let dims = &alarm.dimensions;
    if let Some(cluster) = dims.get("ClusterName") {
        return cluster.clone();
    }
    if let Some(db) = dims.get("DBClusterIdentifier") {
        return db.clone();
    }
    if let Some(table) = dims.get("TableName") {
        return table.clone();
    }
    if let Some(lb) = dims.get("LoadBalancer") {
        // app/my-alb/50dc6c495c0c9188
        return lb.rsplit('/').next().unwrap_or(lb).to_string();
    }

    alarm.service_type.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::AlarmFields;
    use crate::error::ForwarderError;
    use crate::tags::{StaticMetrics, StaticTags};
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};
    use std::collections::BTreeMap;

    const ARN: &str = "arn:aws:cloudwatch:us-east-1:123456789012:alarm:high-cpu";

    fn alarm(name: &str, namespace: &str, metric: &str) -> AlarmRecord {
        AlarmRecord::from_fields(AlarmFields {
            alarm_name: Some(name.to_string()),
            alarm_arn: Some(ARN.to_string()),
            namespace: Some(namespace.to_string()),
            metric_name: Some(metric.to_string()),
            ..Default::default()
        })
    }

    fn with_dims(mut record: AlarmRecord, dims: &[(&str, &str)]) -> AlarmRecord {
        record.dimensions = dims
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>();
        record
    }

    struct FailingTags;

    #[async_trait]
    impl TagLookup for FailingTags {
        async fn tags_for(&self, _arn: &str) -> crate::error::Result<HashMap<String, String>> {
            Err(ForwarderError::tag_lookup("access denied"))
        }
    }

    struct FailingMetrics;

    #[async_trait]
    impl MetricHistory for FailingMetrics {
        async fn recent_points(&self, _alarm: &AlarmRecord) -> crate::error::Result<Vec<MetricPoint>> {
            Err(ForwarderError::metric_history("throttled"))
        }
    }

    fn points(count: i64) -> Vec<MetricPoint> {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        (0..count)
            .map(|i| MetricPoint {
                timestamp: start + Duration::minutes(5 * i),
                value: i as f64,
            })
            .collect()
    }

    #[test]
    fn test_priority_rule_table() {
        let cases = [
            ("AWS/RDS", "CPUUtilization", Priority::High),
            ("AWS/DynamoDB", "SystemErrors", Priority::High),
            ("AWS/ApplicationELB", "HTTPCode_ELB_4XX_Count", Priority::High),
            ("AWS/Lambda", "Errors", Priority::High),
            ("AWS/ECS", "CPUUtilization", Priority::Medium),
            ("AWS/ECS", "MemoryUtilization", Priority::Medium),
            ("AWS/NATGateway", "PacketsDropCount", Priority::Medium),
            ("AWS/ApplicationELB", "HTTPCode_Target_5XX_Count", Priority::Medium),
            ("AWS/RDS", "FreeStorageSpace", Priority::Low),
            ("AWS/DynamoDB", "UserErrors", Priority::Low),
            ("AWS/Lambda", "Duration", Priority::Low),
            ("ECS/ContainerInsights", "CpuUtilized", Priority::Low),
            ("AWS/SQS", "ApproximateAgeOfOldestMessage", Priority::Low),
        ];

        for (namespace, metric, expected) in cases {
            let record = alarm("a", namespace, metric);
            assert_eq!(
                default_priority(&record, Priority::Low),
                expected,
                "{}/{}",
                namespace,
                metric
            );
        }
    }

    #[test]
    fn test_priority_falls_back_to_configured_default() {
        let record = alarm("a", "AWS/SQS", "NumberOfMessagesSent");
        assert_eq!(default_priority(&record, Priority::Medium), Priority::Medium);
        assert_eq!(default_priority(&record, Priority::High), Priority::High);
    }

    #[test]
    fn test_priority_from_str() {
        assert_eq!("high".parse::<Priority>(), Ok(Priority::High));
        assert_eq!(" Medium ".parse::<Priority>(), Ok(Priority::Medium));
        assert_eq!("LOW".parse::<Priority>(), Ok(Priority::Low));
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn test_priority_deserializes_any_case() -> serde_json::Result<()> {
        let parsed: Vec<Priority> = serde_json::from_str(r#"["high", "Medium", "LOW"]"#)?;
        assert_eq!(parsed, vec![Priority::High, Priority::Medium, Priority::Low]);
        assert!(serde_json::from_str::<Priority>(r#""urgent""#).is_err());
        assert_eq!(serde_json::to_string(&Priority::Medium)?, r#""MEDIUM""#);
        Ok(())
    }

    #[test]
    fn test_newest_first_sorts_and_truncates() {
        let mut shuffled = points(14);
        shuffled.swap(0, 13);
        shuffled.swap(3, 7);

        let recent = newest_first(shuffled);
        assert_eq!(recent.len(), RECENT_METRIC_LIMIT);
        let values: Vec<f64> = recent.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![13.0, 12.0, 11.0, 10.0, 9.0, 8.0, 7.0, 6.0, 5.0, 4.0]);
    }

    #[test]
    fn test_service_name_from_alarm_name() {
        assert_eq!(service_name(&alarm("checkout/high-latency", "AWS/ApplicationELB", "TargetResponseTime")), "checkout");
        assert_eq!(service_name(&alarm("ApplicationInsights/payments/cpu", "AWS/EC2", "CPUUtilization")), "payments");
        assert_eq!(service_name(&alarm("AWS/ECS/orders/memory", "AWS/ECS", "MemoryUtilization")), "orders");
    }

    #[test]
    fn test_service_name_from_dimensions() {
        let record = with_dims(
            alarm("ddb-throttles", "AWS/DynamoDB", "ThrottledRequests"),
            &[("TableName", "orders"), ("DBClusterIdentifier", "orders-db")],
        );
        assert_eq!(service_name(&record), "orders-db");

        let record = with_dims(
            alarm("alb-5xx", "AWS/ApplicationELB", "HTTPCode_ELB_5XX_Count"),
            &[("LoadBalancer", "app/web-alb/50dc6c495c0c9188")],
        );
        assert_eq!(service_name(&record), "50dc6c495c0c9188");

        let record = with_dims(
            alarm("ecs-cpu", "AWS/ECS", "CPUUtilization"),
            &[("ClusterName", "prod"), ("ServiceName", "api")],
        );
        assert_eq!(service_name(&record), "prod");
    }

    #[test]
    fn test_service_name_falls_back_to_service_type() {
        assert_eq!(service_name(&alarm("high-cpu", "AWS/RDS", "CPUUtilization")), "RDS");
        assert_eq!(service_name(&alarm("/leading-slash", "AWS/NATGateway", "ErrorPortAllocation")), "NAT Gateway");
    }

    #[tokio::test]
    async fn test_enrich_without_tags() {
        let enricher = Enricher::new(StaticTags::default(), StaticMetrics::default(), Priority::Medium);
        let enriched = enricher.enrich(alarm("high-cpu", "AWS/RDS", "CPUUtilization")).await;

        assert!(enriched.webhook_enabled);
        assert!(enriched.tags.is_empty());
        assert_eq!(enriched.priority, Priority::High);
        assert_eq!(enriched.service_name, "RDS");
    }

    #[tokio::test]
    async fn test_enrich_with_override_tags() {
        let tags = StaticTags::default()
            .with_tag(ARN, TAG_PRIORITY, "low")
            .with_tag(ARN, TAG_SERVICE, "billing")
            .with_tag(ARN, TAG_ENABLED, "TRUE");
        let enricher = Enricher::new(tags, StaticMetrics::default(), Priority::Medium);
        let enriched = enricher.enrich(alarm("high-cpu", "AWS/RDS", "CPUUtilization")).await;

        assert!(enriched.webhook_enabled);
        assert_eq!(enriched.priority, Priority::Low);
        assert_eq!(enriched.service_name, "billing");
        assert_eq!(enriched.tags.len(), 3);
    }

    #[tokio::test]
    async fn test_enrich_disabled_tag() {
        let tags = StaticTags::default().with_tag(ARN, TAG_ENABLED, "False");
        let enricher = Enricher::new(tags, StaticMetrics::default(), Priority::Medium);
        let enriched = enricher.enrich(alarm("high-cpu", "AWS/RDS", "CPUUtilization")).await;

        assert!(!enriched.webhook_enabled);
    }

    #[tokio::test]
    async fn test_enrich_invalid_priority_tag_uses_rules() {
        let tags = StaticTags::default().with_tag(ARN, TAG_PRIORITY, "P1");
        let enricher = Enricher::new(tags, StaticMetrics::default(), Priority::Low);
        let enriched = enricher.enrich(alarm("x", "AWS/NATGateway", "ErrorPortAllocation")).await;

        assert_eq!(enriched.priority, Priority::Medium);
    }

    #[tokio::test]
    async fn test_enrich_survives_tag_lookup_failure() {
        let enricher = Enricher::new(FailingTags, StaticMetrics::default(), Priority::Low);
        let enriched = enricher.enrich(alarm("orders/cpu", "AWS/ECS", "CPUUtilization")).await;

        assert!(enriched.webhook_enabled);
        assert!(enriched.tags.is_empty());
        assert_eq!(enriched.priority, Priority::Medium);
        assert_eq!(enriched.service_name, "orders");
    }

    #[tokio::test]
    async fn test_enrich_skips_lookup_without_arn() {
        let mut record = alarm("high-cpu", "AWS/RDS", "CPUUtilization");
        record.alarm_arn.clear();

        let enricher = Enricher::new(FailingTags, StaticMetrics::default(), Priority::Low);
        let enriched = enricher.enrich(record).await;

        assert!(enriched.tags.is_empty());
        assert!(enriched.webhook_enabled);
        assert_eq!(enriched.priority, Priority::High);
    }

    #[tokio::test]
    async fn test_enrich_attaches_recent_metrics() {
        let enricher = Enricher::new(StaticTags::default(), StaticMetrics::new(points(3)), Priority::Low);
        let enriched = enricher.enrich(alarm("high-cpu", "AWS/RDS", "CPUUtilization")).await;

        let values: Vec<f64> = enriched.recent_metrics.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![2.0, 1.0, 0.0]);
    }

    #[tokio::test]
    async fn test_enrich_survives_metric_history_failure() {
        let tags = StaticTags::default().with_tag(ARN, TAG_SERVICE, "billing");
        let enricher = Enricher::new(tags, FailingMetrics, Priority::Low);
        let enriched = enricher.enrich(alarm("high-cpu", "AWS/RDS", "CPUUtilization")).await;

        assert!(enriched.recent_metrics.is_empty());
        assert!(enriched.webhook_enabled);
        assert_eq!(enriched.priority, Priority::High);
        assert_eq!(enriched.service_name, "billing");
    }

    #[tokio::test]
    async fn test_enrich_skips_history_without_metric() {
        let enricher = Enricher::new(StaticTags::default(), StaticMetrics::new(points(2)), Priority::Low);
        let enriched = enricher.enrich(alarm("composite", "", "")).await;

        assert!(enriched.recent_metrics.is_empty());
    }
}
