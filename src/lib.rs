pub mod alarm;
pub mod config;
pub mod enricher;
pub mod error;
pub mod handler;
pub mod parser;
pub mod secrets;
pub mod tags;
pub mod webhook;

pub use alarm::AlarmRecord;
pub use config::ForwarderConfig;
pub use enricher::{EnrichedAlarm, Enricher, Priority};
pub use error::{ForwarderError, Result};
pub use handler::{Forwarder, HandlerResponse, RecordResult, RecordStatus};
pub use secrets::{SecretStore, SecretsManagerStore, StaticSecret};
pub use tags::{
    CloudWatchMetrics, CloudWatchTags, MetricHistory, MetricPoint, StaticMetrics, StaticTags, TagLookup,
};
pub use webhook::{IncidentPayload, WebhookClient};
