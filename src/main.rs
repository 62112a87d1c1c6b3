use aws_config::BehaviorVersion;
use lambda_runtime::{service_fn, LambdaEvent};
use log::{info, LevelFilter};
use serde_json::Value;

use alarm_forwarder::{
    CloudWatchMetrics, CloudWatchTags, Forwarder, ForwarderConfig, HandlerResponse, SecretsManagerStore,
};

type LambdaForwarder = Forwarder<CloudWatchTags, CloudWatchMetrics, SecretsManagerStore>;

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    let mut logger = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(level) = std::env::var("LOG_LEVEL").ok().and_then(|l| l.parse::<LevelFilter>().ok()) {
        logger.filter_level(level);
    }
    logger.format_timestamp_millis().init();

    let config = ForwarderConfig::from_env()?;
    info!(
        "Starting alarm forwarder (dry_run={}, default_priority={}, deployment={:?})",
        config.dry_run, config.default_priority, config.deployment_name
    );

    let sdk_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
    let forwarder = Forwarder::new(
        &config,
        CloudWatchTags::new(&sdk_config),
        CloudWatchMetrics::new(&sdk_config),
        SecretsManagerStore::new(&sdk_config),
    )?;

    let forwarder = &forwarder;
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle(forwarder, event).await
    }))
    .await
}

async fn handle(
    forwarder: &LambdaForwarder,
    event: LambdaEvent<Value>,
) -> Result<HandlerResponse, lambda_runtime::Error> {
    info!("Invocation {}", event.context.request_id);
    Ok(forwarder.handle_event(&event.payload).await)
}
