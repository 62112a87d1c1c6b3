use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::collections::HashMap;
use std::path::PathBuf;

use alarm_forwarder::{Forwarder, ForwarderConfig, Priority, StaticMetrics, StaticSecret, StaticTags};

#[derive(Parser)]
#[command(name = "alarm-replay")]
#[command(about = "Run a saved SNS or EventBridge alarm event through the forwarder locally")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Path to the event JSON (SNS batch or EventBridge state change)
    #[arg(short, long)]
    event: PathBuf,

    /// Alarm tag applied to every alarm, e.g. DevOpsAgentPriority=HIGH
    #[arg(short, long = "tag", value_parser = parse_tag)]
    tags: Vec<(String, String)>,

    /// Webhook URL (without it the replay is always a dry run)
    #[arg(short = 'u', long)]
    webhook_url: Option<String>,

    /// Shared HMAC secret for the webhook
    #[arg(short = 's', long, default_value = "")]
    webhook_secret: String,

    /// Default priority (overrides config file)
    #[arg(short = 'p', long)]
    default_priority: Option<Priority>,

    /// Build payloads but do not send them
    #[arg(short, long)]
    dry_run: bool,

    /// Pretty print the response
    #[arg(long)]
    pretty: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_tag(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env().filter_level(level).init();

    info!("🚀 Starting alarm replay");
    info!("Event file: {:?}", args.event);

    let mut config = if args.config.exists() {
        let config = ForwarderConfig::from_file(&args.config)?;
        info!("✅ Loaded configuration from {:?}", args.config);
        config
    } else {
        warn!("No config at {:?}, using default configuration", args.config);
        ForwarderConfig::default()
    };

    if let Some(priority) = args.default_priority {
        config.default_priority = priority;
    }
    if args.dry_run {
        config.dry_run = true;
    }
    let url = match args.webhook_url {
        Some(url) => url,
        None => {
            if !config.dry_run {
                warn!("No --webhook-url given, switching to dry run");
            }
            config.dry_run = true;
            String::new()
        }
    };

    let tags: HashMap<String, String> = args.tags.into_iter().collect();
    info!("🏷️  Tags: {:?}", tags);

    let forwarder = Forwarder::new(
        &config,
        StaticTags::for_any_arn(tags),
        StaticMetrics::default(),
        StaticSecret::new(url, args.webhook_secret),
    )?;

    let raw = tokio::fs::read_to_string(&args.event)
        .await
        .with_context(|| format!("reading {:?}", args.event))?;
    let event: serde_json::Value = serde_json::from_str(&raw).context("event file is not JSON")?;

    let response = forwarder.handle_event(&event).await;

    if args.pretty {
        let body: serde_json::Value =
            serde_json::from_str(&response.body).unwrap_or(serde_json::Value::String(response.body.clone()));
        let printable = serde_json::json!({ "statusCode": response.status_code, "body": body });
        println!("{}", serde_json::to_string_pretty(&printable)?);
    } else {
        println!("{}", serde_json::to_string(&response)?);
    }

    info!("🎉 Replay finished with status {}", response.status_code);
    Ok(())
}
