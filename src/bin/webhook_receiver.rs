use anyhow::Result;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json as ResponseJson,
    routing::{get, post},
    Router,
};
use clap::Parser;
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;

use alarm_forwarder::webhook::{verify, IncidentPayload, SIGNATURE_HEADER, TIMESTAMP_HEADER};

#[derive(Parser)]
#[command(name = "webhook-receiver")]
#[command(about = "Local incident webhook that checks forwarder signatures")]
struct Args {
    /// Shared HMAC secret
    #[arg(short, long)]
    secret: String,

    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:3000")]
    listen: String,
}

struct AppState {
    secret: String,
}

#[derive(Serialize)]
struct ReceiveResponse {
    accepted: bool,
    message: String,
    incident_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = Args::parse();
    let state = AppState { secret: args.secret };

    let app = Router::new()
        .route("/webhook", post(receive_incident))
        .route("/health", get(health))
        .with_state(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(&args.listen).await?;
    info!("🌐 Webhook receiver listening on http://{}/webhook", args.listen);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

async fn receive_incident(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, ResponseJson<ReceiveResponse>) {
    let timestamp = header_value(&headers, TIMESTAMP_HEADER);
    let signature = header_value(&headers, SIGNATURE_HEADER);

    if timestamp.is_empty() || signature.is_empty() {
        warn!("❌ Rejected request without signature headers");
        return reject("missing x-amzn-event-timestamp or x-amzn-event-signature");
    }

    if !verify(&state.secret, timestamp, &body, signature) {
        warn!("❌ Rejected request with invalid signature (timestamp {})", timestamp);
        return reject("invalid signature");
    }

    match serde_json::from_str::<IncidentPayload>(&body) {
        Ok(incident) => {
            info!(
                "✅ Incident {} [{}] {}",
                incident.incident_id, incident.priority, incident.title
            );
            (
                StatusCode::ACCEPTED,
                ResponseJson(ReceiveResponse {
                    accepted: true,
                    message: "incident accepted".to_string(),
                    incident_id: Some(incident.incident_id),
                }),
            )
        }
        Err(e) => {
            warn!("Signed body is not an incident payload: {}", e);
            (
                StatusCode::BAD_REQUEST,
                ResponseJson(ReceiveResponse {
                    accepted: false,
                    message: format!("invalid incident payload: {}", e),
                    incident_id: None,
                }),
            )
        }
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers.get(name).and_then(|v| v.to_str().ok()).unwrap_or("")
}

fn reject(message: &str) -> (StatusCode, ResponseJson<ReceiveResponse>) {
    (
        StatusCode::UNAUTHORIZED,
        ResponseJson(ReceiveResponse {
            accepted: false,
            message: message.to_string(),
            incident_id: None,
        }),
    )
}
