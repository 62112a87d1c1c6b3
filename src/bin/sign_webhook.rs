use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Arg, Command};

use alarm_forwarder::webhook::signer::{event_timestamp, sign, verify};

fn main() -> Result<()> {
    let matches = Command::new("sign-webhook")
        .version("1.0")
        .about("Sign or verify an incident payload the way the forwarder does")
        .arg(
            Arg::new("secret")
                .help("Shared HMAC secret")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("payload")
                .help("File holding the exact JSON body")
                .required(true)
                .index(2),
        )
        .arg(
            Arg::new("timestamp")
                .long("timestamp")
                .short('t')
                .help("x-amzn-event-timestamp value (defaults to now)"),
        )
        .arg(
            Arg::new("verify")
                .long("verify")
                .short('v')
                .help("Signature to check instead of printing a new one"),
        )
        .get_matches();

    let secret = matches
        .get_one::<String>("secret")
        .context("secret is required")?;
    let payload_path = matches
        .get_one::<String>("payload")
        .context("payload is required")?;
    let body = std::fs::read_to_string(payload_path).with_context(|| format!("reading {}", payload_path))?;
    let body = body.strip_suffix('\n').unwrap_or(&body);

    let timestamp = matches
        .get_one::<String>("timestamp")
        .cloned()
        .unwrap_or_else(|| event_timestamp(Utc::now()));

    if let Some(signature) = matches.get_one::<String>("verify") {
        if verify(secret, &timestamp, body, signature) {
            println!("Signature valid");
        } else {
            eprintln!("Signature INVALID for timestamp {}", timestamp);
            std::process::exit(1);
        }
        return Ok(());
    }

    let signature = sign(secret, &timestamp, body)?;
    println!("x-amzn-event-timestamp: {}", timestamp);
    println!("x-amzn-event-signature: {}", signature);

    Ok(())
}
