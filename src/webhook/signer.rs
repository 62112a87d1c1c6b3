use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{ForwarderError, Result};

type HmacSha256 = Hmac<Sha256>;

pub const TIMESTAMP_HEADER: &str = "x-amzn-event-timestamp";
pub const SIGNATURE_HEADER: &str = "x-amzn-event-signature";

/// ISO8601 UTC with microseconds and a trailing `Z`, e.g. `2024-05-01T10:00:00.123456Z`.
pub fn event_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// base64(HMAC-SHA256(secret, "{timestamp}:{body}"))
pub fn sign(secret: &str, timestamp: &str, body: &str) -> Result<String> {
    let mac = signed_mac(secret, timestamp, body)?;
    Ok(general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

pub fn verify(secret: &str, timestamp: &str, body: &str, signature: &str) -> bool {
    let Ok(expected) = general_purpose::STANDARD.decode(signature.trim()) else {
        return false;
    };

    match signed_mac(secret, timestamp, body) {
        Ok(mac) => mac.verify_slice(&expected).is_ok(),
        Err(_) => false,
    }
}

fn signed_mac(secret: &str, timestamp: &str, body: &str) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ForwarderError::signing(format!("HMAC error: {}", e)))?;
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body.as_bytes());
    Ok(mac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SECRET: &str = "webhook-secret";
    const TIMESTAMP: &str = "2024-05-01T10:00:00.000000Z";
    const BODY: &str = r#"{"eventType":"incident","priority":"HIGH"}"#;

    #[test]
    fn test_event_timestamp_format() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        assert_eq!(event_timestamp(at), "2024-05-01T10:00:00.000000Z");
    }

    #[test]
    fn test_sign_covers_timestamp_prefixed_body() -> Result<()> {
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(format!("{}:{}", TIMESTAMP, BODY).as_bytes());
        let expected = general_purpose::STANDARD.encode(mac.finalize().into_bytes());

        assert_eq!(sign(SECRET, TIMESTAMP, BODY)?, expected);
        Ok(())
    }

    #[test]
    fn test_hmac_reference_vector() {
        let mut mac = HmacSha256::new_from_slice(b"key").unwrap();
        mac.update(b"The quick brown fox jumps over the lazy dog");
        let encoded = general_purpose::STANDARD.encode(mac.finalize().into_bytes());
        assert_eq!(encoded, "97yD9DBThCSxMpjmqm+xQ+9NWaFJRhdZl0edvC0aPNg=");
    }

    #[test]
    fn test_signature_is_deterministic() -> Result<()> {
        assert_eq!(sign(SECRET, TIMESTAMP, BODY)?, sign(SECRET, TIMESTAMP, BODY)?);
        Ok(())
    }

    #[test]
    fn test_signature_changes_with_each_input() -> Result<()> {
        let base = sign(SECRET, TIMESTAMP, BODY)?;

        assert_ne!(base, sign("other-secret", TIMESTAMP, BODY)?);
        assert_ne!(base, sign(SECRET, "2024-05-01T10:00:01.000000Z", BODY)?);
        assert_ne!(base, sign(SECRET, TIMESTAMP, r#"{"eventType":"incident","priority":"LOW"}"#)?);
        Ok(())
    }

    #[test]
    fn test_verify_untampered() -> Result<()> {
        let signature = sign(SECRET, TIMESTAMP, BODY)?;
        assert!(verify(SECRET, TIMESTAMP, BODY, &signature));
        Ok(())
    }

    #[test]
    fn test_verify_rejects_tampering() -> Result<()> {
        let signature = sign(SECRET, TIMESTAMP, BODY)?;

        assert!(!verify(SECRET, TIMESTAMP, r#"{"eventType":"incident","priority":"LOW"}"#, &signature));
        assert!(!verify(SECRET, "2024-05-01T10:05:00.000000Z", BODY, &signature));
        assert!(!verify("wrong", TIMESTAMP, BODY, &signature));
        assert!(!verify(SECRET, TIMESTAMP, BODY, "not base64!"));
        Ok(())
    }
}
