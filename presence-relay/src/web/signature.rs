//! Zoom webhook signature verification.
//!
//! With a secret token configured, Zoom signs every delivery with
//! HMAC-SHA256 and validates the endpoint URL with a challenge.
//! Reference: https://developers.zoom.us/docs/api/webhooks/#verify-webhook-events

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-zm-signature";
pub const TIMESTAMP_HEADER: &str = "x-zm-request-timestamp";

fn hmac_hex(secret: &str, message: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(message);
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Answer to an `endpoint.url_validation` challenge:
/// hex HMAC-SHA256 of the plain token keyed by the secret token.
pub fn encrypt_plain_token(secret: &str, plain_token: &str) -> Option<String> {
    hmac_hex(secret, plain_token.as_bytes())
}

/// Verify a Zoom webhook signature.
///
/// The signature header has the form `v0=<hex>` where the hex digest is
/// HMAC-SHA256(secret, "v0:{timestamp}:{body}"). Timestamps older (or further
/// in the future) than `max_age_seconds` are rejected to stop replays.
pub fn verify_zoom_signature(
    secret: &str,
    timestamp: &str,
    body: &[u8],
    signature: &str,
    max_age_seconds: u64,
) -> bool {
    if secret.is_empty() || timestamp.is_empty() || signature.is_empty() {
        warn!(
            has_secret = !secret.is_empty(),
            has_timestamp = !timestamp.is_empty(),
            has_signature = !signature.is_empty(),
            "zoom_signature_missing_fields"
        );
        return false;
    }

    let request_time: u64 = match timestamp.parse() {
        Ok(t) => t,
        Err(_) => {
            warn!(timestamp = %timestamp, "zoom_signature_invalid_timestamp");
            return false;
        }
    };

    let current_time = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    let age = current_time.abs_diff(request_time);

    if age > max_age_seconds {
        warn!(
            request_time = request_time,
            current_time = current_time,
            age_seconds = age,
            max_age_seconds = max_age_seconds,
            "zoom_signature_stale"
        );
        return false;
    }

    let mut message = format!("v0:{}:", timestamp).into_bytes();
    message.extend_from_slice(body);

    let expected = match hmac_hex(secret, &message) {
        Some(digest) => format!("v0={}", digest),
        None => {
            warn!("zoom_signature_invalid_key");
            return false;
        }
    };

    let valid = constant_time_compare(&expected, signature);

    if !valid {
        warn!(
            expected_length = expected.len(),
            actual_length = signature.len(),
            "zoom_signature_mismatch"
        );
    }

    valid
}

/// Constant-time string comparison to prevent timing attacks.
pub(crate) fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn now() -> String {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
            .to_string()
    }

    pub(crate) fn sign(secret: &str, timestamp: &str, body: &str) -> String {
        let message = format!("v0:{}:{}", timestamp, body);
        format!("v0={}", hmac_hex(secret, message.as_bytes()).unwrap())
    }

    #[test]
    fn test_verify_signature_valid() {
        let timestamp = now();
        let body = r#"{"event":"user.presence_status_updated"}"#;
        let signature = sign("secret", &timestamp, body);

        assert!(verify_zoom_signature(
            "secret",
            &timestamp,
            body.as_bytes(),
            &signature,
            300
        ));
    }

    #[test]
    fn test_verify_signature_tampered_body() {
        let timestamp = now();
        let signature = sign("secret", &timestamp, r#"{"a":1}"#);

        assert!(!verify_zoom_signature(
            "secret",
            &timestamp,
            br#"{"a":2}"#,
            &signature,
            300
        ));
    }

    #[test]
    fn test_verify_signature_missing_fields() {
        assert!(!verify_zoom_signature("", "123", b"{}", "v0=abc", 300));
        assert!(!verify_zoom_signature("secret", "", b"{}", "v0=abc", 300));
        assert!(!verify_zoom_signature("secret", "123", b"{}", "", 300));
    }

    #[test]
    fn test_verify_signature_invalid_timestamp() {
        assert!(!verify_zoom_signature("secret", "yesterday", b"{}", "v0=abc", 300));
    }

    #[test]
    fn test_verify_signature_stale() {
        // Year 2000
        let signature = sign("secret", "946684800", "{}");
        assert!(!verify_zoom_signature("secret", "946684800", b"{}", &signature, 300));
    }

    #[test]
    fn test_encrypt_plain_token() {
        let encrypted = encrypt_plain_token("secret", "qgg8vlvZRS6UYooatFL8Aw").unwrap();
        assert_eq!(encrypted.len(), 64);
        assert_eq!(
            encrypted,
            encrypt_plain_token("secret", "qgg8vlvZRS6UYooatFL8Aw").unwrap()
        );
        assert_ne!(encrypted, encrypt_plain_token("other", "qgg8vlvZRS6UYooatFL8Aw").unwrap());
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }
}
