//! Svix webhook signature verification.
//!
//! The identity provider delivers webhooks through Svix, which signs each
//! request using HMAC-SHA256 over `{svix-id}.{svix-timestamp}.{body}`.
//! Reference: https://docs.svix.com/receiving/verifying-payloads/how-manual

use std::time::{SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the unique message identifier.
pub const SVIX_ID_HEADER: &str = "svix-id";

/// Header carrying the Unix timestamp (seconds) the message was signed at.
pub const SVIX_TIMESTAMP_HEADER: &str = "svix-timestamp";

/// Header carrying one or more space-separated `version,signature` entries.
pub const SVIX_SIGNATURE_HEADER: &str = "svix-signature";

/// Default tolerance between the signed timestamp and the local clock.
pub const DEFAULT_TOLERANCE_SECS: u64 = 300;

const SECRET_PREFIX: &str = "whsec_";
const SIGNATURE_VERSION: &str = "v1";

/// Reasons a webhook fails verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    #[error("signing secret is not valid base64 or is empty")]
    InvalidSecret,

    #[error("timestamp header is not an integer")]
    InvalidTimestamp,

    #[error("message timestamp too old")]
    TimestampTooOld,

    #[error("message timestamp too new")]
    TimestampTooNew,

    #[error("no matching signature found")]
    InvalidSignature,
}

/// Verifier constructed once from the shared signing secret.
#[derive(Clone)]
pub struct Webhook {
    key: Vec<u8>,
    tolerance_secs: u64,
}

impl std::fmt::Debug for Webhook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Webhook")
            .field("key", &"<redacted>")
            .field("tolerance_secs", &self.tolerance_secs)
            .finish()
    }
}

impl Webhook {
    /// Build a verifier from a `whsec_`-prefixed (or bare) base64 secret.
    pub fn new(secret: &str) -> Result<Self, WebhookError> {
        let encoded = secret.trim();
        let encoded = encoded.strip_prefix(SECRET_PREFIX).unwrap_or(encoded);

        let key = STANDARD
            .decode(encoded)
            .map_err(|_| WebhookError::InvalidSecret)?;

        if key.is_empty() {
            return Err(WebhookError::InvalidSecret);
        }

        Ok(Self {
            key,
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        })
    }

    /// Override the timestamp tolerance.
    pub fn with_tolerance(mut self, tolerance_secs: u64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    /// Verify a webhook against the current clock.
    ///
    /// # Arguments
    ///
    /// * `payload` - The raw request body, exactly as received
    /// * `msg_id` - The `svix-id` header
    /// * `timestamp` - The `svix-timestamp` header
    /// * `signature_header` - The `svix-signature` header
    pub fn verify(
        &self,
        payload: &[u8],
        msg_id: &str,
        timestamp: &str,
        signature_header: &str,
    ) -> Result<(), WebhookError> {
        self.verify_at(payload, msg_id, timestamp, signature_header, unix_now())
    }

    fn verify_at(
        &self,
        payload: &[u8],
        msg_id: &str,
        timestamp: &str,
        signature_header: &str,
        now: i64,
    ) -> Result<(), WebhookError> {
        let webhook_time: i64 = match timestamp.trim().parse() {
            Ok(t) => t,
            Err(_) => {
                warn!(timestamp = %timestamp, "svix_signature_invalid_timestamp");
                return Err(WebhookError::InvalidTimestamp);
            }
        };

        let tolerance = i64::try_from(self.tolerance_secs).unwrap_or(i64::MAX);

        if now.saturating_sub(webhook_time) > tolerance {
            warn!(
                webhook_time = webhook_time,
                current_time = now,
                tolerance_secs = self.tolerance_secs,
                "svix_signature_stale"
            );
            return Err(WebhookError::TimestampTooOld);
        }

        if webhook_time.saturating_sub(now) > tolerance {
            warn!(
                webhook_time = webhook_time,
                current_time = now,
                tolerance_secs = self.tolerance_secs,
                "svix_signature_future"
            );
            return Err(WebhookError::TimestampTooNew);
        }

        let mac = self.mac(msg_id, webhook_time, payload)?;

        // verify_slice compares in constant time
        let matched = signature_header
            .split_whitespace()
            .filter_map(|entry| entry.split_once(','))
            .filter(|(version, _)| *version == SIGNATURE_VERSION)
            .filter_map(|(_, signature)| STANDARD.decode(signature).ok())
            .any(|decoded| mac.clone().verify_slice(&decoded).is_ok());

        if !matched {
            warn!(
                msg_id = %msg_id,
                signature_count = signature_header.split_whitespace().count(),
                "svix_signature_mismatch"
            );
            return Err(WebhookError::InvalidSignature);
        }

        Ok(())
    }

    /// Produce a `v1,<signature>` header value for the given message.
    pub fn sign(
        &self,
        msg_id: &str,
        timestamp: i64,
        payload: &[u8],
    ) -> Result<String, WebhookError> {
        let mac = self.mac(msg_id, timestamp, payload)?;
        let signature = STANDARD.encode(mac.finalize().into_bytes());
        Ok(format!("{SIGNATURE_VERSION},{signature}"))
    }

    /// HMAC over the signed content `{msg_id}.{timestamp}.{payload}`.
    fn mac(
        &self,
        msg_id: &str,
        timestamp: i64,
        payload: &[u8],
    ) -> Result<HmacSha256, WebhookError> {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).map_err(|_| WebhookError::InvalidSecret)?;

        mac.update(format!("{msg_id}.{timestamp}.").as_bytes());
        mac.update(payload);

        Ok(mac)
    }
}

/// Current Unix time in seconds.
pub fn unix_now() -> i64 {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    i64::try_from(secs).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    // base64("test-signing-key-for-usersync")
    const SECRET: &str = "whsec_dGVzdC1zaWduaW5nLWtleS1mb3ItdXNlcnN5bmM=";
    const NOW: i64 = 1_700_000_000;

    fn webhook() -> Webhook {
        Webhook::new(SECRET).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_secret() {
        assert_eq!(
            Webhook::new("whsec_not base64!").unwrap_err(),
            WebhookError::InvalidSecret
        );
        assert_eq!(Webhook::new("whsec_").unwrap_err(), WebhookError::InvalidSecret);
    }

    #[test]
    fn test_prefix_is_optional() {
        let bare = Webhook::new(SECRET.trim_start_matches("whsec_")).unwrap();
        let payload = br#"{"type":"user.created"}"#;
        let sig = webhook().sign("msg_1", NOW, payload).unwrap();

        assert!(bare
            .verify_at(payload, "msg_1", &NOW.to_string(), &sig, NOW)
            .is_ok());
    }

    #[test]
    fn test_verify_signature_valid() {
        let wh = webhook();
        let payload = br#"{"type":"user.created","data":{"id":"user_1"}}"#;
        let sig = wh.sign("msg_1", NOW, payload).unwrap();

        assert!(sig.starts_with("v1,"));
        assert!(wh
            .verify_at(payload, "msg_1", &NOW.to_string(), &sig, NOW)
            .is_ok());
    }

    #[test]
    fn test_verify_against_wall_clock() {
        let wh = webhook();
        let payload = b"{}";
        let now = unix_now();
        let sig = wh.sign("msg_1", now, payload).unwrap();

        assert!(wh.verify(payload, "msg_1", &now.to_string(), &sig).is_ok());
    }

    #[test]
    fn test_verify_signature_tampered_body() {
        let wh = webhook();
        let payload = br#"{"type":"user.created","data":{"id":"user_1"}}"#.to_vec();
        let sig = wh.sign("msg_1", NOW, &payload).unwrap();

        for i in 0..payload.len() {
            let mut tampered = payload.clone();
            tampered[i] ^= 0x01;
            assert_eq!(
                wh.verify_at(&tampered, "msg_1", &NOW.to_string(), &sig, NOW),
                Err(WebhookError::InvalidSignature),
                "flipping byte {i} must invalidate the signature"
            );
        }
    }

    #[test]
    fn test_verify_signature_tampered_headers() {
        let wh = webhook();
        let payload = b"{}";
        let sig = wh.sign("msg_1", NOW, payload).unwrap();

        assert_eq!(
            wh.verify_at(payload, "msg_2", &NOW.to_string(), &sig, NOW),
            Err(WebhookError::InvalidSignature)
        );
        assert_eq!(
            wh.verify_at(payload, "msg_1", &(NOW + 1).to_string(), &sig, NOW),
            Err(WebhookError::InvalidSignature)
        );
    }

    #[test]
    fn test_verify_signature_wrong_secret() {
        let other = Webhook::new("whsec_b3RoZXItc2VjcmV0").unwrap();
        let payload = b"{}";
        let sig = other.sign("msg_1", NOW, payload).unwrap();

        assert_eq!(
            webhook().verify_at(payload, "msg_1", &NOW.to_string(), &sig, NOW),
            Err(WebhookError::InvalidSignature)
        );
    }

    #[test]
    fn test_verify_signature_invalid_timestamp() {
        assert_eq!(
            webhook().verify_at(b"{}", "msg_1", "not-a-number", "v1,sig", NOW),
            Err(WebhookError::InvalidTimestamp)
        );
    }

    #[test]
    fn test_verify_signature_stale_and_future() {
        let wh = webhook();
        let payload = b"{}";

        let old = NOW - 301;
        let sig = wh.sign("msg_1", old, payload).unwrap();
        assert_eq!(
            wh.verify_at(payload, "msg_1", &old.to_string(), &sig, NOW),
            Err(WebhookError::TimestampTooOld)
        );

        let future = NOW + 301;
        let sig = wh.sign("msg_1", future, payload).unwrap();
        assert_eq!(
            wh.verify_at(payload, "msg_1", &future.to_string(), &sig, NOW),
            Err(WebhookError::TimestampTooNew)
        );

        let wide = wh.clone().with_tolerance(600);
        assert!(wide
            .verify_at(payload, "msg_1", &future.to_string(), &sig, NOW)
            .is_ok());
    }

    #[test]
    fn test_verify_accepts_any_matching_v1_entry() {
        let wh = webhook();
        let payload = b"{}";
        let sig = wh.sign("msg_1", NOW, payload).unwrap();
        let raw = sig.trim_start_matches("v1,");

        let header = format!("v1,bogus v2,{raw} {sig}");
        assert!(wh
            .verify_at(payload, "msg_1", &NOW.to_string(), &header, NOW)
            .is_ok());

        // Same signature under an unknown version is ignored
        let header = format!("v2,{raw}");
        assert_eq!(
            wh.verify_at(payload, "msg_1", &NOW.to_string(), &header, NOW),
            Err(WebhookError::InvalidSignature)
        );
    }

    #[test]
    fn test_debug_redacts_key() {
        let rendered = format!("{:?}", webhook());
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_verify_rejects_truncated_and_non_base64_signatures() {
        let wh = webhook();
        let payload = b"{}";
        let sig = wh.sign("msg_1", NOW, payload).unwrap();
        let raw = sig.trim_start_matches("v1,");

        let truncated = format!("v1,{}", &raw[..raw.len() - 4]);
        assert_eq!(
            wh.verify_at(payload, "msg_1", &NOW.to_string(), &truncated, NOW),
            Err(WebhookError::InvalidSignature)
        );

        assert_eq!(
            wh.verify_at(payload, "msg_1", &NOW.to_string(), "v1,***not-base64***", NOW),
            Err(WebhookError::InvalidSignature)
        );
    }
}
