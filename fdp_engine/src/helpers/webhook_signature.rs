//! # Stripe webhook signatures
//!
//! Stripe signs every webhook delivery with the endpoint's signing secret. The signature travels in the
//! `Stripe-Signature` header:
//!
//! ```text
//!    t=1492774577,v1=5257a869e7ecebeda32affa62cdca3fa51cad7e77a0e56ff536d0ce8e108d8bd,v0=...
//! ```
//!
//! where
//!   * `t` is the unix timestamp at which Stripe signed the payload,
//!   * each `v1` is a hex-encoded HMAC-SHA256 of `"{t}.{raw body}"` keyed with the signing secret. There may be more
//!     than one while a secret is being rolled. Other schemes (`v0`) are ignored.
//!
//! The payload must be the raw request body, byte for byte. Deliveries signed longer ago than the tolerance are
//! rejected to limit replays.
use std::str::FromStr;

use chrono::Utc;
use fdp_common::Secret;
use hmac::{Hmac, Mac};
use log::*;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("No Stripe-Signature header value was provided")]
    MissingHeader,
    #[error("Unable to extract timestamp and signatures from header")]
    MalformedHeader,
    #[error("No signatures found matching the expected signature for payload")]
    NoMatchingSignature,
    #[error("Timestamp outside the tolerance zone ({0}s)")]
    TimestampOutsideTolerance(i64),
    #[error("The webhook signing secret is not configured")]
    SecretNotConfigured,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub signatures: Vec<Vec<u8>>,
}

impl FromStr for SignatureHeader {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut timestamp = None;
        let mut signatures = Vec::new();
        for pair in s.split(',') {
            let Some((key, value)) = pair.trim().split_once('=') else {
                continue;
            };
            match key {
                "t" => timestamp = value.parse::<i64>().ok(),
                "v1" => {
                    // non-hex entries can never match
                    if let Ok(sig) = hex::decode(value) {
                        signatures.push(sig);
                    }
                },
                _ => {},
            }
        }
        match timestamp {
            Some(timestamp) if !signatures.is_empty() => Ok(Self { timestamp, signatures }),
            _ => Err(SignatureError::MalformedHeader),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WebhookVerifier {
    secret: Secret<String>,
    tolerance_secs: i64,
}

impl WebhookVerifier {
    pub fn new(secret: Secret<String>, tolerance_secs: i64) -> Self {
        Self { secret, tolerance_secs }
    }

    pub fn tolerance_secs(&self) -> i64 {
        self.tolerance_secs
    }

    /// Checks the header against the raw body using the current time.
    pub fn verify(&self, header: Option<&str>, payload: &[u8]) -> Result<(), SignatureError> {
        self.verify_at(header, payload, Utc::now().timestamp())
    }

    pub fn verify_at(&self, header: Option<&str>, payload: &[u8], now: i64) -> Result<(), SignatureError> {
        if !self.secret.is_set() {
            return Err(SignatureError::SecretNotConfigured);
        }
        let header = header.filter(|h| !h.trim().is_empty()).ok_or(SignatureError::MissingHeader)?;
        let header = header.parse::<SignatureHeader>()?;
        let mac = self.mac(header.timestamp, payload)?;
        let matched = header.signatures.iter().any(|sig| mac.clone().verify_slice(sig).is_ok());
        if !matched {
            warn!("🔐️ Webhook signature did not match any expected signature");
            return Err(SignatureError::NoMatchingSignature);
        }
        if self.tolerance_secs > 0 && now.abs_diff(header.timestamp) > self.tolerance_secs.unsigned_abs() {
            warn!("🔐️ Webhook signature timestamp {} is outside the tolerance window", header.timestamp);
            return Err(SignatureError::TimestampOutsideTolerance(self.tolerance_secs));
        }
        trace!("🔐️ Webhook signature check ✅️");
        Ok(())
    }

    /// Produces a `Stripe-Signature` header value for `payload`, as Stripe would.
    pub fn sign(&self, payload: &[u8], timestamp: i64) -> Result<String, SignatureError> {
        let sig = self.mac(timestamp, payload)?.finalize().into_bytes();
        Ok(format!("t={timestamp},v1={}", hex::encode(sig)))
    }

    fn mac(&self, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, SignatureError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.reveal().as_bytes())
            .map_err(|_| SignatureError::SecretNotConfigured)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const BODY: &[u8] = br#"{"type":"payment_intent.succeeded"}"#;

    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new(Secret::new("whsec_test".to_string()), DEFAULT_TOLERANCE_SECS)
    }

    #[test]
    fn parse_header() {
        let h: SignatureHeader = "t=100,v1=abcd,v0=ffff,v1=00ff".parse().unwrap();
        assert_eq!(h.timestamp, 100);
        assert_eq!(h.signatures, vec![vec![0xab, 0xcd], vec![0x00, 0xff]]);
        assert_eq!("v1=abcd".parse::<SignatureHeader>(), Err(SignatureError::MalformedHeader));
        assert_eq!("t=100".parse::<SignatureHeader>(), Err(SignatureError::MalformedHeader));
        assert_eq!("garbage".parse::<SignatureHeader>(), Err(SignatureError::MalformedHeader));
    }

    #[test]
    fn valid_signature() {
        let v = verifier();
        let header = v.sign(BODY, 1_000).unwrap();
        assert!(v.verify_at(Some(&header), BODY, 1_000).is_ok());
        assert!(v.verify_at(Some(&header), BODY, 1_299).is_ok());
    }

    #[test]
    fn any_v1_may_match() {
        let v = verifier();
        let good = v.sign(BODY, 1_000).unwrap();
        let good_sig = good.split(",v1=").nth(1).unwrap();
        let header = format!("t=1000,v1={},v1={good_sig}", "00".repeat(32));
        assert!(v.verify_at(Some(&header), BODY, 1_000).is_ok());
    }

    #[test]
    fn tampered_body() {
        let v = verifier();
        let header = v.sign(BODY, 1_000).unwrap();
        let err = v.verify_at(Some(&header), b"{}", 1_000).unwrap_err();
        assert_eq!(err, SignatureError::NoMatchingSignature);
    }

    #[test]
    fn wrong_secret() {
        let header = WebhookVerifier::new(Secret::new("other".to_string()), 300).sign(BODY, 1_000).unwrap();
        assert_eq!(verifier().verify_at(Some(&header), BODY, 1_000), Err(SignatureError::NoMatchingSignature));
    }

    #[test]
    fn stale_timestamp() {
        let v = verifier();
        let header = v.sign(BODY, 1_000).unwrap();
        assert_eq!(v.verify_at(Some(&header), BODY, 1_301), Err(SignatureError::TimestampOutsideTolerance(300)));
    }

    #[test]
    fn extreme_timestamps_are_out_of_tolerance() {
        let v = verifier();
        let header = v.sign(BODY, i64::MIN).unwrap();
        assert_eq!(v.verify_at(Some(&header), BODY, 1_000), Err(SignatureError::TimestampOutsideTolerance(300)));
        let header = v.sign(BODY, i64::MAX).unwrap();
        assert_eq!(v.verify_at(Some(&header), BODY, -1_000), Err(SignatureError::TimestampOutsideTolerance(300)));
    }

    #[test]
    fn signatures_are_lowercase_hex() {
        let header = verifier().sign(BODY, 1_000).unwrap();
        let (_, sig) = header.split_once(",v1=").unwrap();
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        let parsed = header.parse::<SignatureHeader>().unwrap();
        assert_eq!(parsed.signatures, vec![hex::decode(sig).unwrap()]);
        // a sign prefix is not a hex digit
        let bad = format!("t=1000,v1=+{}", &sig[1..]);
        assert_eq!(bad.parse::<SignatureHeader>(), Err(SignatureError::MalformedHeader));
    }

    #[test]
    fn missing_header_or_secret() {
        assert_eq!(verifier().verify_at(None, BODY, 0), Err(SignatureError::MissingHeader));
        assert_eq!(verifier().verify_at(Some(" "), BODY, 0), Err(SignatureError::MissingHeader));
        let unset = WebhookVerifier::new(Secret::new(String::new()), 300);
        assert_eq!(unset.verify_at(Some("t=1,v1=00"), BODY, 1), Err(SignatureError::SecretNotConfigured));
    }
}
