//! Web Push transport (RFC 8030) with VAPID (RFC 8292) and aes128gcm payload
//! encryption (RFC 8291)

use super::PushSender;
use crate::error::{PushError, PushResult};
use crate::models::{PushPayload, Subscription, SubscriptionKeys};
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::header::{AUTHORIZATION, CONTENT_ENCODING, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

/// Push services reject VAPID tokens valid for more than 24h
const VAPID_TOKEN_LIFETIME_HOURS: i64 = 12;

/// How long the push service keeps an undelivered message
const MESSAGE_TTL_SECS: u32 = 24 * 3600;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Application server identity: P-256 signing key, its public point, and a contact
pub struct VapidKeys {
    encoding_key: EncodingKey,
    public_key: String,
    subject: String,
}

#[derive(Debug, Serialize)]
struct VapidClaims<'a> {
    aud: String,
    exp: i64,
    sub: &'a str,
}

impl VapidKeys {
    /// `pem` is a PKCS#8 P-256 private key; `public_key` the matching
    /// uncompressed point, base64url encoded (the value browsers receive as
    /// `applicationServerKey`)
    pub fn from_pem(pem: &[u8], public_key: impl Into<String>, subject: impl Into<String>) -> PushResult<Self> {
        let public_key = public_key.into();
        let raw = decode_key(&public_key)?;
        if raw.len() != 65 || raw[0] != 0x04 {
            return Err(PushError::Config(
                "VAPID public key must be an uncompressed P-256 point".to_string(),
            ));
        }
        Ok(Self {
            encoding_key: EncodingKey::from_ec_pem(pem)?,
            public_key,
            subject: subject.into(),
        })
    }

    pub fn from_pem_file(path: &Path, public_key: impl Into<String>, subject: impl Into<String>) -> PushResult<Self> {
        let pem = std::fs::read(path).map_err(|e| {
            PushError::Config(format!("cannot read VAPID key {}: {}", path.display(), e))
        })?;
        Self::from_pem(&pem, public_key, subject)
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// ES256 JWT scoped to the endpoint's origin
    fn sign(&self, endpoint: &str, now: DateTime<Utc>) -> PushResult<String> {
        let url = reqwest::Url::parse(endpoint)
            .map_err(|e| PushError::Config(format!("invalid endpoint {}: {}", endpoint, e)))?;
        let claims = VapidClaims {
            aud: url.origin().ascii_serialization(),
            exp: (now + TimeDelta::hours(VAPID_TOKEN_LIFETIME_HOURS)).timestamp(),
            sub: &self.subject,
        };
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::ES256),
            &claims,
            &self.encoding_key,
        )?)
    }
}

/// Sends encrypted payloads straight to the browser vendors' push services
pub struct WebPushSender {
    client: reqwest::Client,
    vapid: VapidKeys,
}

impl WebPushSender {
    pub fn new(vapid: VapidKeys) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });
        Self { client, vapid }
    }

    pub fn public_key(&self) -> &str {
        self.vapid.public_key()
    }
}

#[async_trait]
impl PushSender for WebPushSender {
    async fn send(&self, subscription: &Subscription, payload: &PushPayload) -> PushResult<()> {
        let plaintext = serde_json::to_vec(payload)
            .map_err(|e| PushError::Encryption(e.to_string()))?;
        let body = encrypt_payload(&subscription.keys, &plaintext)?;
        let jwt = self.vapid.sign(&subscription.endpoint, Utc::now())?;

        let response = self
            .client
            .post(&subscription.endpoint)
            .header("TTL", MESSAGE_TTL_SECS.to_string())
            .header("Urgency", "high")
            .header(CONTENT_ENCODING, "aes128gcm")
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(
                AUTHORIZATION,
                format!("vapid t={}, k={}", jwt, self.vapid.public_key),
            )
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Err(PushError::Gone(subscription.endpoint.clone()));
        }
        let body = response.text().await.unwrap_or_default();
        Err(PushError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

/// Decode a browser-supplied key; tolerates padding and the standard alphabet
pub(crate) fn decode_key(value: &str) -> PushResult<Vec<u8>> {
    let normalized: String = value
        .trim()
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    URL_SAFE_NO_PAD
        .decode(normalized.as_bytes())
        .map_err(|e| PushError::InvalidKey(e.to_string()))
}

/// aes128gcm-encrypt a payload for the subscription's keys
pub(crate) fn encrypt_payload(keys: &SubscriptionKeys, plaintext: &[u8]) -> PushResult<Vec<u8>> {
    let p256dh = decode_key(&keys.p256dh)?;
    let auth = decode_key(&keys.auth)?;
    ece::encrypt(&p256dh, &auth, plaintext).map_err(|e| PushError::Encryption(e.to_string()))
}

#[cfg(test)]
#[path = "web_push_tests.rs"]
mod tests;
