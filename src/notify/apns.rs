use std::sync::Mutex;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::ApnsConfig;
use crate::notify::{Alert, Channel, DeliveryError, PushSender, Sender};

/// APNs provider tokens are accepted for up to an hour; refresh well inside
/// that window.
const TOKEN_REFRESH_SECS: i64 = 45 * 60;

/// Reject reasons that mean the token can never be delivered to again.
const PERMANENT_REASONS: [&str; 3] = ["BadDeviceToken", "Unregistered", "DeviceTokenNotForTopic"];

pub struct ApnsClient {
    http: reqwest::Client,
    key: EncodingKey,
    key_id: String,
    team_id: String,
    topic: String,
    endpoint: Option<String>,
    provider_token: Mutex<Option<CachedToken>>,
}

struct CachedToken {
    value: String,
    issued_at: i64,
}

#[derive(Debug, Serialize)]
struct ProviderClaims {
    iss: String,
    iat: i64,
}

#[derive(Debug, Deserialize)]
struct ApnsErrorBody {
    reason: String,
}

pub fn initialize(config: &ApnsConfig) -> Result<Sender, anyhow::Error> {
    let client = ApnsClient::new(config)?;

    Ok(Box::leak(Box::new(client)))
}

impl ApnsClient {
    pub fn new(config: &ApnsConfig) -> Result<Self, anyhow::Error> {
        let key = EncodingKey::from_ec_pem(config.key_pem.as_bytes())
            .map_err(|e| anyhow!("invalid APNS provider key: {}", e))?;

        Ok(ApnsClient {
            http: reqwest::Client::new(),
            key,
            key_id: config.key_id.clone(),
            team_id: config.team_id.clone(),
            topic: config.topic.clone(),
            endpoint: config.endpoint.clone(),
            provider_token: Mutex::new(None),
        })
    }

    fn provider_token(&self) -> Result<String, anyhow::Error> {
        let mut cached = self
            .provider_token
            .lock()
            .map_err(|e| anyhow!("provider token lock poisoned: {}", e))?;

        let now = Utc::now().timestamp();
        if let Some(token) = cached.as_ref() {
            if now - token.issued_at < TOKEN_REFRESH_SECS {
                return Ok(token.value.clone());
            }
        }

        let mut header = Header::new(Algorithm::ES256);
        header.kid = Some(self.key_id.clone());

        let claims = ProviderClaims {
            iss: self.team_id.clone(),
            iat: now,
        };

        let value = jsonwebtoken::encode(&header, &claims, &self.key)
            .map_err(|e| anyhow!("could not sign provider token: {}", e))?;

        *cached = Some(CachedToken {
            value: value.clone(),
            issued_at: now,
        });

        Ok(value)
    }

    fn device_url(&self, device_token: &str, channel: Channel) -> String {
        match &self.endpoint {
            Some(base) => format!("{}/3/device/{}", base, device_token),
            None => format!("https://{}/3/device/{}", channel.host(), device_token),
        }
    }
}

/// Maps one APNs response to a delivery outcome. Anything that is not a
/// known dead-token reason stays transient so the daily trigger retries it.
fn classify_rejection(status: reqwest::StatusCode, reason: Option<&str>) -> DeliveryError {
    match reason {
        Some(reason) if PERMANENT_REASONS.contains(&reason) => {
            DeliveryError::Permanent(reason.to_string())
        }
        Some(reason) => DeliveryError::Transient(anyhow!("APNs rejected push ({}): {}", status, reason)),
        None => DeliveryError::Transient(anyhow!("APNs rejected push with status {}", status)),
    }
}

#[async_trait]
impl PushSender for ApnsClient {
    async fn send(
        &self,
        alert: Alert,
        device_token: String,
        channel: Channel,
    ) -> Result<(), DeliveryError> {
        let token = self.provider_token().map_err(DeliveryError::Transient)?;

        let payload = json!({
            "aps": {
                "alert": {
                    "title": alert.title,
                    "body": alert.body,
                },
                "badge": 0,
            }
        });

        let response = self
            .http
            .post(self.device_url(&device_token, channel))
            .bearer_auth(token)
            .header("apns-topic", &self.topic)
            .header("apns-push-type", "alert")
            .header("apns-priority", "10")
            .header("apns-expiration", "0")
            .json(&payload)
            .send()
            .await
            .map_err(|e| DeliveryError::Transient(anyhow!("APNs request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let reason = response.json::<ApnsErrorBody>().await.ok();
        Err(classify_rejection(status, reason.as_ref().map(|b| b.reason.as_str())))
    }
}
