pub mod apns;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};

/// Used in the application to deliver pushes
pub type Sender = &'static dyn PushSender;

/// One alert payload as shown to the user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub title: String,
    pub body: String,
}

/// APNs environment the device token belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Sandbox,
    Production,
}

impl Channel {
    pub fn host(&self) -> &'static str {
        match self {
            Channel::Sandbox => "api.sandbox.push.apple.com",
            Channel::Production => "api.push.apple.com",
        }
    }

    /// Channel recorded on a binding, falling back to the configured default
    /// for rows that predate the channel column.
    pub fn from_record(recorded: Option<&str>, default: Channel) -> Channel {
        recorded.and_then(|s| s.parse().ok()).unwrap_or(default)
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sandbox" => Ok(Channel::Sandbox),
            "production" => Ok(Channel::Production),
            other => Err(format!("unknown channel: {}", other)),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Sandbox => write!(f, "sandbox"),
            Channel::Production => write!(f, "production"),
        }
    }
}

/// Outcome classification for one delivery attempt. Only `Permanent` may
/// mutate state further up the stack; a dead token can never succeed again.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("permanent delivery failure: {0}")]
    Permanent(String),
    #[error("transient delivery failure: {0}")]
    Transient(#[source] anyhow::Error),
}

#[automock]
#[async_trait]
pub trait PushSender: Send + Sync + 'static {
    async fn send(
        &self,
        alert: Alert,
        device_token: String,
        channel: Channel,
    ) -> Result<(), DeliveryError>;
}
