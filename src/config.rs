use anyhow::{anyhow, Error};
use dotenv::dotenv;
use serde::Deserialize;
use std::env;

#[derive(Clone, Debug, Deserialize)]
pub struct Settings {
    pub database_url: String,
    pub server: ServerConfig,
    pub meter: MeterConfig,
    pub apns: ApnsConfig,
    /// Send a live confirmation push when a binding is created; a rejected
    /// token fails the create instead of surfacing later in a timer firing.
    pub confirm_on_create: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MeterConfig {
    pub base_url: String,
    pub campuses: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ApnsConfig {
    /// PEM contents of the ES256 provider key, not a path.
    pub key_pem: String,
    pub key_id: String,
    pub team_id: String,
    pub topic: String,
    /// Overrides the Apple hosts when set; used by the test harness.
    pub endpoint: Option<String>,
    pub default_channel: String,
}

impl Settings {
    pub fn new() -> Result<Self, Error> {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow!("DATABASE_URL environment variable not found"))?;

        let key_path = env::var("APNS_KEY_PATH")
            .map_err(|_| anyhow!("APNS_KEY_PATH environment variable not found"))?;
        let key_pem = std::fs::read_to_string(&key_path)
            .map_err(|e| anyhow!("could not read APNS key at {}: {}", key_path, e))?;

        Ok(Settings {
            database_url,
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .map_err(|_| anyhow!("failed to parse server port"))?,
            },
            meter: MeterConfig {
                base_url: env::var("METER_BASE_URL")
                    .map_err(|_| anyhow!("METER_BASE_URL environment variable not found"))?,
                campuses: env::var("METER_CAMPUSES")
                    .map_err(|_| anyhow!("METER_CAMPUSES environment variable not found"))?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            apns: ApnsConfig {
                key_pem,
                key_id: env::var("APNS_KEY_ID")
                    .map_err(|_| anyhow!("APNS_KEY_ID environment variable not found"))?,
                team_id: env::var("APNS_TEAM_ID")
                    .map_err(|_| anyhow!("APNS_TEAM_ID environment variable not found"))?,
                topic: env::var("APNS_TOPIC")
                    .map_err(|_| anyhow!("APNS_TOPIC environment variable not found"))?,
                endpoint: env::var("APNS_ENDPOINT").ok(),
                default_channel: env::var("APNS_CHANNEL")
                    .unwrap_or_else(|_| "production".to_string()),
            },
            confirm_on_create: env::var("CONFIRM_ON_CREATE")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .map_err(|_| anyhow!("failed to parse CONFIRM_ON_CREATE"))?,
        })
    }
}
