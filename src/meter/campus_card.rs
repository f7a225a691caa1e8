use std::collections::HashMap;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use serde::Deserialize;

use crate::config::MeterConfig;
use crate::meter::{ElectricityMeter, Meter, MeterError};

/// Client for the campus-card service that fronts the dormitory meters.
///
/// The building roster for every configured campus is fetched once during
/// startup, before the HTTP listener is up. Requests against locations that
/// are not in the roster never leave the process.
pub struct CampusCardClient {
    http: reqwest::Client,
    base_url: String,
    buildings: HashMap<String, HashMap<String, Building>>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Building {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct ElectricityResponse {
    remaining: f64,
}

/// Builds the client, fetches the roster for every campus, and leaks it for
/// the life of the process.
pub async fn initialize(config: &MeterConfig) -> Result<Meter, anyhow::Error> {
    let client = CampusCardClient::create(config).await?;

    Ok(Box::leak(Box::new(client)))
}

impl CampusCardClient {
    pub async fn create(config: &MeterConfig) -> Result<Self, anyhow::Error> {
        let http = reqwest::Client::new();
        let mut buildings = HashMap::new();

        for campus in &config.campuses {
            let roster = fetch_buildings(&http, &config.base_url, campus)
                .await
                .with_context(|| format!("could not fetch buildings for campus {}", campus))?;

            tracing::info!(
                target = module_path!(),
                campus = campus.as_str(),
                count = roster.len(),
                "Fetched building roster"
            );

            buildings.insert(
                campus.clone(),
                roster.into_iter().map(|b| (b.name.clone(), b)).collect(),
            );
        }

        Ok(CampusCardClient {
            http,
            base_url: config.base_url.clone(),
            buildings,
        })
    }

    fn building(&self, campus: &str, building: &str) -> Result<&Building, MeterError> {
        let campus_buildings = self
            .buildings
            .get(campus)
            .ok_or_else(|| MeterError::UnknownCampus(campus.to_string()))?;

        campus_buildings
            .get(building)
            .ok_or_else(|| MeterError::UnknownBuilding(building.to_string()))
    }
}

async fn fetch_buildings(
    http: &reqwest::Client,
    base_url: &str,
    campus: &str,
) -> Result<Vec<Building>, anyhow::Error> {
    let response = http
        .get(format!("{}/buildings", base_url))
        .query(&[("campus", campus)])
        .send()
        .await?
        .error_for_status()?;

    Ok(response.json().await?)
}

#[async_trait]
impl ElectricityMeter for CampusCardClient {
    fn valid_location(&self, campus: &str, building: &str) -> bool {
        self.building(campus, building).is_ok()
    }

    async fn get_electricity(
        &self,
        campus: String,
        building: String,
        room: String,
    ) -> Result<f64, MeterError> {
        let building = self.building(&campus, &building)?;

        let response = self
            .http
            .get(format!("{}/electricity", self.base_url))
            .query(&[("building_id", building.id.as_str()), ("room", room.as_str())])
            .send()
            .await
            .map_err(|e| anyhow!("electricity request failed: {}", e))?
            .error_for_status()
            .map_err(|e| anyhow!("electricity request rejected: {}", e))?;

        let body: ElectricityResponse = response
            .json()
            .await
            .map_err(|e| anyhow!("could not parse electricity response: {}", e))?;

        Ok(body.remaining)
    }
}
