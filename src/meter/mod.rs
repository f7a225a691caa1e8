pub mod campus_card;

use async_trait::async_trait;
use mockall::automock;

/// Used in the application to reach the campus meter service
pub type Meter = &'static dyn ElectricityMeter;

#[derive(Debug, thiserror::Error)]
pub enum MeterError {
    #[error("unknown campus: {0}")]
    UnknownCampus(String),
    #[error("unknown building: {0}")]
    UnknownBuilding(String),
    #[error("meter request failed: {0}")]
    Request(#[from] anyhow::Error),
}

/// Read side of the campus electricity meters. Locations are hierarchical:
/// a campus holds buildings, a building holds rooms.
#[automock]
#[async_trait]
pub trait ElectricityMeter: Send + Sync + 'static {
    /// Checks the campus and building against the roster fetched at startup.
    fn valid_location(&self, campus: &str, building: &str) -> bool;
    /// Live balance for the room, in kWh as reported by the meter.
    async fn get_electricity(
        &self,
        campus: String,
        building: String,
        room: String,
    ) -> Result<f64, MeterError>;
}
