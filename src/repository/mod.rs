mod implementation;
pub mod models;

use async_trait::async_trait;
use mockall::automock;

use crate::error::Error;
use models::binding::{Binding, NewBinding};

/// Used in the application to access the database
pub type Repo = &'static dyn Repository;

/// Creates a testable interface for the database pool.
///
/// The store is the single source of truth for bindings; the in-memory job
/// registry is rebuilt from it at startup.
#[automock]
#[async_trait]
pub trait Repository: Send + Sync + 'static {
    /// Persists a new binding, assigning its id. A second binding for the
    /// same (device_token, campus, building, room) slot is a `Conflict`.
    async fn create_binding(&self, params: NewBinding) -> Result<Binding, Error>;
    async fn binding_by_id(&self, device_token: String, binding_id: i32)
        -> Result<Binding, Error>;
    async fn bindings_for_device(&self, device_token: String) -> Result<Vec<Binding>, Error>;
    async fn all_bindings(&self) -> Result<Vec<Binding>, Error>;
    async fn delete_binding(&self, binding_id: i32) -> Result<(), Error>;
    /// Deletes every binding owned by the device and inserts the desired set
    /// in one transaction. Returns the newly persisted rows.
    async fn replace_device_bindings(
        &self,
        device_token: String,
        desired: Vec<NewBinding>,
    ) -> Result<Vec<Binding>, Error>;
}

pub async fn implementation(database_url: String) -> Result<Repo, anyhow::Error> {
    let implementation = implementation::Implementation::new(database_url).await?;
    let repository = Box::new(implementation);

    Ok(Box::leak(repository))
}
