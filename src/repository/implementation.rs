use anyhow::anyhow;
use async_trait::async_trait;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::result::Error as DieselError;
use diesel::sqlite::SqliteConnection;
use diesel::{Connection, ExpressionMethods, QueryDsl, RunQueryDsl, SelectableHelper};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::error::Error;
use crate::repository::models::binding::{Binding, NewBinding};
use crate::repository::Repository;
use crate::schema::electricity_binding::dsl as binding_dsl;
use crate::schema::electricity_binding::table as binding_table;
use crate::util::spawn_blocking_with_tracing;

pub type DbConn = PooledConnection<ConnectionManager<SqliteConnection>>;
type DbPool = Pool<ConnectionManager<SqliteConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub struct Implementation {
    pool: DbPool,
}

impl Implementation {
    pub async fn new(database_url: String) -> Result<Self, anyhow::Error> {
        let manager = ConnectionManager::<SqliteConnection>::new(database_url);
        let pool = Pool::new(manager)?;

        let mut conn = pool.get()?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| anyhow!("could not run migrations: {}", e))?;

        Ok(Implementation { pool })
    }
}

#[async_trait]
impl Repository for Implementation {
    async fn create_binding(&self, params: NewBinding) -> Result<Binding, Error> {
        let pool = self.pool.clone();

        spawn_blocking_with_tracing(move || {
            let mut conn = pool.get().map_err(|e| anyhow!("Database error: {:?}", e))?;

            diesel::insert_into(binding_table)
                .values(&params)
                .returning(Binding::as_returning())
                .get_result(&mut conn)
                .map_err(Error::from)
        })
        .await
        .map_err(|e| anyhow!("blocking task failed: {}", e))?
    }

    async fn binding_by_id(
        &self,
        device_token: String,
        binding_id: i32,
    ) -> Result<Binding, Error> {
        let pool = self.pool.clone();

        spawn_blocking_with_tracing(move || {
            let mut conn = pool.get().map_err(|e| anyhow!("Database error: {:?}", e))?;

            binding_dsl::electricity_binding
                .filter(binding_dsl::device_token.eq(device_token))
                .filter(binding_dsl::id.eq(binding_id))
                .select(Binding::as_select())
                .first(&mut conn)
                .map_err(|e| match e {
                    DieselError::NotFound => Error::NotFound("Binding not found.".to_string()),
                    other => Error::Internal(anyhow!("error fetching binding: {}", other)),
                })
        })
        .await
        .map_err(|e| anyhow!("blocking task failed: {}", e))?
    }

    async fn bindings_for_device(&self, device_token: String) -> Result<Vec<Binding>, Error> {
        let pool = self.pool.clone();

        spawn_blocking_with_tracing(move || {
            let mut conn = pool.get().map_err(|e| anyhow!("Database error: {:?}", e))?;

            binding_dsl::electricity_binding
                .filter(binding_dsl::device_token.eq(device_token))
                .select(Binding::as_select())
                .load(&mut conn)
                .map_err(|e| Error::Internal(anyhow!("error listing bindings: {}", e)))
        })
        .await
        .map_err(|e| anyhow!("blocking task failed: {}", e))?
    }

    async fn all_bindings(&self) -> Result<Vec<Binding>, Error> {
        let pool = self.pool.clone();

        spawn_blocking_with_tracing(move || {
            let mut conn = pool.get().map_err(|e| anyhow!("Database error: {:?}", e))?;

            binding_dsl::electricity_binding
                .select(Binding::as_select())
                .load(&mut conn)
                .map_err(|e| Error::Internal(anyhow!("error listing all bindings: {}", e)))
        })
        .await
        .map_err(|e| anyhow!("blocking task failed: {}", e))?
    }

    async fn delete_binding(&self, binding_id: i32) -> Result<(), Error> {
        let pool = self.pool.clone();

        spawn_blocking_with_tracing(move || {
            let mut conn = pool.get().map_err(|e| anyhow!("Database error: {:?}", e))?;

            let deleted =
                diesel::delete(binding_dsl::electricity_binding.filter(binding_dsl::id.eq(binding_id)))
                    .execute(&mut conn)
                    .map_err(|e| Error::Internal(anyhow!("error deleting binding: {}", e)))?;

            if deleted == 0 {
                return Err(Error::NotFound("Binding not found.".to_string()));
            }

            Ok(())
        })
        .await
        .map_err(|e| anyhow!("blocking task failed: {}", e))?
    }

    async fn replace_device_bindings(
        &self,
        device_token: String,
        desired: Vec<NewBinding>,
    ) -> Result<Vec<Binding>, Error> {
        let pool = self.pool.clone();

        spawn_blocking_with_tracing(move || {
            let mut conn = pool.get().map_err(|e| anyhow!("Database error: {:?}", e))?;

            conn.transaction::<_, Error, _>(|conn| {
                diesel::delete(
                    binding_dsl::electricity_binding
                        .filter(binding_dsl::device_token.eq(&device_token)),
                )
                .execute(conn)
                .map_err(|e| Error::Internal(anyhow!("error clearing bindings: {}", e)))?;

                let mut persisted = Vec::with_capacity(desired.len());
                for params in desired {
                    let binding = diesel::insert_into(binding_table)
                        .values(&params)
                        .returning(Binding::as_returning())
                        .get_result(conn)
                        .map_err(Error::from)?;
                    persisted.push(binding);
                }

                Ok(persisted)
            })
        })
        .await
        .map_err(|e| anyhow!("blocking task failed: {}", e))?
    }
}
