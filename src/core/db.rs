use anyhow::{Context, Result};
use diesel::{Connection, pg::PgConnection};
use diesel_async::{
    AsyncPgConnection,
    pooled_connection::{AsyncDieselConnectionManager, bb8::Pool},
};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness};

pub type DbPool = Pool<AsyncPgConnection>;

pub async fn init_pool(database_url: &str) -> Result<DbPool> {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
    let pool = Pool::builder()
        .build(manager)
        .await
        .context("Failed to build DB connection pool")?;
    Ok(pool)
}

/// Run pending migrations on a blocking connection. Diesel's migration
/// harness is synchronous, so this is pushed onto the blocking thread pool.
pub async fn run_migrations_blocking(
    migrations: EmbeddedMigrations,
    database_url: &str,
) -> Result<usize> {
    let database_url = database_url.to_owned();
    tokio::task::spawn_blocking(move || {
        let mut conn = PgConnection::establish(&database_url)
            .context("Failed to open a migration connection")?;
        let applied = conn
            .run_pending_migrations(migrations)
            .map_err(|err| anyhow::anyhow!(err))?;
        Ok::<usize, anyhow::Error>(applied.len())
    })
    .await
    .context("Migration task panicked")?
}
