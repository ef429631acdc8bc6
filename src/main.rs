use anyhow::Result;
use axum::Router;
use bazaar_marketplace::core::{
    bootstrap::{self, bootstrap},
    config, db, swagger,
};
use bazaar_marketplace::routes;
use diesel_migrations::{EmbeddedMigrations, embed_migrations};

/// Migrations embedded into the binary which helps with streamlining image building process
const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[tokio::main]
async fn main() -> Result<()> {
    bootstrap::init_tracing();
    bootstrap::init_env();

    let routes = routes::products::routes_with_openapi()
        .merge(routes::categories::routes_with_openapi())
        .merge(routes::reviews::routes_with_openapi())
        .merge(routes::vouchers::routes_with_openapi())
        .merge(routes::buyers::addresses::routes_with_openapi())
        .merge(routes::buyers::carts::routes_with_openapi())
        .merge(routes::buyers::checkout::routes_with_openapi())
        .merge(routes::buyers::orders::routes_with_openapi())
        .merge(routes::buyers::complaints::routes_with_openapi())
        .merge(routes::sellers::products::routes_with_openapi())
        .merge(routes::sellers::orders::routes_with_openapi())
        .merge(routes::sellers::vouchers::routes_with_openapi())
        .merge(routes::sellers::promotions::routes_with_openapi())
        .merge(routes::sellers::complaints::routes_with_openapi())
        .merge(routes::admin::categories::routes_with_openapi())
        .merge(routes::admin::vouchers::routes_with_openapi())
        .merge(routes::admin::promotions::routes_with_openapi());

    let mut openapi = routes.get_openapi().clone();
    openapi.info = utoipa::openapi::InfoBuilder::new()
        .title("Bazaar Marketplace API")
        .version("1.0.0")
        .build();
    let swagger_ui = swagger::create_swagger_ui(openapi)?;

    let app = Router::new().merge(routes).merge(swagger_ui);

    tracing::info!("Running migrations...");
    let config = config::load()?;
    let migrations_count = db::run_migrations_blocking(MIGRATIONS, &config.database.url).await?;
    tracing::info!("Run {} new migrations successfully", migrations_count);

    tracing::info!("Bootstrapping...");
    bootstrap("MarketplaceService", app).await?;
    Ok(())
}
