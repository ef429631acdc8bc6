use anyhow::{Context, Result};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::core::{app_state::AppState, config};

pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

pub fn init_env() {
    dotenvy::dotenv().ok();
}

/// Build the shared state and serve the app until shutdown.
pub async fn bootstrap(service_name: &str, app: Router<AppState>) -> Result<()> {
    let config = config::load()?;
    let state = AppState::init(&config).await?;

    let app = app.layer(TraceLayer::new_for_http()).with_state(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.server.port))
        .await
        .context("Failed to bind listener")?;
    tracing::info!("{} listening on {}", service_name, listener.local_addr()?);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
