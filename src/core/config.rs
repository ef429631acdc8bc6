use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

/// Load service configuration from the environment.
pub fn load() -> Result<Config> {
    let url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse()
        .context("PORT must be a valid port number")?;

    Ok(Config {
        database: DatabaseConfig { url },
        server: ServerConfig { port },
    })
}
