//! Standalone accounts server
//!
//! Runs the account routes against PostgreSQL with CORS for the web client.

use rustpress_accounts::config::ServerConfig;
use rustpress_accounts::{AccountsPlugin, AuthError, Plugin};

use axum::http::{header, HeaderValue, Method};
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rustpress_accounts=info,tower_http=info")),
        )
        .init();

    let server = ServerConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&server.database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {e}");
            e
        })?;

    let plugin = AccountsPlugin::new();
    plugin.activate(pool).await?;

    let router = plugin
        .router()
        .await
        .ok_or_else(|| AuthError::Config("accounts plugin is not active".into()))?;

    let cors = CorsLayer::new()
        .allow_origin(server.cors_origin.parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::PUT, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    let app = router.layer(cors);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", server.port)).await?;
    tracing::info!(port = server.port, "Accounts server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
