//! importer-api-stub - echo server standing in for the importer API
//!
//! Environment variables:
//! - PORT: listen port (default: 5000)

use actix_web::{middleware, App, HttpServer};
use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,importer_api_stub=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(5000);

    tracing::info!("Starting importer-api-stub on 0.0.0.0:{}", port);

    HttpServer::new(|| {
        App::new()
            .wrap(middleware::Logger::default())
            .configure(importer_api_stub::configure)
    })
    .bind(("0.0.0.0", port))
    .with_context(|| format!("Failed to bind port {}", port))?
    .run()
    .await
    .context("HTTP server failed")
}
