//! CDC importer - forwards Debezium change events to the importer API
//!
//! Environment variables:
//! - TOPIC: comma-separated topics (default: "MSSQLSERVER.dbo.persons")
//! - BOOTSTRAP_BROKER_SERVER / BOOTSTRAP_BROKER_PORT: broker address (default: localhost:9093)
//! - GROUP_ID: consumer group (default: "3")
//! - AUTO_OFFSET_RESET: offset reset policy (default: "smallest")
//! - POLL_TIMEOUT_SECS: poll timeout (default: 5)
//! - API_ENDPOINT_SERVER / API_ENDPOINT_PORT: importer API (default: host.docker.internal:5000)
//! - API_ENDPOINT_PATH: importer route (default: "/Werbemittel/api/Importer")
//! - ENTITY_FIELD: entity key in the request body (default: "UnterkunftTermin")
//! - SINK_TIMEOUT_SECS: request timeout (default: none)
//! - ON_DECODE_ERROR / ON_SINK_ERROR: "halt" or "skip" (default: "halt")

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use cdc_importer::metrics::PollerMetrics;
use cdc_importer::{Config, HttpSinkClient, KafkaSubscription, Poller};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Resolves once a stop is requested; never resolves when no signal can be listened for
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c().await;
    }
}

async fn ctrl_c() {
    signalled(tokio::signal::ctrl_c(), "ctrl-c").await
}

/// Waits for `listener`; a listener that fails is logged and never fires
async fn signalled<F>(listener: F, name: &str)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = listener.await {
        warn!("Failed to listen for {}: {}", name, e);
        std::future::pending::<()>().await;
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,cdc_importer=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting cdc-importer");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.log_config();

    let subscription =
        KafkaSubscription::new(config.kafka.clone()).context("Failed to create Kafka consumer")?;
    if let Err(e) = subscription.describe_cluster(Duration::from_secs(10)) {
        warn!("Failed to fetch broker metadata: {}", e);
    }

    let sink = HttpSinkClient::new(config.sink.clone()).context("Failed to create HTTP client")?;
    info!(endpoint = %sink.endpoint(), "Importer API client ready");

    let metrics = PollerMetrics::new();
    metrics.register(prometheus::default_registry());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let mut poller =
        Poller::new(subscription, sink, config.poller.clone(), shutdown_rx).with_metrics(metrics);

    match poller.run().await {
        Ok(()) => {
            info!("cdc-importer stopped");
            Ok(())
        }
        Err(e) => {
            error!("cdc-importer stopped after fatal error");
            Err(e).context("Poll loop failed")
        }
    }
}
