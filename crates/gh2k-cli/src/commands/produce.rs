//! Produce command implementation.

use crate::server::{start_server, ServerState};
use anyhow::Result;
use gh2k_core::engine::EventProducer;
use gh2k_core::Config;
use std::sync::Arc;
use tracing::info;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

/// Run the producer until SIGINT or SIGTERM.
pub async fn run(config: Config) -> Result<()> {
    info!(
        feed = %config.source.feed_url,
        stream = %config.stream.stream_name,
        region = %config.stream.region,
        interval_secs = config.poll.interval_seconds,
        "Starting event producer"
    );

    // Client construction and the describe call; failures here are fatal
    let producer = EventProducer::start(&config).await?;
    let shutdown_tx = producer.shutdown_signal();

    if config.monitoring.http_enabled {
        let server_state = Arc::new(ServerState {
            health: producer.health(),
            metrics: producer.metrics(),
        });
        tokio::spawn(start_server(
            server_state,
            config.monitoring.health_port,
            shutdown_tx.subscribe(),
        ));
    }

    let shutdown_signal = shutdown_tx.clone();
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {
                            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
                        }
                        _ = sigterm.recv() => {
                            info!("Received SIGTERM, initiating graceful shutdown");
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to install SIGTERM handler, using Ctrl+C only");
                    let _ = tokio::signal::ctrl_c().await;
                    info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received Ctrl+C, initiating graceful shutdown");
        }

        let _ = shutdown_signal.send(());
    });

    producer.run().await?;

    info!("Shutdown complete");
    Ok(())
}
