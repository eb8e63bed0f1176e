//! Poll loop orchestration.
//!
//! Startup builds the feed client and the Kinesis client, then runs one
//! describe-stream diagnostic; any failure there is fatal. After that the
//! producer repeats fetch, enrich, publish on a timer until shutdown.
//!
//! Within a cycle, events are published one at a time in feed order. The
//! first failure ends the cycle: later events in that batch are dropped and
//! the next cycle starts after the normal interval.

use crate::config::{Config, PollConfig};
use crate::error::{CycleError, StreamError};
use crate::event::enrich;
use crate::health::{Component, HealthCheck};
use crate::metrics::{ErrorStage, ProducerMetrics};
use crate::source::{EventSource, GithubEventSource};
use crate::stream::{KinesisPublisher, StreamMetadata, StreamPublisher};
use crate::Result;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// Outcome of a cycle that ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleReport {
    /// Events returned by the feed
    pub fetched: usize,
    /// Events written to the stream
    pub published: usize,
}

/// Fetch, enrich and publish loop.
pub struct EventProducer {
    poll: PollConfig,
    source: Arc<dyn EventSource>,
    publisher: Arc<dyn StreamPublisher>,
    metrics: Arc<ProducerMetrics>,
    health: Arc<HealthCheck>,
    shutdown_tx: broadcast::Sender<()>,
}

impl EventProducer {
    /// Create a producer from already-built clients.
    pub fn new(
        poll: PollConfig,
        source: Arc<dyn EventSource>,
        publisher: Arc<dyn StreamPublisher>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            poll,
            source,
            publisher,
            metrics: Arc::new(ProducerMetrics::new()),
            health: Arc::new(HealthCheck::new()),
            shutdown_tx,
        }
    }

    /// Build the production clients and run the startup diagnostic.
    pub async fn start(config: &Config) -> Result<Self> {
        config.validate()?;

        let source = Arc::new(GithubEventSource::new(&config.source)?);
        let publisher = Arc::new(KinesisPublisher::connect(&config.stream).await?);

        let producer = Self::new(config.poll.clone(), source, publisher);
        producer.describe_stream().await?;

        Ok(producer)
    }

    /// Describe the target stream and log its metadata.
    ///
    /// Errors are returned to the caller; at startup they abort the process.
    pub async fn describe_stream(&self) -> Result<StreamMetadata> {
        let metadata = match self.publisher.describe().await {
            Ok(metadata) => metadata,
            Err(e) => {
                self.health
                    .mark_unhealthy(Component::Stream, &format!("Describe failed: {}", e));
                return Err(e.into());
            }
        };

        info!(
            stream = %metadata.stream_name,
            arn = %metadata.stream_arn,
            status = %metadata.status,
            shards = metadata.shard_ids.len(),
            shard_ids = ?metadata.shard_ids,
            has_more_shards = metadata.has_more_shards,
            retention_hours = metadata.retention_period_hours,
            "Stream description"
        );

        if metadata.is_writable() {
            self.health.mark_healthy(Component::Stream);
        } else {
            warn!(status = %metadata.status, "Stream is not accepting writes yet");
            self.health.mark_degraded(
                Component::Stream,
                &format!("Stream status is {}", metadata.status),
            );
        }

        Ok(metadata)
    }

    /// Run one fetch, enrich, publish pass.
    ///
    /// Returns at the first failing stage without touching the remaining
    /// events of the batch.
    pub async fn run_cycle(&self) -> std::result::Result<CycleReport, CycleError> {
        let events = self.source.fetch_events().await?;
        self.health.mark_healthy(Component::Source);
        self.metrics.record_fetch(events.len());

        let mut report = CycleReport {
            fetched: events.len(),
            published: 0,
        };

        for raw in &events {
            let event = enrich(raw);
            let payload = event.to_payload().map_err(|e| CycleError::Encode {
                event_id: event.event_id.clone(),
                message: e.to_string(),
            })?;

            let started = Instant::now();
            let receipt = self
                .publisher
                .publish(&event, payload)
                .await
                .map_err(|source| CycleError::Publish {
                    event_id: event.event_id.clone(),
                    source,
                })?;
            self.metrics.record_publish(started.elapsed());

            info!(
                event_id = event.event_id.as_deref().unwrap_or("-"),
                partition_key = event.partition_key(),
                shard_id = %receipt.shard_id,
                sequence_number = %receipt.sequence_number,
                "Event sent to Kinesis"
            );
            report.published += 1;
        }

        Ok(report)
    }

    /// Run one cycle and absorb its failure.
    ///
    /// This is the only place cycle errors are caught.
    pub async fn poll_once(&self) -> Option<CycleReport> {
        let result = self.run_cycle().await;
        self.health.record_cycle(chrono::Utc::now());

        match result {
            Ok(report) => {
                self.metrics.record_cycle(false);
                if report.published > 0 {
                    self.health.mark_healthy(Component::Stream);
                }
                info!(
                    fetched = report.fetched,
                    published = report.published,
                    "Poll cycle complete"
                );
                Some(report)
            }
            Err(e) => {
                self.metrics.record_cycle(true);
                self.record_failure(&e);
                error!(
                    stage = e.stage(),
                    error = %e,
                    "Poll cycle failed, remaining events skipped"
                );
                None
            }
        }
    }

    fn record_failure(&self, err: &CycleError) {
        match err {
            CycleError::Fetch(e) => {
                self.metrics.record_error(ErrorStage::Fetch);
                self.health
                    .mark_unhealthy(Component::Source, &format!("Fetch failed: {}", e));
            }
            CycleError::Encode { .. } => {
                self.metrics.record_error(ErrorStage::Encode);
            }
            CycleError::Publish { source, .. } => {
                self.metrics.record_error(ErrorStage::Publish);
                if let StreamError::Throttled(_) = source {
                    self.metrics.record_throttled();
                    self.health
                        .mark_degraded(Component::Stream, "Provisioned throughput exceeded");
                } else {
                    self.health
                        .mark_unhealthy(Component::Stream, &format!("Publish failed: {}", source));
                }
            }
        }
    }

    /// Run the poll loop until a shutdown signal arrives.
    ///
    /// The first cycle starts immediately. After each cycle the timer is
    /// reset, so a full interval separates the end of one cycle from the
    /// start of the next. An in-flight cycle is never interrupted.
    pub async fn run(&self) -> Result<()> {
        self.health.polling_started();
        info!(
            feed = %self.source.describe(),
            stream = %self.publisher.stream_name(),
            interval_secs = self.poll.interval_seconds,
            "Event producer started"
        );

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut ticker = tokio::time::interval(self.poll.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }

                _ = ticker.tick() => {
                    self.poll_once().await;
                    ticker.reset();
                }
            }
        }

        self.health.polling_stopped();
        info!("Event producer stopped");
        Ok(())
    }

    /// Get shutdown signal sender.
    pub fn shutdown_signal(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Shared metrics handle.
    pub fn metrics(&self) -> Arc<ProducerMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Shared health handle.
    pub fn health(&self) -> Arc<HealthCheck> {
        Arc::clone(&self.health)
    }
}
