//! Stream publishers.
//!
//! [`StreamPublisher`] is the seam between the poll loop and the managed
//! stream. [`KinesisPublisher`] is the production implementation.

mod kinesis;

pub use kinesis::KinesisPublisher;

use crate::error::StreamError;
use crate::event::EnrichedEvent;
use async_trait::async_trait;

/// Identifiers returned by a successful put.
///
/// Only logged; never persisted or used for ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    /// Shard the record landed on
    pub shard_id: String,
    /// Sequence number, increasing within the shard
    pub sequence_number: String,
}

/// Read-only view of a stream returned by the startup diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamMetadata {
    pub stream_name: String,
    pub stream_arn: String,
    /// Service status string, e.g. `ACTIVE` or `UPDATING`
    pub status: String,
    pub shard_ids: Vec<String>,
    /// More shards exist beyond those listed
    pub has_more_shards: bool,
    pub retention_period_hours: i32,
}

impl StreamMetadata {
    /// Whether the stream accepts writes.
    pub fn is_writable(&self) -> bool {
        matches!(self.status.as_str(), "ACTIVE" | "UPDATING")
    }
}

/// A managed append-only stream that enriched events are written to.
#[async_trait]
pub trait StreamPublisher: Send + Sync {
    /// Name of the target stream.
    fn stream_name(&self) -> &str;

    /// One-shot diagnostic describing the target stream.
    async fn describe(&self) -> std::result::Result<StreamMetadata, StreamError>;

    /// Write one event, keyed by [`EnrichedEvent::partition_key`].
    ///
    /// `payload` is the already-serialized event. Failures are returned as
    /// is; nothing is retried.
    async fn publish(
        &self,
        event: &EnrichedEvent,
        payload: Vec<u8>,
    ) -> std::result::Result<PublishReceipt, StreamError>;
}
