//! Producer metrics.

mod prometheus;

pub use prometheus::{ErrorStage, ProducerMetrics, PublishDurationHistogram};
