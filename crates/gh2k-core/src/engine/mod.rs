//! Producer engine that drives the feed into the stream.

mod producer;

pub use producer::{CycleReport, EventProducer};
