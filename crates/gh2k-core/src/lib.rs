//! gh2k Core - GitHub public events to Amazon Kinesis producer
//!
//! Polls the public events feed on a fixed interval, flattens each event
//! into a small analytics record and writes it to a Kinesis stream keyed
//! by event type:
//!
//! - [`source`]: feed client
//! - [`event`]: raw and enriched records, the enricher
//! - [`stream`]: Kinesis publisher
//! - [`engine`]: the poll loop

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod health;
pub mod metrics;
pub mod source;
pub mod stream;

// Re-export commonly used types
pub use config::Config;
pub use error::{CycleError, SourceError, StreamError};
pub use error::{Error, Result};
