//! Event feed clients.

mod github;

pub use github::GithubEventSource;

use crate::error::SourceError;
use crate::event::RawEvent;
use async_trait::async_trait;

/// A feed that yields the current window of recent events.
///
/// One call is one HTTP round trip; failures are returned, never retried.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Fetch the feed's current batch, in the feed's own order.
    async fn fetch_events(&self) -> std::result::Result<Vec<RawEvent>, SourceError>;

    /// Human-readable location of the feed, for logs.
    fn describe(&self) -> &str;
}
