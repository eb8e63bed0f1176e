//! GitHub public events feed client.

use super::EventSource;
use crate::config::SourceConfig;
use crate::error::SourceError;
use crate::event::RawEvent;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Polls `GET <feed_url>` and decodes the body as a JSON array of events.
///
/// No pagination, authentication or rate-limit handling.
pub struct GithubEventSource {
    client: Client,
    feed_url: String,
}

impl GithubEventSource {
    /// Build a feed client from configuration.
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let accept = HeaderValue::from_str(&config.accept)
            .map_err(|e| Error::Config(format!("Invalid accept header: {}", e)))?;
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, accept);

        let mut builder = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers);

        if let Some(secs) = config.request_timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            feed_url: config.feed_url.clone(),
        })
    }

    /// Feed URL this client polls.
    pub fn feed_url(&self) -> &str {
        &self.feed_url
    }
}

#[async_trait]
impl EventSource for GithubEventSource {
    async fn fetch_events(&self) -> std::result::Result<Vec<RawEvent>, SourceError> {
        let response = self
            .client
            .get(&self.feed_url)
            .send()
            .await
            .map_err(|e| SourceError::Request {
                url: self.feed_url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: self.feed_url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| SourceError::Request {
            url: self.feed_url.clone(),
            message: e.to_string(),
        })?;

        // Only the array shape is checked here; each element decodes leniently
        let values: Vec<serde_json::Value> =
            serde_json::from_slice(&body).map_err(|e| SourceError::Decode(e.to_string()))?;
        let events: Vec<RawEvent> = values.into_iter().map(RawEvent::from_value).collect();

        debug!(
            url = %self.feed_url,
            status = status.as_u16(),
            events = events.len(),
            "Fetched feed"
        );

        Ok(events)
    }

    fn describe(&self) -> &str {
        &self.feed_url
    }
}
