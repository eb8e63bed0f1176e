//! Integration tests for gh2k-core.
//!
//! The feed is served by a local wiremock server and the stream is an
//! in-memory publisher, so these run without network access or AWS.

use async_trait::async_trait;
use gh2k_core::config::{PollConfig, SourceConfig};
use gh2k_core::engine::EventProducer;
use gh2k_core::event::EnrichedEvent;
use gh2k_core::health::{Component, ComponentStatus};
use gh2k_core::source::{EventSource, GithubEventSource};
use gh2k_core::stream::{PublishReceipt, StreamMetadata, StreamPublisher};
use gh2k_core::{Config, SourceError, StreamError};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Stream double that keeps every record it accepts.
#[derive(Default)]
struct MemoryStream {
    records: Mutex<Vec<(String, serde_json::Value)>>,
}

#[async_trait]
impl StreamPublisher for MemoryStream {
    fn stream_name(&self) -> &str {
        "job-analytics-stream"
    }

    async fn describe(&self) -> Result<StreamMetadata, StreamError> {
        Ok(StreamMetadata {
            stream_name: "job-analytics-stream".into(),
            stream_arn: "arn:aws:kinesis:eu-north-1:000000000000:stream/job-analytics-stream"
                .into(),
            status: "ACTIVE".into(),
            shard_ids: vec!["shardId-000000000000".into(), "shardId-000000000001".into()],
            has_more_shards: false,
            retention_period_hours: 24,
        })
    }

    async fn publish(
        &self,
        event: &EnrichedEvent,
        payload: Vec<u8>,
    ) -> Result<PublishReceipt, StreamError> {
        let mut records = self.records.lock();
        records.push((
            event.partition_key().to_string(),
            serde_json::from_slice(&payload).expect("payload is JSON"),
        ));
        Ok(PublishReceipt {
            shard_id: "shardId-000000000000".into(),
            sequence_number: records.len().to_string(),
        })
    }
}

async fn feed_source(server: &MockServer) -> GithubEventSource {
    let config = SourceConfig {
        feed_url: format!("{}/events", server.uri()),
        ..SourceConfig::default()
    };
    GithubEventSource::new(&config).expect("Failed to build feed client")
}

mod feed_integration {
    use super::*;

    #[tokio::test]
    async fn test_fetch_sends_versioned_accept_and_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/events"))
            .and(header("accept", "application/vnd.github.v3+json"))
            .and(header_exists("user-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "1", "type": "PushEvent"},
                {"id": "2", "type": "WatchEvent"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let source = feed_source(&server).await;
        let events = source.fetch_events().await.expect("fetch succeeds");

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id.as_deref(), Some("1"));
        assert_eq!(events[1].event_type.as_deref(), Some("WatchEvent"));
    }

    #[tokio::test]
    async fn test_fetch_server_error_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/events"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let source = feed_source(&server).await;
        let err = source.fetch_events().await.unwrap_err();
        assert!(matches!(err, SourceError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_fetch_non_array_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/events"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"message": "API rate limit exceeded"})),
            )
            .mount(&server)
            .await;

        let source = feed_source(&server).await;
        let err = source.fetch_events().await.unwrap_err();
        assert!(matches!(err, SourceError::Decode(_)));
    }
}

mod pipeline_integration {
    use super::*;

    #[tokio::test]
    async fn test_push_event_end_to_end() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": "1",
                "type": "PushEvent",
                "repo": {"name": "o/r"},
                "actor": {"login": "u"},
                "created_at": "2024-01-01T00:00:00Z"
            }])))
            .mount(&server)
            .await;

        let stream = Arc::new(MemoryStream::default());
        let producer = EventProducer::new(
            PollConfig::default(),
            Arc::new(feed_source(&server).await),
            stream.clone(),
        );

        let before = chrono::Utc::now();
        let report = producer.poll_once().await.expect("cycle succeeds");
        assert_eq!(report.fetched, 1);
        assert_eq!(report.published, 1);

        let records = stream.records.lock();
        let (key, payload) = &records[0];
        assert_eq!(key, "PushEvent");
        assert_eq!(payload["event_id"], "1");
        assert_eq!(payload["event_type"], "PushEvent");
        assert_eq!(payload["repo_name"], "o/r");
        assert_eq!(payload["actor"], "u");
        assert_eq!(payload["created_at"], "2024-01-01T00:00:00Z");

        let ingested = payload["ingestion_time"].as_str().expect("timestamp string");
        let ingested = chrono::DateTime::parse_from_rfc3339(ingested).expect("RFC 3339");
        assert!(ingested >= before - chrono::Duration::microseconds(1));
    }

    #[tokio::test]
    async fn test_event_without_type_or_nested_objects() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "5"}])))
            .mount(&server)
            .await;

        let stream = Arc::new(MemoryStream::default());
        let producer = EventProducer::new(
            PollConfig::default(),
            Arc::new(feed_source(&server).await),
            stream.clone(),
        );

        producer.poll_once().await.expect("cycle succeeds");

        let records = stream.records.lock();
        let (key, payload) = &records[0];
        assert_eq!(key, "UNKNOWN");
        assert!(payload["event_type"].is_null());
        assert!(payload["repo_name"].is_null());
        assert!(payload["actor"].is_null());
    }

    #[tokio::test]
    async fn test_mistyped_field_does_not_drop_the_batch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "1", "type": "PushEvent"},
                {"id": 123, "type": "PushEvent", "actor": "ghost"}
            ])))
            .mount(&server)
            .await;

        let stream = Arc::new(MemoryStream::default());
        let producer = EventProducer::new(
            PollConfig::default(),
            Arc::new(feed_source(&server).await),
            stream.clone(),
        );

        let report = producer.poll_once().await.expect("cycle succeeds");
        assert_eq!(report.fetched, 2);
        assert_eq!(report.published, 2);

        let records = stream.records.lock();
        assert_eq!(records[0].1["event_id"], "1");
        assert_eq!(records[1].0, "PushEvent");
        assert_eq!(records[1].1["event_id"], "123");
        assert!(records[1].1["actor"].is_null());
    }

    #[tokio::test]
    async fn test_recovers_on_next_cycle_after_feed_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/events"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/events"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{"id": "9", "type": "ForkEvent"}])),
            )
            .mount(&server)
            .await;

        let stream = Arc::new(MemoryStream::default());
        let producer = EventProducer::new(
            PollConfig::default(),
            Arc::new(feed_source(&server).await),
            stream.clone(),
        );
        let health = producer.health();

        assert!(producer.poll_once().await.is_none());
        assert!(matches!(
            health.status_of(Component::Source),
            ComponentStatus::Unhealthy(_)
        ));

        let report = producer.poll_once().await.expect("second cycle succeeds");
        assert_eq!(report.published, 1);
        assert_eq!(health.status_of(Component::Source), ComponentStatus::Healthy);
        assert_eq!(stream.records.lock().len(), 1);

        let metrics = producer.metrics();
        assert_eq!(metrics.cycles_total(), 2);
        assert_eq!(metrics.cycles_failed_total(), 1);
    }

    #[tokio::test]
    async fn test_empty_feed_makes_no_publish_calls() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let stream = Arc::new(MemoryStream::default());
        let producer = EventProducer::new(
            PollConfig::default(),
            Arc::new(feed_source(&server).await),
            stream.clone(),
        );

        let report = producer.poll_once().await.expect("cycle succeeds");
        assert_eq!(report.fetched, 0);
        assert!(stream.records.lock().is_empty());
    }
}

mod config_integration {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_file() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(
            file,
            r#"
[source]
feed_url = "http://localhost:3000/events"

[stream]
stream_name = "staging-events"
region = "us-west-2"

[poll]
interval_seconds = 15
"#
        )
        .expect("Failed to write config");

        let config = Config::from_file(file.path()).expect("config loads");
        assert_eq!(config.source.feed_url, "http://localhost:3000/events");
        assert_eq!(config.stream.stream_name, "staging-events");
        assert_eq!(config.stream.region, "us-west-2");
        assert_eq!(config.poll.interval_seconds, 15);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_malformed_config_file() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(file, "[poll]\ninterval_seconds = \"soon\"").expect("Failed to write config");

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, gh2k_core::Error::Config(_)));
    }

    #[test]
    fn test_missing_config_file() {
        let err = Config::from_file(std::path::Path::new("/nonexistent/gh2k.toml")).unwrap_err();
        assert!(matches!(err, gh2k_core::Error::Io(_)));
    }
}
