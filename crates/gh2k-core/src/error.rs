//! Error types for gh2k core library.
//!
//! Uses hierarchical domain-specific errors following the thiserror pattern.
//! Startup failures surface as [`Error`]; a single poll cycle reports its
//! failure as a [`CycleError`] so the loop can log it and carry on.

use thiserror::Error;

/// Result type alias for gh2k operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for gh2k.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Event feed error
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Kinesis stream error
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while fetching the public event feed.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Transport failure (DNS, TLS, connection reset, timeout)
    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },

    /// Feed answered with a non-success status
    #[error("Feed {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// Body was not a JSON array of events
    #[error("Failed to decode feed response: {0}")]
    Decode(String),
}

/// Errors raised by the Kinesis publisher.
#[derive(Error, Debug)]
pub enum StreamError {
    /// No usable credentials in the environment
    #[error("Credentials unavailable: {0}")]
    Credentials(String),

    /// Service could not be reached
    #[error("Connection failed to {endpoint}: {message}")]
    Connection { endpoint: String, message: String },

    /// DescribeStream call failed
    #[error("Describe stream {stream} failed: {message}")]
    Describe { stream: String, message: String },

    /// Shard write capacity exceeded
    #[error("Throughput exceeded on stream {0}")]
    Throttled(String),

    /// Any other PutRecord failure
    #[error("Publish failed: {0}")]
    Publish(String),
}

/// Failure of one poll cycle, tagged with the stage that produced it.
#[derive(Error, Debug)]
pub enum CycleError {
    /// Feed fetch failed; nothing in this cycle was published
    #[error("fetch failed: {0}")]
    Fetch(#[from] SourceError),

    /// An enriched event could not be serialized
    #[error("encoding event {event_id:?} failed: {message}")]
    Encode {
        event_id: Option<String>,
        message: String,
    },

    /// Kinesis rejected an event; the rest of the batch was abandoned
    #[error("publishing event {event_id:?} failed: {source}")]
    Publish {
        event_id: Option<String>,
        #[source]
        source: StreamError,
    },
}

impl CycleError {
    /// Short label for the stage, used as a metrics and log field.
    pub fn stage(&self) -> &'static str {
        match self {
            CycleError::Fetch(_) => "fetch",
            CycleError::Encode { .. } => "encode",
            CycleError::Publish { .. } => "publish",
        }
    }
}

// Conversion implementations for external error types

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Config("invalid value".into());
        assert_eq!(err.to_string(), "Configuration error: invalid value");

        let stream_err = StreamError::Connection {
            endpoint: "kinesis.eu-north-1.amazonaws.com".into(),
            message: "connection refused".into(),
        };
        let err: Error = stream_err.into();
        assert!(err.to_string().contains("Connection failed"));
    }

    #[test]
    fn test_toml_error_is_config_error() {
        let err: Error = toml::from_str::<toml::Table>("interval = ")
            .unwrap_err()
            .into();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_source_status_error() {
        let err = SourceError::Status {
            url: "https://api.github.com/events".into(),
            status: 500,
        };
        assert_eq!(
            err.to_string(),
            "Feed https://api.github.com/events returned HTTP 500"
        );
    }

    #[test]
    fn test_cycle_error_stage() {
        let fetch: CycleError = SourceError::Decode("expected array".into()).into();
        assert_eq!(fetch.stage(), "fetch");

        let publish = CycleError::Publish {
            event_id: Some("42".into()),
            source: StreamError::Throttled("job-analytics-stream".into()),
        };
        assert_eq!(publish.stage(), "publish");
        assert!(publish.to_string().contains("Throughput exceeded"));
    }
}
