//! Amazon Kinesis Data Streams publisher.
//!
//! Key behaviour:
//! - Region and credentials from configuration, else the default AWS chain
//! - Credentials are resolved once at startup so a missing identity fails fast
//! - SDK retries are disabled; a failed put surfaces to the caller as is
//! - Optional endpoint override for local emulators

use super::{PublishReceipt, StreamMetadata, StreamPublisher};
use crate::config::StreamConfig;
use crate::error::StreamError;
use crate::event::EnrichedEvent;
use async_trait::async_trait;
use aws_credential_types::provider::ProvideCredentials;
use aws_sdk_kinesis::error::{DisplayErrorContext, SdkError};
use aws_sdk_kinesis::operation::describe_stream::DescribeStreamError;
use aws_sdk_kinesis::operation::put_record::PutRecordError;
use aws_sdk_kinesis::primitives::Blob;
use aws_sdk_kinesis::types::StreamDescription;
use aws_sdk_kinesis::Client as KinesisClient;
use tracing::{debug, info};

/// Kinesis-backed [`StreamPublisher`].
///
/// Constructed once at startup and shared by every poll cycle.
pub struct KinesisPublisher {
    client: KinesisClient,
    stream_name: String,
    endpoint: String,
}

impl KinesisPublisher {
    /// Build the Kinesis client and verify that credentials resolve.
    ///
    /// Fails with [`StreamError::Credentials`] when no identity is available.
    pub async fn connect(config: &StreamConfig) -> std::result::Result<Self, StreamError> {
        let sdk_config = Self::build_aws_config(config).await;

        let provider = sdk_config.credentials_provider().ok_or_else(|| {
            StreamError::Credentials("no AWS credentials provider configured".into())
        })?;
        provider
            .provide_credentials()
            .await
            .map_err(|e| StreamError::Credentials(DisplayErrorContext(&e).to_string()))?;

        let mut kinesis_config = aws_sdk_kinesis::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &config.endpoint_url {
            kinesis_config = kinesis_config.endpoint_url(endpoint);
        }
        let client = KinesisClient::from_conf(kinesis_config.build());

        let endpoint = config
            .endpoint_url
            .clone()
            .unwrap_or_else(|| format!("kinesis.{}.amazonaws.com", config.region));

        info!(
            region = %config.region,
            stream = %config.stream_name,
            endpoint = %endpoint,
            "Kinesis client initialized"
        );

        Ok(Self {
            client,
            stream_name: config.stream_name.clone(),
            endpoint,
        })
    }

    /// Build AWS configuration with credentials.
    async fn build_aws_config(config: &StreamConfig) -> aws_config::SdkConfig {
        let loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .retry_config(aws_config::retry::RetryConfig::disabled());

        if let (Some(access_key), Some(secret_key)) =
            (&config.aws_access_key_id, &config.aws_secret_access_key)
        {
            debug!("Using explicit AWS credentials");
            let credentials = aws_credential_types::Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "gh2k-explicit-credentials",
            );
            loader.credentials_provider(credentials).load().await
        } else {
            debug!("Using default AWS credential chain");
            loader.load().await
        }
    }

    /// Endpoint the client talks to, for logs and errors.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn connection_error<E, R>(&self, err: &SdkError<E, R>) -> Option<StreamError>
    where
        E: std::error::Error + 'static,
        R: std::fmt::Debug,
    {
        match err {
            SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => {
                Some(StreamError::Connection {
                    endpoint: self.endpoint.clone(),
                    message: DisplayErrorContext(err).to_string(),
                })
            }
            _ => None,
        }
    }

    fn describe_error(&self, err: SdkError<DescribeStreamError>) -> StreamError {
        self.connection_error(&err)
            .unwrap_or_else(|| StreamError::Describe {
                stream: self.stream_name.clone(),
                message: DisplayErrorContext(&err).to_string(),
            })
    }

    fn publish_error(&self, err: SdkError<PutRecordError>) -> StreamError {
        let throttled = err
            .as_service_error()
            .map(|e| e.is_provisioned_throughput_exceeded_exception())
            .unwrap_or(false);
        if throttled {
            return StreamError::Throttled(self.stream_name.clone());
        }

        self.connection_error(&err)
            .unwrap_or_else(|| StreamError::Publish(DisplayErrorContext(&err).to_string()))
    }
}

#[async_trait]
impl StreamPublisher for KinesisPublisher {
    fn stream_name(&self) -> &str {
        &self.stream_name
    }

    async fn describe(&self) -> std::result::Result<StreamMetadata, StreamError> {
        let output = self
            .client
            .describe_stream()
            .stream_name(&self.stream_name)
            .send()
            .await
            .map_err(|e| self.describe_error(e))?;

        let description: Option<&StreamDescription> = Option::from(output.stream_description());
        let description = description
            .ok_or_else(|| StreamError::Describe {
                stream: self.stream_name.clone(),
                message: "response carried no stream description".into(),
            })?;

        Ok(StreamMetadata {
            stream_name: description.stream_name().to_string(),
            stream_arn: description.stream_arn().to_string(),
            status: description.stream_status().as_str().to_string(),
            shard_ids: description
                .shards()
                .iter()
                .map(|shard| shard.shard_id().to_string())
                .collect(),
            has_more_shards: description.has_more_shards(),
            retention_period_hours: description.retention_period_hours(),
        })
    }

    async fn publish(
        &self,
        event: &EnrichedEvent,
        payload: Vec<u8>,
    ) -> std::result::Result<PublishReceipt, StreamError> {
        let output = self
            .client
            .put_record()
            .stream_name(&self.stream_name)
            .partition_key(event.partition_key())
            .data(Blob::new(payload))
            .send()
            .await
            .map_err(|e| self.publish_error(e))?;

        Ok(PublishReceipt {
            shard_id: output.shard_id().to_string(),
            sequence_number: output.sequence_number().to_string(),
        })
    }
}
