//! Describe command implementation.

use anyhow::Result;
use gh2k_core::stream::{KinesisPublisher, StreamPublisher};
use gh2k_core::Config;

/// Connect to Kinesis, describe the configured stream and print it.
pub async fn run(config: Config) -> Result<()> {
    config.validate()?;

    let publisher = KinesisPublisher::connect(&config.stream)
        .await
        .map_err(gh2k_core::Error::from)?;
    let metadata = publisher
        .describe()
        .await
        .map_err(gh2k_core::Error::from)?;

    println!("Stream:      {}", metadata.stream_name);
    println!("ARN:         {}", metadata.stream_arn);
    println!("Status:      {}", metadata.status);
    println!("Retention:   {}h", metadata.retention_period_hours);
    println!(
        "Shards:      {}{}",
        metadata.shard_ids.len(),
        if metadata.has_more_shards { "+" } else { "" }
    );
    for shard in &metadata.shard_ids {
        println!("  - {}", shard);
    }

    Ok(())
}
