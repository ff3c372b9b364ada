use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use syncd_core::{ContinuationPayload, QueueClient, SyncError};
use tracing::warn;

/// Live `QueueClient` backed by Kafka: continuations are re-enqueued on the
/// same topic messages arrived on; archival forwards to a dedicated poison
/// topic. The poison store's actual durable storage (blob archival per spec
/// §1) is an external collaborator — this adapter's job stops at "don't
/// lose the message", not "retain it forever".
pub struct KafkaQueueClient {
    producer: FutureProducer,
    topic: String,
    poison_topic: String,
}

impl KafkaQueueClient {
    pub fn new(brokers: &str, topic: &str, poison_topic: &str) -> Result<Self, SyncError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "10000")
            .create()
            .map_err(|e| SyncError::ConfigError(format!("kafka producer: {e}")))?;

        Ok(Self {
            producer,
            topic: topic.to_string(),
            poison_topic: poison_topic.to_string(),
        })
    }
}

#[async_trait]
impl QueueClient for KafkaQueueClient {
    async fn enqueue_continuation(&self, payload: &ContinuationPayload) -> Result<(), SyncError> {
        let body = serde_json::to_vec(payload)?;
        self.producer
            .send(
                FutureRecord::<(), _>::to(&self.topic).payload(&body),
                Duration::from_secs(5),
            )
            .await
            .map_err(|(e, _)| SyncError::Other(anyhow::anyhow!("enqueuing continuation: {e}")))?;
        Ok(())
    }

    async fn archive(&self, raw_body: &[u8], reason: &str) -> Result<(), SyncError> {
        warn!(reason, "archiving message to poison store");
        self.producer
            .send(
                FutureRecord::<(), _>::to(&self.poison_topic)
                    .payload(raw_body)
                    .headers(rdkafka::message::OwnedHeaders::new().insert(rdkafka::message::Header {
                        key: "reason",
                        value: Some(reason),
                    })),
                Duration::from_secs(5),
            )
            .await
            .map_err(|(e, _)| SyncError::Other(anyhow::anyhow!("archiving message: {e}")))?;
        Ok(())
    }
}
