use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::error::{KafkaError, KafkaResult, RDKafkaErrorCode};
use rdkafka::message::Message;
use rdkafka::topic_partition_list::TopicPartitionList;
use rdkafka::Offset;
use tracing::{debug, error, info};

use super::{BrokerError, KafkaConfig, PartitionEnd, PollOutcome, StreamSubscription};
use crate::cdc::{Position, RawEvent};
use crate::error::SubscriptionError;

/// rdkafka-backed subscription
///
/// Offsets are stored only for acked events, and the client's auto-commit
/// flushes stored offsets in the background. `close` commits the stored
/// offsets of the current assignment synchronously before leaving the group.
pub struct KafkaSubscription {
    consumer: Option<StreamConsumer>,
    config: KafkaConfig,
}

impl KafkaSubscription {
    pub fn new(config: KafkaConfig) -> Result<Self, SubscriptionError> {
        info!("Initializing Kafka subscription with config: {:?}", config);

        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &config.group_id)
            .set("auto.offset.reset", config.offset_reset.as_str())
            .set("enable.partition.eof", "true")
            .set("enable.auto.commit", "true")
            .set("auto.commit.interval.ms", "5000")
            .set("enable.auto.offset.store", "false")
            .set("session.timeout.ms", "45000")
            .set("max.poll.interval.ms", "300000")
            .create()
            .map_err(|e| {
                error!("Failed to create Kafka consumer: {}", e);
                SubscriptionError::Kafka(e)
            })?;

        Ok(Self {
            consumer: Some(consumer),
            config,
        })
    }

    fn consumer(&self) -> Result<&StreamConsumer, SubscriptionError> {
        self.consumer.as_ref().ok_or(SubscriptionError::Closed)
    }

    /// Log the bootstrap address and the brokers the cluster advertises
    pub fn describe_cluster(&self, timeout: Duration) -> Result<(), SubscriptionError> {
        let metadata = self.consumer()?.fetch_metadata(None, timeout)?;

        let brokers: Vec<String> = metadata
            .brokers()
            .iter()
            .map(|b| format!("{}:{}:{}", b.id(), b.host(), b.port()))
            .collect();

        info!(
            bootstrap = %self.config.brokers,
            brokers = ?brokers,
            topics = metadata.topics().len(),
            "Broker metadata"
        );

        for topic in metadata
            .topics()
            .iter()
            .filter(|t| self.config.topics.iter().any(|name| name == t.name()))
        {
            debug!(
                topic = topic.name(),
                partitions = topic.partitions().len(),
                "Subscribed topic metadata"
            );
        }

        Ok(())
    }

}

/// Offset to store once the event at `position` is handled.
/// Committed offsets name the next event to consume.
fn stored_offset(position: &Position) -> Result<TopicPartitionList, SubscriptionError> {
    let mut tpl = TopicPartitionList::new();
    tpl.add_partition_offset(
        &position.topic,
        position.partition,
        Offset::Offset(position.offset + 1),
    )?;
    Ok(tpl)
}

/// Map a receive error onto the poll taxonomy
fn classify_error(e: KafkaError) -> PollOutcome {
    match e {
        KafkaError::PartitionEOF(partition) => {
            PollOutcome::EndOfPartition(PartitionEnd { partition })
        }
        e => PollOutcome::BrokerError(BrokerError {
            code: e
                .rdkafka_error_code()
                .map(|code| format!("{:?}", code))
                .unwrap_or_else(|| "Client".to_string()),
            message: e.to_string(),
        }),
    }
}

/// Result of the final commit; `Ok(false)` when nothing was stored
fn final_commit(result: KafkaResult<()>) -> Result<bool, SubscriptionError> {
    match result {
        Ok(()) => Ok(true),
        Err(KafkaError::ConsumerCommit(RDKafkaErrorCode::NoOffset)) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl StreamSubscription for KafkaSubscription {
    fn topics(&self) -> &[String] {
        &self.config.topics
    }

    fn subscribe(&mut self) -> Result<(), SubscriptionError> {
        let topics: Vec<&str> = self.config.topics.iter().map(|s| s.as_str()).collect();

        self.consumer()?.subscribe(&topics).map_err(|e| {
            error!("Failed to subscribe to topics: {}", e);
            SubscriptionError::Kafka(e)
        })?;

        info!("Subscribed to topics: {:?}", self.config.topics);
        Ok(())
    }

    async fn poll(&mut self, timeout: Duration) -> PollOutcome {
        let consumer = match self.consumer.as_ref() {
            Some(consumer) => consumer,
            None => {
                return PollOutcome::BrokerError(BrokerError {
                    code: "Closed".to_string(),
                    message: "poll on a closed subscription".to_string(),
                })
            }
        };

        match tokio::time::timeout(timeout, consumer.recv()).await {
            Err(_) => PollOutcome::NoEvent,
            Ok(Ok(msg)) => {
                let position = Position::new(msg.topic(), msg.partition(), msg.offset());
                PollOutcome::Data(RawEvent::new(position, msg.payload().map(<[u8]>::to_vec)))
            }
            Ok(Err(e)) => classify_error(e),
        }
    }

    fn ack(&mut self, position: &Position) -> Result<(), SubscriptionError> {
        let tpl = stored_offset(position)?;
        self.consumer()?.store_offsets(&tpl)?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SubscriptionError> {
        let consumer = match self.consumer.as_ref() {
            Some(consumer) => consumer,
            None => return Ok(()),
        };

        // Only partitions still assigned are committed, so a revoked
        // partition never rewinds its new owner.
        let result = match final_commit(consumer.commit_consumer_state(CommitMode::Sync)) {
            Ok(true) => {
                info!("Committed final offsets");
                Ok(())
            }
            Ok(false) => {
                debug!("No acked offsets to commit");
                Ok(())
            }
            Err(e) => {
                error!("Failed to commit final offsets: {}", e);
                Err(e)
            }
        };

        consumer.unsubscribe();
        // Dropping the client leaves the group
        self.consumer = None;
        info!("Kafka subscription closed");

        result
    }
}
