//! Broker subscription
//!
//! The poller only sees the [`StreamSubscription`] trait; [`KafkaSubscription`]
//! is the rdkafka-backed implementation used in production.

mod subscription;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;

use crate::cdc::{Position, RawEvent};
use crate::error::{ConfigError, SubscriptionError};

pub use subscription::KafkaSubscription;

/// Kafka consumer configuration
#[derive(Debug, Clone)]
pub struct KafkaConfig {
    /// Bootstrap brokers (`host:port`, comma-separated)
    pub brokers: String,
    /// Consumer group ID
    pub group_id: String,
    /// Topics to consume, e.g. `["MSSQLSERVER.dbo.persons"]`
    pub topics: Vec<String>,
    pub offset_reset: OffsetReset,
}

/// `auto.offset.reset` policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetReset {
    Earliest,
    Latest,
    Error,
}

impl OffsetReset {
    pub fn as_str(&self) -> &'static str {
        match self {
            OffsetReset::Earliest => "earliest",
            OffsetReset::Latest => "latest",
            OffsetReset::Error => "error",
        }
    }
}

impl FromStr for OffsetReset {
    type Err = ConfigError;

    /// Accepts librdkafka's aliases (`smallest`, `beginning`, `largest`, `end`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "earliest" | "smallest" | "beginning" => Ok(OffsetReset::Earliest),
            "latest" | "largest" | "end" => Ok(OffsetReset::Latest),
            "error" => Ok(OffsetReset::Error),
            other => Err(ConfigError::Invalid(format!(
                "Unknown offset reset policy '{}'",
                other
            ))),
        }
    }
}

/// Informational signal that a consumer caught up with a partition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionEnd {
    pub partition: i32,
}

/// Error reported by the broker client while polling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerError {
    pub code: String,
    pub message: String,
}

impl fmt::Display for BrokerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

/// Result of a single poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Timeout elapsed without any event
    NoEvent,
    EndOfPartition(PartitionEnd),
    Data(RawEvent),
    BrokerError(BrokerError),
}

/// Subscription to a set of change-log topics
#[async_trait]
pub trait StreamSubscription: Send {
    fn topics(&self) -> &[String];

    /// Register interest in the configured topics; must precede `poll`
    fn subscribe(&mut self) -> Result<(), SubscriptionError>;

    /// Wait up to `timeout` for the next event
    async fn poll(&mut self, timeout: Duration) -> PollOutcome;

    /// Mark an event as fully handled so its offset becomes committable
    fn ack(&mut self, position: &Position) -> Result<(), SubscriptionError>;

    /// Commit the acked offsets of the current assignment and release the connection.
    /// Calling it again is a no-op.
    fn close(&mut self) -> Result<(), SubscriptionError>;
}
